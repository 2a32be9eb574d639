//! Adjacency-list text format: one vertex per line, `id` followed by its
//! neighbor ids, separated by tabs or spaces.

use std::fmt::Display;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use itertools::Itertools;

use crate::bsp::Edge;
use crate::error::{Error, Result};
use crate::io::{GraphSink, GraphSource, VertexRecord};

/// Reads adjacency-list lines into vertex records. With `ordered_only`, only
/// edges `id < target` are kept; the triangle-count and k-truss programs
/// assume such an ordered graph, where a larger label implies higher degree.
pub struct AdjacencyListSource<R> {
    reader: R,
    ordered_only: bool,
}

impl AdjacencyListSource<BufReader<File>> {
    pub fn from_path(path: &Path, ordered_only: bool) -> Result<Self> {
        Ok(AdjacencyListSource::new(
            BufReader::new(File::open(path)?),
            ordered_only,
        ))
    }
}

impl<R: BufRead> AdjacencyListSource<R> {
    pub fn new(reader: R, ordered_only: bool) -> Self {
        AdjacencyListSource {
            reader,
            ordered_only,
        }
    }
}

fn parse_id(field: &str, line: &str) -> Result<i64> {
    field
        .parse()
        .map_err(|_| Error::InvalidRecord(line.to_string()))
}

impl<R, V, E> GraphSource<V, E> for AdjacencyListSource<R>
where
    R: BufRead,
    V: Default,
    E: Default,
{
    fn read(&mut self) -> Result<Vec<VertexRecord<V, E>>> {
        let mut records = Vec::new();

        for line in (&mut self.reader).lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split(['\t', ' ']).filter(|f| !f.is_empty());
            let id = match fields.next() {
                Some(field) => parse_id(field, line)?,
                None => continue,
            };

            let mut edges = Vec::new();
            for field in fields {
                let target = parse_id(field, line)?;
                if self.ordered_only && target <= id {
                    continue;
                }
                edges.push(Edge {
                    target,
                    value: E::default(),
                });
            }

            records.push(VertexRecord {
                id,
                value: V::default(),
                edges,
            });
        }

        Ok(records)
    }
}

/// Writes each vertex as `id\tn1 n2 n3`, the surviving edge collection only.
pub struct AdjacencyListSink<W> {
    writer: W,
}

impl<W: Write> AdjacencyListSink<W> {
    pub fn new(writer: W) -> Self {
        AdjacencyListSink { writer }
    }
}

impl<W: Write, V, E> GraphSink<V, E> for AdjacencyListSink<W> {
    fn write_vertex(&mut self, id: i64, _value: &V, edges: &[Edge<E>]) -> Result<()> {
        let neighbors = edges.iter().map(|edge| edge.target).join(" ");
        writeln!(self.writer, "{id}\t{neighbors}")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(self.writer.flush()?)
    }
}

/// Writes each vertex as `id\tvalue`.
pub struct VertexValueSink<W> {
    writer: W,
}

impl<W: Write> VertexValueSink<W> {
    pub fn new(writer: W) -> Self {
        VertexValueSink { writer }
    }
}

impl<W: Write, V: Display, E> GraphSink<V, E> for VertexValueSink<W> {
    fn write_vertex(&mut self, id: i64, value: &V, _edges: &[Edge<E>]) -> Result<()> {
        writeln!(self.writer, "{id}\t{value}")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(self.writer.flush()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(text: &str, ordered_only: bool) -> Vec<VertexRecord<(), ()>> {
        AdjacencyListSource::new(text.as_bytes(), ordered_only)
            .read()
            .unwrap()
    }

    fn targets(record: &VertexRecord<(), ()>) -> Vec<i64> {
        record.edges.iter().map(|e| e.target).collect()
    }

    #[test]
    fn parses_tab_and_space_separated_lines() {
        let records = read_all("1\t2 3\n\n# comment\n2 3\n", false);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 1);
        assert_eq!(targets(&records[0]), vec![2, 3]);
        assert_eq!(records[1].id, 2);
        assert_eq!(targets(&records[1]), vec![3]);
    }

    #[test]
    fn ordered_only_drops_back_edges() {
        let records = read_all("2\t1 2 3\n", true);
        assert_eq!(targets(&records[0]), vec![3]);
    }

    #[test]
    fn malformed_ids_are_rejected() {
        let result: Result<Vec<VertexRecord<(), ()>>> =
            AdjacencyListSource::new("1\tx\n".as_bytes(), false).read();
        assert!(matches!(result, Err(Error::InvalidRecord(_))));
    }

    #[test]
    fn sinks_format_vertices() {
        let mut out = Vec::new();
        let mut sink = AdjacencyListSink::new(&mut out);
        GraphSink::<(), ()>::write_vertex(
            &mut sink,
            1,
            &(),
            &[
                Edge { target: 2, value: () },
                Edge { target: 5, value: () },
            ],
        )
        .unwrap();
        GraphSink::<(), ()>::flush(&mut sink).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1\t2 5\n");

        let mut out = Vec::new();
        let mut sink = VertexValueSink::new(&mut out);
        GraphSink::<f64, ()>::write_vertex(&mut sink, 7, &0.25, &[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "7\t0.25\n");
    }
}
