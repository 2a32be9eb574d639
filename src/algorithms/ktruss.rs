//! K-truss peeling on an ordered graph. A three-phase cycle keyed by
//! `superstep % 3`: query ordered neighbor pairs, answer membership against
//! the neighbor set (each confirmed triangle credits support to all three of
//! its edges), then drop every edge whose support is below `k - 2` through
//! the mutable edge cursor. The cycle repeats while the `changed` bool-or
//! accumulator reports at least one removal anywhere in the graph.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use itertools::Itertools;
use tracing::info;

use super::Triple;
use crate::bsp::{
    AggregatorRegistry, BoolOrAggregator, Context, LongSumAggregator, Master, MasterContext,
    Vertex, VertexProgram,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::io::{AdjacencyListSink, AdjacencyListSource};

pub const CHANGED: &str = "changed";
pub const SUPPORT_MESSAGES: &str = "support_messages";

pub struct KTruss {
    /// Minimum number of triangles an edge must sit in: `k - 2`.
    threshold: i64,
}

impl KTruss {
    pub fn from_config(config: &Config) -> Result<Self> {
        let k = config.get_i64("ktruss.k", 2)?;
        if k < 2 {
            return Err(Error::Configuration(format!(
                "ktruss.k must be at least 2, got {k}"
            )));
        }
        Ok(KTruss { threshold: k - 2 })
    }
}

impl VertexProgram<(), (), Triple> for KTruss {
    fn compute(&self, vertex: &mut Vertex<(), (), Triple>, ctx: &Context<(), (), Triple>) -> Result<()> {
        match ctx.superstep() % 3 {
            0 => {
                if ctx.superstep() > 0 && !ctx.get_aggregated::<bool>(CHANGED).unwrap_or(false) {
                    vertex.vote_to_halt();
                    return Ok(());
                }

                for (a, b) in vertex.edges().iter().tuple_combinations() {
                    let (lo, hi) = if a.target < b.target {
                        (a.target, b.target)
                    } else {
                        (b.target, a.target)
                    };
                    vertex.send_message_to(lo, Triple::new(vertex.id(), lo, hi));
                }
            }
            1 => {
                let neighbors: HashSet<i64> =
                    vertex.edges().iter().map(|edge| edge.target).collect();

                let mut remote = 0_i64;
                while let Some(query) = vertex.read_message(ctx) {
                    if neighbors.contains(&query.edge_target) {
                        // one report per edge of the confirmed triangle
                        vertex.send_message_to(
                            vertex.id(),
                            Triple::new(query.edge_source, query.edge_source, query.edge_target),
                        );
                        vertex.send_message_to(
                            query.from,
                            Triple::new(query.edge_source, query.from, query.edge_target),
                        );
                        vertex.send_message_to(
                            query.from,
                            Triple::new(query.edge_source, query.from, query.edge_source),
                        );
                        remote += 2;
                    }
                }
                vertex.aggregate(SUPPORT_MESSAGES, remote);
            }
            _ => {
                let mut support: HashMap<i64, i64> = HashMap::new();
                while let Some(report) = vertex.read_message(ctx) {
                    *support.entry(report.edge_target).or_insert(0) += 1;
                }

                let mut changed = false;
                let mut cursor = vertex.edge_cursor();
                while let Some(edge) = cursor.next() {
                    if support.get(&edge.target).copied().unwrap_or(0) < self.threshold {
                        cursor.remove();
                        changed = true;
                    }
                }
                vertex.aggregate(CHANGED, changed);
            }
        }
        Ok(())
    }

    fn register_aggregators(&self, registry: &mut AggregatorRegistry) -> Result<()> {
        registry.register(CHANGED, Box::new(BoolOrAggregator), false)?;
        registry.register(SUPPORT_MESSAGES, Box::new(LongSumAggregator), true)
    }

    fn master_compute(&self, ctx: &mut MasterContext<'_>) -> Result<()> {
        info!(
            "superstep {}: changed={} support messages={}",
            ctx.superstep(),
            ctx.get_aggregated::<bool>(CHANGED).unwrap_or(false),
            ctx.get_aggregated::<i64>(SUPPORT_MESSAGES).unwrap_or(0)
        );
        Ok(())
    }
}

pub fn run(input: &Path, output: &Path, workers: usize, config: Config) -> Result<()> {
    let program = KTruss::from_config(&config)?;
    let mut source = AdjacencyListSource::from_path(input, true)?;
    let mut master: Master<(), (), Triple> = Master::new(workers, Arc::new(program), config)?;

    master.load(&mut source)?;
    master.run()?;
    info!("{} edges survive the truss", master.num_edges());

    let mut sink = AdjacencyListSink::new(BufWriter::new(File::create(output)?));
    master.write_output(&mut sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsp::Edge;
    use crate::config::Value;
    use crate::io::{MemorySink, MemorySource, VertexRecord};

    fn run_on(edges: &[(i64, i64)], k: i64, workers: usize) -> (Master<(), (), Triple>, Vec<(i64, Vec<i64>)>) {
        let ids: HashSet<i64> = edges.iter().map(|&(source, _)| source).collect();
        let records = ids
            .into_iter()
            .map(|id| VertexRecord {
                id,
                value: (),
                edges: edges
                    .iter()
                    .filter(|&&(source, _)| source == id)
                    .map(|&(_, target)| Edge { target, value: () })
                    .collect(),
            })
            .collect();

        let mut config = Config::new();
        config.set("ktruss.k", Value::Int(k));
        let program = KTruss::from_config(&config).unwrap();

        let mut master: Master<(), (), Triple> =
            Master::new(workers, Arc::new(program), config).unwrap();
        master.load(&mut MemorySource(records)).unwrap();
        master.run().unwrap();

        let mut sink = MemorySink::new();
        master.write_output(&mut sink).unwrap();
        let survivors = sink
            .vertices
            .into_iter()
            .map(|(id, _, edges)| (id, edges.into_iter().map(|e| e.target).collect()))
            .collect();
        (master, survivors)
    }

    #[test]
    fn a_three_truss_keeps_a_triangle() {
        let (master, survivors) = run_on(&[(1, 2), (2, 3), (1, 3)], 3, 2);
        assert_eq!(
            survivors,
            vec![(1, vec![2, 3]), (2, vec![3]), (3, vec![])]
        );
        assert_eq!(master.get_aggregated::<bool>(CHANGED), Some(false));
        // each confirmed triangle costs two remote reports
        assert_eq!(master.get_aggregated::<i64>(SUPPORT_MESSAGES), Some(2));
    }

    #[test]
    fn an_unreachable_threshold_peels_every_edge() {
        let (master, survivors) = run_on(&[(1, 2), (2, 3), (1, 3)], 4, 2);
        for (_, edges) in &survivors {
            assert!(edges.is_empty());
        }
        assert_eq!(master.get_aggregated::<bool>(CHANGED), Some(false));
    }

    #[test]
    fn a_four_truss_peels_the_pendant_triangle() {
        // K4 on {1,2,3,4} plus a pendant triangle {3,5,6}
        let edges = [
            (1, 2),
            (1, 3),
            (1, 4),
            (2, 3),
            (2, 4),
            (3, 4),
            (3, 5),
            (3, 6),
            (5, 6),
        ];
        let (_, survivors) = run_on(&edges, 4, 3);
        let kept: Vec<(i64, Vec<i64>)> = survivors
            .into_iter()
            .filter(|(_, edges)| !edges.is_empty())
            .collect();
        assert_eq!(
            kept,
            vec![
                (1, vec![2, 3, 4]),
                (2, vec![3, 4]),
                (3, vec![4]),
            ]
        );
    }

    #[test]
    fn k_below_two_is_a_configuration_error() {
        let mut config = Config::new();
        config.set("ktruss.k", Value::Int(1));
        assert!(matches!(
            KTruss::from_config(&config),
            Err(Error::Configuration(_))
        ));
    }
}
