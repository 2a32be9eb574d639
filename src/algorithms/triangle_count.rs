//! Triangle counting on an ordered graph (every edge points from a smaller
//! to a larger id). Superstep 0 sends, for every ordered neighbor pair
//! `(lo, hi)`, a query to `lo`; superstep 1 checks whether the closing edge
//! `lo → hi` exists and feeds the hits into a persistent global sum.

use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use itertools::Itertools;
use tracing::info;

use super::Triple;
use crate::bsp::{
    AggregatorRegistry, Context, LongSumAggregator, Master, MasterContext, Vertex, VertexProgram,
};
use crate::config::Config;
use crate::error::Result;
use crate::io::{AdjacencyListSink, AdjacencyListSource};

pub const TRIANGLES: &str = "triangles";

pub struct TriangleCount;

impl VertexProgram<(), (), Triple> for TriangleCount {
    fn compute(&self, vertex: &mut Vertex<(), (), Triple>, ctx: &Context<(), (), Triple>) -> Result<()> {
        match ctx.superstep() {
            0 => {
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

                let mut local = 0_i64;
                while let Some(query) = vertex.read_message(ctx) {
                    if neighbors.contains(&query.edge_target) {
                        local += 1;
                    }
                }
                vertex.aggregate(TRIANGLES, local);
                vertex.vote_to_halt();
            }
            _ => vertex.vote_to_halt(),
        }
        Ok(())
    }

    fn register_aggregators(&self, registry: &mut AggregatorRegistry) -> Result<()> {
        registry.register(TRIANGLES, Box::new(LongSumAggregator), true)
    }

    fn master_compute(&self, ctx: &mut MasterContext<'_>) -> Result<()> {
        let triangles = ctx.get_aggregated::<i64>(TRIANGLES).unwrap_or(0);
        info!("superstep {}: {} triangles", ctx.superstep(), triangles);
        Ok(())
    }
}

pub fn run(input: &Path, output: &Path, workers: usize, config: Config) -> Result<()> {
    let mut source = AdjacencyListSource::from_path(input, true)?;
    let mut master: Master<(), (), Triple> =
        Master::new(workers, Arc::new(TriangleCount), config)?;

    master.load(&mut source)?;
    master.run()?;
    info!(
        "total triangles: {}",
        master.get_aggregated::<i64>(TRIANGLES).unwrap_or(0)
    );

    let mut sink = AdjacencyListSink::new(BufWriter::new(File::create(output)?));
    master.write_output(&mut sink)
}
