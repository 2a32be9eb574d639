//! Stable reach probabilities of a single source vertex: the source scatters
//! unit mass across its out-edges, every vertex stores the mass arriving
//! each round and rescatters it normalized by out-degree. Inbound masses are
//! summable, so a sum combiner is registered. Mass below `MIN_DELTA` is
//! dropped when filtering is on, which bounds the walk on most graphs; the
//! `walk.max_steps` ceiling bounds it on the rest.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::bsp::{
    AggregatorRegistry, Combine, Context, DoubleMaxAggregator, DoubleMinAggregator,
    LongSumAggregator, Master, MasterContext, Vertex, VertexProgram,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::io::{AdjacencyListSource, VertexValueSink};

pub const REACHABLE: &str = "reachable";
pub const MAX_PROBABILITY: &str = "max_probability";
pub const MIN_PROBABILITY: &str = "min_probability";

const MIN_DELTA: f64 = 1e-7;

struct ProbabilitySumCombiner;

impl Combine<f64> for ProbabilitySumCombiner {
    fn combine(&self, a: f64, b: f64) -> f64 {
        a + b
    }
}

pub struct RandomWalk {
    source: i64,
    max_steps: i64,
    filter: bool,
}

impl RandomWalk {
    pub fn from_config(config: &Config) -> Result<Self> {
        let max_steps = config.get_i64("walk.max_steps", 50)?;
        if max_steps < 1 {
            return Err(Error::Configuration(format!(
                "walk.max_steps must be positive, got {max_steps}"
            )));
        }
        Ok(RandomWalk {
            source: config.get_i64("walk.source", 10)?,
            max_steps,
            filter: config.get_bool("walk.filter", true)?,
        })
    }
}

impl VertexProgram<f64, (), f64> for RandomWalk {
    fn compute(&self, vertex: &mut Vertex<f64, (), f64>, ctx: &Context<f64, (), f64>) -> Result<()> {
        if ctx.superstep() > self.max_steps {
            vertex.vote_to_halt();
            return Ok(());
        }

        if ctx.superstep() == 0 {
            if vertex.id() == self.source && vertex.num_edges() > 0 {
                vertex.send_message_to_all_edges(1.0 / vertex.num_edges() as f64);
            }
            vertex.set_value(0.0);
        } else {
            let mut inbound = 0.0;
            while let Some(mass) = vertex.read_message(ctx) {
                inbound += mass;
            }
            vertex.set_value(inbound);

            if (!self.filter || inbound > MIN_DELTA) && vertex.num_edges() > 0 {
                vertex.send_message_to_all_edges(inbound / vertex.num_edges() as f64);
            }

            vertex.aggregate(REACHABLE, 1_i64);
            vertex.aggregate(MAX_PROBABILITY, inbound);
            if inbound > MIN_DELTA {
                vertex.aggregate(MIN_PROBABILITY, inbound);
            }
        }

        vertex.vote_to_halt();
        Ok(())
    }

    fn register_aggregators(&self, registry: &mut AggregatorRegistry) -> Result<()> {
        registry.register(REACHABLE, Box::new(LongSumAggregator), false)?;
        registry.register(MAX_PROBABILITY, Box::new(DoubleMaxAggregator), false)?;
        registry.register(MIN_PROBABILITY, Box::new(DoubleMinAggregator), false)
    }

    fn combiner(&self) -> Option<Box<dyn Combine<f64>>> {
        Some(Box::new(ProbabilitySumCombiner))
    }

    fn master_compute(&self, ctx: &mut MasterContext<'_>) -> Result<()> {
        let reachable = ctx.get_aggregated::<i64>(REACHABLE).unwrap_or(0);
        if reachable > 0 {
            info!(
                "superstep {}: reachable={} max={:.9} min={:.9} avg={:.9}",
                ctx.superstep(),
                reachable,
                ctx.get_aggregated::<f64>(MAX_PROBABILITY).unwrap_or(0.0),
                ctx.get_aggregated::<f64>(MIN_PROBABILITY).unwrap_or(0.0),
                1.0 / reachable as f64
            );
        }
        Ok(())
    }
}

pub fn run(input: &Path, output: &Path, workers: usize, config: Config) -> Result<()> {
    let program = RandomWalk::from_config(&config)?;
    let mut source = AdjacencyListSource::from_path(input, false)?;
    let mut master: Master<f64, (), f64> = Master::new(workers, Arc::new(program), config)?;

    master.load(&mut source)?;
    master.run()?;

    let mut sink = VertexValueSink::new(BufWriter::new(File::create(output)?));
    master.write_output(&mut sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsp::Edge;
    use crate::config::Value;
    use crate::io::{MemorySink, MemorySource, VertexRecord};
    use std::collections::HashMap;

    fn walk_on(
        edges: &[(i64, i64)],
        vertices: &[i64],
        source: i64,
        workers: usize,
    ) -> (Master<f64, (), f64>, HashMap<i64, f64>) {
        let records = vertices
            .iter()
            .map(|&id| VertexRecord {
                id,
                value: 0.0,
                edges: edges
                    .iter()
                    .filter(|&&(s, _)| s == id)
                    .map(|&(_, target)| Edge { target, value: () })
                    .collect(),
            })
            .collect();

        let mut config = Config::new();
        config.set("walk.source", Value::Int(source));
        let program = RandomWalk::from_config(&config).unwrap();

        let mut master: Master<f64, (), f64> =
            Master::new(workers, Arc::new(program), config).unwrap();
        master.load(&mut MemorySource(records)).unwrap();
        master.run().unwrap();

        let mut sink = MemorySink::new();
        master.write_output(&mut sink).unwrap();
        let values = sink
            .vertices
            .into_iter()
            .map(|(id, value, _)| (id, value))
            .collect();
        (master, values)
    }

    #[test]
    fn mass_walks_down_a_path() {
        let (master, values) = walk_on(&[(0, 1), (1, 2)], &[0, 1, 2], 0, 2);

        assert_eq!(values[&0], 0.0);
        assert_eq!(values[&1], 1.0);
        assert_eq!(values[&2], 1.0);
        // the dead end at 2 absorbs the walk
        assert_eq!(master.get_aggregated::<i64>(REACHABLE), Some(1));
        assert_eq!(master.get_aggregated::<f64>(MAX_PROBABILITY), Some(1.0));
    }

    #[test]
    fn a_branching_source_splits_its_mass() {
        let (_, values) = walk_on(&[(0, 1), (0, 2)], &[0, 1, 2], 0, 2);
        assert_eq!(values[&1], 0.5);
        assert_eq!(values[&2], 0.5);
    }

    #[test]
    fn inbound_mass_sums_across_senders() {
        // both branches forward their half into 3
        let (_, values) = walk_on(&[(0, 1), (0, 2), (1, 3), (2, 3)], &[0, 1, 2, 3], 0, 3);
        assert_eq!(values[&3], 1.0);
    }

    #[test]
    fn an_absent_source_reaches_nothing() {
        let (master, values) = walk_on(&[(0, 1)], &[0, 1], 42, 2);
        assert_eq!(values[&0], 0.0);
        assert_eq!(values[&1], 0.0);
        assert_eq!(master.get_aggregated::<i64>(REACHABLE), Some(0));
    }
}
