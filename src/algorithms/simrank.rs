//! SimRank estimation for one vertex pair via two simultaneous random walks
//! without a first-meeting guarantee: mass from the source walks positive,
//! mass from the destination walks negative, and every vertex where both
//! walks meet in step `t` contributes `decay^t · srcProb · dstProb` to the
//! estimate. The sign carries which walk a payload belongs to, so no
//! combiner is legal for this message type.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::bsp::{
    AggregatorRegistry, Context, DoubleSumAggregator, Master, MasterContext, Vertex, VertexProgram,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::io::{AdjacencyListSource, VertexValueSink};

pub const SIMRANK: &str = "simrank";
pub const SIMRANK_DELTA: &str = "simrank_delta";

pub struct SimRank {
    source: i64,
    target: i64,
    decay: f64,
    max_steps: i64,
}

impl SimRank {
    pub fn from_config(config: &Config) -> Result<Self> {
        let source = config.get_i64("simrank.source", 10)?;
        let target = config.get_i64("simrank.target", 100)?;
        if source == target {
            return Err(Error::Configuration(format!(
                "simrank.source and simrank.target are both {source}"
            )));
        }

        let decay = config.get_f64("simrank.decay", 0.8)?;
        if !(0.0..=1.0).contains(&decay) {
            return Err(Error::Configuration(format!(
                "simrank.decay must be within [0, 1], got {decay}"
            )));
        }

        Ok(SimRank {
            source,
            target,
            decay,
            max_steps: config.get_i64("simrank.max_steps", 10)?,
        })
    }
}

impl VertexProgram<f64, (), f64> for SimRank {
    fn compute(&self, vertex: &mut Vertex<f64, (), f64>, ctx: &Context<f64, (), f64>) -> Result<()> {
        if ctx.superstep() > self.max_steps {
            vertex.vote_to_halt();
            return Ok(());
        }

        if ctx.superstep() == 0 {
            if vertex.num_edges() > 0 {
                let mass = 1.0 / vertex.num_edges() as f64;
                if vertex.id() == self.source {
                    vertex.send_message_to_all_edges(mass);
                } else if vertex.id() == self.target {
                    vertex.send_message_to_all_edges(-mass);
                }
            }
        } else {
            let mut src_prob = 0.0;
            let mut dst_prob = 0.0;
            while let Some(mass) = vertex.read_message(ctx) {
                if mass > 0.0 {
                    src_prob += mass;
                } else {
                    dst_prob += -mass;
                }
            }

            let delta = self.decay.powi(ctx.superstep() as i32) * src_prob * dst_prob;
            vertex.set_value(vertex.value() + delta);

            if vertex.num_edges() > 0 {
                let degree = vertex.num_edges() as f64;
                if dst_prob > 0.0 {
                    vertex.send_message_to_all_edges(-dst_prob / degree);
                }
                if src_prob > 0.0 {
                    vertex.send_message_to_all_edges(src_prob / degree);
                }
            }

            vertex.aggregate(SIMRANK_DELTA, delta);
            vertex.aggregate(SIMRANK, *vertex.value());
        }

        vertex.vote_to_halt();
        Ok(())
    }

    fn register_aggregators(&self, registry: &mut AggregatorRegistry) -> Result<()> {
        registry.register(SIMRANK, Box::new(DoubleSumAggregator), false)?;
        registry.register(SIMRANK_DELTA, Box::new(DoubleSumAggregator), false)
    }

    fn master_compute(&self, ctx: &mut MasterContext<'_>) -> Result<()> {
        info!(
            "superstep {}: simrank={:.9} delta={:.9}",
            ctx.superstep(),
            ctx.get_aggregated::<f64>(SIMRANK).unwrap_or(0.0),
            ctx.get_aggregated::<f64>(SIMRANK_DELTA).unwrap_or(0.0)
        );
        Ok(())
    }
}

pub fn run(input: &Path, output: &Path, workers: usize, config: Config) -> Result<()> {
    let program = SimRank::from_config(&config)?;
    let mut source = AdjacencyListSource::from_path(input, false)?;
    let mut master: Master<f64, (), f64> = Master::new(workers, Arc::new(program), config)?;

    master.load(&mut source)?;
    master.run()?;
    info!(
        "estimated simrank: {:.9}",
        master.get_aggregated::<f64>(SIMRANK).unwrap_or(0.0)
    );

    let mut sink = VertexValueSink::new(BufWriter::new(File::create(output)?));
    master.write_output(&mut sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsp::Edge;
    use crate::config::Value;
    use crate::io::{MemorySource, VertexRecord};

    fn simrank_on(
        edges: &[(i64, i64)],
        vertices: &[i64],
        config: Config,
        workers: usize,
    ) -> Master<f64, (), f64> {
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

        let program = SimRank::from_config(&config).unwrap();
        let mut master: Master<f64, (), f64> =
            Master::new(workers, Arc::new(program), config).unwrap();
        master.load(&mut MemorySource(records)).unwrap();
        master.run().unwrap();
        master
    }

    fn pair_config(source: i64, target: i64) -> Config {
        let mut config = Config::new();
        config.set("simrank.source", Value::Int(source));
        config.set("simrank.target", Value::Int(target));
        config
    }

    #[test]
    fn walks_meeting_in_one_step_score_the_decay() {
        // both walks land on 2 at step 1 with probability 1
        let master = simrank_on(&[(0, 2), (1, 2)], &[0, 1, 2], pair_config(0, 1), 2);
        let estimate = master.get_aggregated::<f64>(SIMRANK).unwrap();
        assert!((estimate - 0.8).abs() < 1e-12);
    }

    #[test]
    fn walks_that_never_meet_score_zero() {
        let master = simrank_on(&[(0, 2), (1, 3)], &[0, 1, 2, 3], pair_config(0, 1), 2);
        assert_eq!(master.get_aggregated::<f64>(SIMRANK), Some(0.0));
        assert_eq!(master.get_aggregated::<f64>(SIMRANK_DELTA), Some(0.0));
    }

    #[test]
    fn split_walks_meet_with_quarter_probability() {
        // each walk splits over two targets; they overlap on 4 and 5
        let edges = [(0, 4), (0, 5), (1, 4), (1, 5)];
        let master = simrank_on(&edges, &[0, 1, 4, 5], pair_config(0, 1), 3);
        let estimate = master.get_aggregated::<f64>(SIMRANK).unwrap();
        assert!((estimate - 2.0 * 0.8 * 0.25).abs() < 1e-12);
    }

    #[test]
    fn identical_endpoints_are_a_configuration_error() {
        assert!(matches!(
            SimRank::from_config(&pair_config(7, 7)),
            Err(Error::Configuration(_))
        ));
    }
}
