//! The graph-analytics programs, one module per algorithm. Each supplies a
//! compute-contract implementation, its accumulator declarations, an
//! optional combiner, and an optional master phase, plus the input/output
//! wiring it expects.

pub mod ktruss;
pub mod random_walk;
pub mod simrank;
pub mod triangle_count;

use std::path::Path;

use clap::ValueEnum;

use crate::config::Config;
use crate::error::Result;

/// A triangle-protocol message. In the query phase `(from, edge_source,
/// edge_target)` asks `edge_source` whether the edge `edge_source →
/// edge_target` exists on behalf of `from`; in the report phase the receiver
/// tallies support for its edge to `edge_target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triple {
    pub from: i64,
    pub edge_source: i64,
    pub edge_target: i64,
}

impl Triple {
    pub fn new(from: i64, edge_source: i64, edge_target: i64) -> Self {
        Triple {
            from,
            edge_source,
            edge_target,
        }
    }
}

/// The algorithm tag, resolved once at startup from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Algorithm {
    /// Count triangles in an ordered graph.
    TriangleCount,
    /// Peel edges below the k-truss support threshold until a fixpoint.
    Ktruss,
    /// Stable reach probabilities of a single source via random walk.
    RandomWalk,
    /// Estimate SimRank s(u, v) with a pair of simultaneous random walks.
    Simrank,
}

impl Algorithm {
    pub fn run(self, input: &Path, output: &Path, workers: usize, config: Config) -> Result<()> {
        match self {
            Algorithm::TriangleCount => triangle_count::run(input, output, workers, config),
            Algorithm::Ktruss => ktruss::run(input, output, workers, config),
            Algorithm::RandomWalk => random_walk::run(input, output, workers, config),
            Algorithm::Simrank => simrank::run(input, output, workers, config),
        }
    }
}
