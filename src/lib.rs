//! Graph analytics on a vertex-centric BSP engine.
//!
//! The [`bsp`] module is the engine: synchronous supersteps, per-vertex
//! compute with halt voting, next-round message delivery with optional
//! combining, and globally merged accumulators. The [`algorithms`] module
//! holds the programs written against that contract: triangle counting,
//! k-truss peeling, and random-walk SimRank estimation.

pub mod algorithms;
pub mod bsp;
pub mod config;
pub mod error;
pub mod io;

pub use error::{Error, Result};

use tracing::metadata::LevelFilter;
use tracing_subscriber::EnvFilter;

pub fn init_logger_info() {
    init_logger(LevelFilter::INFO);
}

pub fn init_logger_debug() {
    init_logger(LevelFilter::DEBUG);
}

pub fn init_logger(filter: LevelFilter) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(filter.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .unwrap_or_else(|e| {
            eprintln!("failed to init logger: {e}");
        });
}
