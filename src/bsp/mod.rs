//! The BSP vertex-centric execution engine: synchronous supersteps, message
//! routing with optional combining, global reductions, and the master phase.

mod channel;
mod message;
mod worker;

mod aggregate;
pub use aggregate::*;

mod combine;
pub use combine::*;

mod context;
pub use context::*;

mod master;
pub use master::*;

mod program;
pub use program::*;

mod vertex;
pub use vertex::*;
