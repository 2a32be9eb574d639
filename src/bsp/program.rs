use super::aggregate::AggregatorRegistry;
use super::combine::Combine;
use super::context::{Context, MasterContext};
use super::vertex::Vertex;
use crate::error::Result;

/// One graph algorithm, expressed against the vertex compute contract.
///
/// `compute` runs once per superstep on every vertex that is active or was
/// reactivated by a delivery. An empty inbound queue is a valid, expected
/// case; phase-structured algorithms key off `ctx.superstep()` instead. Side
/// effects are limited to the vertex's own value and edges, message sends,
/// accumulator contributions, and halt voting. An error is fatal to the run.
pub trait VertexProgram<V, E, M>: Send + Sync
where
    V: 'static + Send,
    E: 'static + Send,
    M: 'static + Send + Clone,
{
    fn compute(&self, vertex: &mut Vertex<V, E, M>, ctx: &Context<V, E, M>) -> Result<()>;

    /// Declares the algorithm's accumulators. Invoked once, before
    /// superstep 0; the registry seals afterwards.
    fn register_aggregators(&self, _registry: &mut AggregatorRegistry) -> Result<()> {
        Ok(())
    }

    /// An optional pre-delivery fold for same-destination messages.
    fn combiner(&self) -> Option<Box<dyn Combine<M>>> {
        None
    }

    /// The master phase: one control callback per superstep boundary, after
    /// the global merge. May read merged values, overwrite persistent
    /// accumulators, and request termination.
    fn master_compute(&self, _ctx: &mut MasterContext<'_>) -> Result<()> {
        Ok(())
    }
}
