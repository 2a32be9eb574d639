use std::collections::HashMap;
use std::sync::Arc;

use super::aggregate::{AggVal, Aggregate, AggregatorRegistry};
use super::combine::Combine;
use super::program::VertexProgram;
use crate::config::Config;
use crate::error::{Error, Result};

/// Global run state visible to every vertex during a superstep: the
/// superstep counter, graph-wide statistics from the previous barrier, the
/// configuration surface, and the previous superstep's merged accumulator
/// values. Shared read-only across worker threads; the coordinator mutates
/// it only between rounds.
pub struct Context<V, E, M>
where
    V: 'static + Send,
    E: 'static + Send,
    M: 'static + Send + Clone,
{
    pub(crate) superstep: i64,
    pub(crate) num_vertices: i64,
    pub(crate) num_edges: i64,

    config: Config,
    program: Arc<dyn VertexProgram<V, E, M>>,
    combiner: Option<Box<dyn Combine<M>>>,
    pub(crate) registry: AggregatorRegistry,
    pub(crate) aggregated_values: HashMap<String, AggVal>,
}

impl<V, E, M> Context<V, E, M>
where
    V: 'static + Send,
    E: 'static + Send,
    M: 'static + Send + Clone,
{
    pub(crate) fn new(
        program: Arc<dyn VertexProgram<V, E, M>>,
        combiner: Option<Box<dyn Combine<M>>>,
        registry: AggregatorRegistry,
        config: Config,
    ) -> Self {
        let aggregated_values = registry.identities();
        Context {
            superstep: 0,
            num_vertices: 0,
            num_edges: 0,
            config,
            program,
            combiner,
            registry,
            aggregated_values,
        }
    }

    pub fn superstep(&self) -> i64 {
        self.superstep
    }

    pub fn num_vertices(&self) -> i64 {
        self.num_vertices
    }

    pub fn num_edges(&self) -> i64 {
        self.num_edges
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The named accumulator's merged value as of the previous superstep
    /// boundary (the identity before the first merge). `None` if the name is
    /// unregistered or `T` is not its value type.
    pub fn get_aggregated<T: Copy + Send + Sync + 'static>(&self, name: &str) -> Option<T> {
        self.aggregated_values
            .get(name)
            .and_then(|value| value.downcast_ref::<T>())
            .copied()
    }

    pub(crate) fn program(&self) -> &dyn VertexProgram<V, E, M> {
        &*self.program
    }

    pub(crate) fn program_handle(&self) -> Arc<dyn VertexProgram<V, E, M>> {
        Arc::clone(&self.program)
    }

    pub(crate) fn combiner(&self) -> Option<&dyn Combine<M>> {
        self.combiner.as_deref()
    }

    pub(crate) fn master_view(&mut self) -> MasterContext<'_> {
        MasterContext {
            superstep: self.superstep,
            num_vertices: self.num_vertices,
            num_edges: self.num_edges,
            config: &self.config,
            values: &mut self.aggregated_values,
            registry: &mut self.registry,
            halt: false,
        }
    }
}

/// The master phase's view of a superstep boundary, handed to the single
/// control callback after the global merge.
pub struct MasterContext<'a> {
    superstep: i64,
    num_vertices: i64,
    num_edges: i64,
    config: &'a Config,
    values: &'a mut HashMap<String, AggVal>,
    registry: &'a mut AggregatorRegistry,
    halt: bool,
}

impl<'a> MasterContext<'a> {
    pub fn superstep(&self) -> i64 {
        self.superstep
    }

    pub fn num_vertices(&self) -> i64 {
        self.num_vertices
    }

    pub fn num_edges(&self) -> i64 {
        self.num_edges
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    pub fn get_aggregated<T: Copy + Send + Sync + 'static>(&self, name: &str) -> Option<T> {
        self.values
            .get(name)
            .and_then(|value| value.downcast_ref::<T>())
            .copied()
    }

    /// Overwrites a registered accumulator's merged value. Meaningful for
    /// persistent accumulators, whose value carries into the next superstep.
    pub fn set_aggregated<T: Send + Sync + 'static>(&mut self, name: &str, value: T) -> Result<()> {
        if !self.registry.contains(name) {
            return Err(Error::AccumulatorMisuse(format!(
                "set_aggregated on unregistered accumulator `{name}`"
            )));
        }
        self.values.insert(name.to_string(), Arc::new(value));
        Ok(())
    }

    /// Legal only before superstep 0; the registry is sealed once the first
    /// superstep starts.
    pub fn register_aggregator(
        &mut self,
        name: &str,
        aggregator: Box<dyn Aggregate>,
        persistent: bool,
    ) -> Result<()> {
        self.registry.register(name, aggregator, persistent)
    }

    /// Requests global termination; the run stops at this boundary.
    pub fn halt(&mut self) {
        self.halt = true;
    }

    pub(crate) fn halt_requested(&self) -> bool {
        self.halt
    }
}
