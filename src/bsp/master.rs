use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::thread::spawn;
use std::time::Instant;

use tracing::{debug, info};

use super::aggregate::{Aggregate, AggregatorRegistry};
use super::channel::Channel;
use super::context::Context;
use super::program::VertexProgram;
use super::worker::Worker;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::io::{GraphSink, GraphSource};

/// The superstep coordinator. Owns the workers and the superstep counter and
/// drives the loop: run every worker's round concurrently, merge accumulator
/// contributions at the barrier, run the master phase, decide termination.
pub struct Master<V, E, M>
where
    V: 'static + Send,
    E: 'static + Send,
    M: 'static + Send + Clone,
{
    nworkers: i64,
    workers: HashMap<i64, Worker<V, E, M>>,
    context: Arc<RwLock<Context<V, E, M>>>,
}

impl<V, E, M> Master<V, E, M>
where
    V: 'static + Send,
    E: 'static + Send,
    M: 'static + Send + Clone,
{
    /// Sets up the run: registers the program's accumulators, seals the
    /// registry, and creates the workers and their channels. Configuration
    /// problems surface here, before any superstep executes.
    pub fn new(
        nworkers: usize,
        program: Arc<dyn VertexProgram<V, E, M>>,
        config: Config,
    ) -> Result<Self> {
        if nworkers == 0 {
            return Err(Error::Configuration(
                "at least one worker is required".to_string(),
            ));
        }

        let mut registry = AggregatorRegistry::new();
        program.register_aggregators(&mut registry)?;
        registry.seal();

        let combiner = program.combiner();
        let context = Context::new(program, combiner, registry, config);

        let workers = Channel::create(nworkers)
            .into_iter()
            .enumerate()
            .map(|(id, channel)| (id as i64, Worker::new(id as i64, channel)))
            .collect();

        Ok(Master {
            nworkers: nworkers as i64,
            workers,
            context: Arc::new(RwLock::new(context)),
        })
    }

    /// Loads the initial vertex set, partitioning records across workers by
    /// id. Edge targets without a record of their own are materialized with
    /// a default value.
    pub fn load(&mut self, source: &mut dyn GraphSource<V, E>) -> Result<()>
    where
        V: Default,
    {
        let mut targets = Vec::new();
        for record in source.read()? {
            targets.extend(record.edges.iter().map(|edge| edge.target));
            self.worker_of(record.id).insert_record(record);
        }
        for target in targets {
            self.worker_of(target).ensure_vertex(target);
        }

        let mut context = self.context.write().unwrap();
        context.num_vertices = self.workers.values().map(|w| w.local_n_vertices()).sum();
        context.num_edges = self.workers.values().map(|w| w.local_n_edges()).sum();
        Ok(())
    }

    fn worker_of(&self, id: i64) -> &Worker<V, E, M> {
        &self.workers[&id.rem_euclid(self.nworkers)]
    }

    /// Runs supersteps until the master phase requests termination or every
    /// vertex is halted with no pending messages. Absent either, this loops
    /// forever; bounding iteration is the algorithm's responsibility.
    pub fn run(&mut self) -> Result<()> {
        let started = Instant::now();

        loop {
            let mut handles = Vec::with_capacity(self.workers.len());
            for (_, worker) in self.workers.drain() {
                let context = Arc::clone(&self.context);
                handles.push(spawn(move || {
                    let result = worker.run(&context.read().unwrap());
                    (worker, result)
                }));
            }

            let mut round = Ok(());
            for handle in handles {
                let (worker, result) = handle.join().unwrap();
                if round.is_ok() {
                    round = result;
                }
                self.workers.insert(worker.id, worker);
            }
            round?;

            let mut context = self.context.write().unwrap();
            self.merge(&mut context)?;
            self.log_stats(&context);

            let halt_requested = self.master_phase(&mut context)?;
            let n_active: i64 = self
                .workers
                .values()
                .map(|w| *w.n_active_vertices.borrow())
                .sum();

            if halt_requested || n_active == 0 {
                info!(
                    "run finished after {} supersteps in {} ms",
                    context.superstep() + 1,
                    started.elapsed().as_millis()
                );
                return Ok(());
            }
            context.superstep += 1;
        }
    }

    /// The global reduction barrier: folds every worker's partial
    /// contributions onto the identity (or, for persistent accumulators,
    /// onto the previous superstep's merged value).
    fn merge(&self, context: &mut Context<V, E, M>) -> Result<()> {
        let mut merged = HashMap::with_capacity(context.registry.len());
        for (name, registration) in context.registry.iter() {
            let mut value = if registration.persistent {
                context
                    .aggregated_values
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| registration.aggregator.identity())
            } else {
                registration.aggregator.identity()
            };

            for worker in self.workers.values() {
                if let Some(partial) = worker.take_partial(name) {
                    value = registration.aggregator.combine(value, partial)?;
                }
            }
            merged.insert(name.clone(), value);
        }

        context.aggregated_values = merged;
        context.num_vertices = self.workers.values().map(|w| w.local_n_vertices()).sum();
        context.num_edges = self.workers.values().map(|w| w.local_n_edges()).sum();
        Ok(())
    }

    fn master_phase(&self, context: &mut Context<V, E, M>) -> Result<bool> {
        let program = context.program_handle();
        let mut master_ctx = context.master_view();
        program.master_compute(&mut master_ctx)?;
        Ok(master_ctx.halt_requested())
    }

    fn log_stats(&self, context: &Context<V, E, M>) {
        info!(
            "superstep {}: {} vertices, {} edges",
            context.superstep(),
            context.num_vertices(),
            context.num_edges()
        );
        for worker in self.workers.values() {
            debug!(
                "worker {}: {} of {} vertices active, {} edges, {} msg sent, {} msg recv, {} ms",
                worker.id,
                worker.n_active_vertices.borrow(),
                worker.local_n_vertices(),
                worker.local_n_edges(),
                worker.n_msg_sent.borrow(),
                worker.n_msg_recv.borrow(),
                worker.time_cost.borrow()
            );
        }
    }

    /// The named accumulator's merged value as of the last completed
    /// superstep.
    pub fn get_aggregated<T: Copy + Send + Sync + 'static>(&self, name: &str) -> Option<T> {
        self.context.read().unwrap().get_aggregated::<T>(name)
    }

    pub fn num_vertices(&self) -> i64 {
        self.context.read().unwrap().num_vertices()
    }

    pub fn num_edges(&self) -> i64 {
        self.context.read().unwrap().num_edges()
    }

    /// Hands final vertex state to the output collaborator, in ascending id
    /// order.
    pub fn write_output(&self, sink: &mut dyn GraphSink<V, E>) -> Result<()> {
        let mut ids: Vec<i64> = Vec::new();
        for worker in self.workers.values() {
            ids.extend(worker.vertices.borrow().keys().copied());
        }
        ids.sort_unstable();

        for id in ids {
            let worker = self.worker_of(id);
            let vertices = worker.vertices.borrow();
            let vertex = &vertices[&id];
            sink.write_vertex(vertex.id(), vertex.value(), vertex.edges())?;
        }
        sink.flush()
    }
}
