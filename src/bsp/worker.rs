use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use tracing::warn;

use super::aggregate::{AggVal, Aggregate};
use super::channel::Channel;
use super::combine::Combine;
use super::context::Context;
use super::message::Message;
use super::program::VertexProgram;
use super::vertex::Vertex;
use crate::error::{Error, Result};
use crate::io::VertexRecord;

/// Owns one partition of the vertex set and executes its share of every
/// superstep: run compute on active vertices, fold their accumulator
/// contributions into local partials, pre-combine and route outbound
/// messages, then drain inbound deliveries for the next superstep. Shared
/// state during a round is limited to the read-locked context and the
/// channel; everything else is private to the worker's thread.
pub(crate) struct Worker<V, E, M>
where
    V: 'static + Send,
    E: 'static + Send,
    M: 'static + Send + Clone,
{
    pub(crate) id: i64,
    pub(crate) time_cost: RefCell<u128>,
    pub(crate) n_msg_sent: RefCell<i64>,
    pub(crate) n_msg_recv: RefCell<i64>,
    pub(crate) n_active_vertices: RefCell<i64>,
    pub(crate) vertices: RefCell<HashMap<i64, Vertex<V, E, M>>>,

    channel: Channel<M>,
    partials: RefCell<HashMap<String, AggVal>>,
    send_queues: RefCell<HashMap<i64, VecDeque<Message<M>>>>,
}

impl<V, E, M> Worker<V, E, M>
where
    V: 'static + Send,
    E: 'static + Send,
    M: 'static + Send + Clone,
{
    pub(crate) fn new(id: i64, channel: Channel<M>) -> Self {
        Worker {
            id,
            channel,
            time_cost: RefCell::new(0),
            n_msg_sent: RefCell::new(0),
            n_msg_recv: RefCell::new(0),
            n_active_vertices: RefCell::new(0),
            vertices: RefCell::new(HashMap::new()),
            partials: RefCell::new(HashMap::new()),
            send_queues: RefCell::new(HashMap::new()),
        }
    }

    pub(crate) fn local_n_vertices(&self) -> i64 {
        self.vertices.borrow().len() as i64
    }

    pub(crate) fn local_n_edges(&self) -> i64 {
        self.vertices
            .borrow()
            .values()
            .map(|v| v.num_edges() as i64)
            .sum()
    }

    pub(crate) fn insert_record(&self, record: VertexRecord<V, E>) {
        let mut vertices = self.vertices.borrow_mut();
        let vertex = vertices
            .entry(record.id)
            .or_insert_with(|| Vertex::new(record.id, record.value));

        for edge in record.edges {
            if !vertex.add_edge(edge.target, edge.value) {
                warn!("duplicate edge from {} to {}", record.id, edge.target);
            }
        }
        *self.n_active_vertices.borrow_mut() = vertices.len() as i64;
    }

    pub(crate) fn ensure_vertex(&self, id: i64)
    where
        V: Default,
    {
        let mut vertices = self.vertices.borrow_mut();
        vertices
            .entry(id)
            .or_insert_with(|| Vertex::new(id, V::default()));
        *self.n_active_vertices.borrow_mut() = vertices.len() as i64;
    }

    pub(crate) fn take_partial(&self, name: &str) -> Option<AggVal> {
        self.partials.borrow_mut().remove(name)
    }

    /// One superstep. The `Done` broadcast and the delivery drain run even
    /// when compute fails, so the other workers' barriers still complete;
    /// queued messages of a failed round are discarded.
    pub(crate) fn run(&self, ctx: &Context<V, E, M>) -> Result<()> {
        let started = Instant::now();
        self.partials.borrow_mut().clear();
        *self.n_msg_sent.borrow_mut() = 0;
        *self.n_msg_recv.borrow_mut() = 0;

        let computed = self.compute_round(ctx);
        if computed.is_ok() {
            self.flush_messages();
        } else {
            self.send_queues.borrow_mut().clear();
        }
        self.channel.done();
        self.deliver(ctx);

        *self.n_active_vertices.borrow_mut() = self
            .vertices
            .borrow()
            .values()
            .filter(|v| v.active())
            .count() as i64;
        *self.time_cost.borrow_mut() = started.elapsed().as_millis();

        computed
    }

    fn compute_round(&self, ctx: &Context<V, E, M>) -> Result<()> {
        let superstep = ctx.superstep();
        let mut vertices = self.vertices.borrow_mut();

        for vertex in vertices.values_mut() {
            if !vertex.active() {
                continue;
            }

            ctx.program()
                .compute(vertex, ctx)
                .map_err(|fault| Error::ComputeFault {
                    vertex: vertex.id(),
                    superstep,
                    message: fault.to_string(),
                })?;

            vertex.clear_messages(superstep);
            self.fold_aggregates(ctx, vertex)?;
            self.collect_messages(ctx, vertex);
        }

        Ok(())
    }

    fn fold_aggregates(&self, ctx: &Context<V, E, M>, vertex: &mut Vertex<V, E, M>) -> Result<()> {
        let contributions = vertex.take_aggregates();
        if contributions.is_empty() {
            return Ok(());
        }

        let mut partials = self.partials.borrow_mut();
        for (name, value) in contributions {
            let registration = ctx.registry.get(&name).ok_or_else(|| {
                Error::AccumulatorMisuse(format!(
                    "vertex {} aggregated into unregistered accumulator `{name}`",
                    vertex.id()
                ))
            })?;

            let folded = match partials.remove(&name) {
                Some(prev) => registration.aggregator.combine(prev, value)?,
                None => value,
            };
            partials.insert(name, folded);
        }

        Ok(())
    }

    /// Moves a vertex's outbox into per-destination queues, folding with the
    /// combiner on the way so each destination holds at most one queued
    /// payload per sender-side worker.
    fn collect_messages(&self, ctx: &Context<V, E, M>, vertex: &Vertex<V, E, M>) {
        let combiner = ctx.combiner();
        let mut queues = self.send_queues.borrow_mut();
        let mut send_queue = vertex.send_queue.borrow_mut();

        for mut message in send_queue.drain(..) {
            let queue = queues.entry(message.receiver).or_default();
            if let Some(combine) = combiner {
                if let Some(prev) = queue.pop_front() {
                    message.value = combine.combine(prev.value, message.value);
                }
            }
            queue.push_back(message);
        }
    }

    fn flush_messages(&self) {
        let mut n_msg_sent = self.n_msg_sent.borrow_mut();
        let mut send_queues = self.send_queues.borrow_mut();

        for (_, mut send_queue) in send_queues.drain() {
            while let Some(message) = send_queue.pop_front() {
                self.channel.route(message);
                *n_msg_sent += 1;
            }
        }
    }

    fn deliver(&self, ctx: &Context<V, E, M>) {
        let superstep = ctx.superstep();
        let combiner = ctx.combiner();
        let mut vertices = self.vertices.borrow_mut();

        for message in &self.channel {
            match vertices.get_mut(&message.receiver) {
                Some(vertex) => {
                    let value = match combiner {
                        Some(combine) => match vertex.pop_pending_message(superstep) {
                            Some(prev) => combine.combine(prev, message.value),
                            None => message.value,
                        },
                        None => message.value,
                    };
                    vertex.receive_message(superstep, value);
                    *self.n_msg_recv.borrow_mut() += 1;
                }
                None => warn!(
                    "dropping message from {} to unknown vertex {}",
                    message.sender, message.receiver
                ),
            }
        }
    }
}
