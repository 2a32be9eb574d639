use std::any::Any;
use std::cell::RefCell;
use std::sync::Arc;

use super::aggregate::AggVal;
use super::context::Context;
use super::message::Message;

/// An outgoing edge: target vertex id plus an edge value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge<E> {
    pub target: i64,
    pub value: E,
}

/// A vertex and the state its compute callback may touch: its own value, its
/// own ordered edge collection, its halt flag, and the outboxes. Inbound
/// message queues are double-buffered by superstep parity so that messages
/// sent in superstep `n` become visible exactly at `n + 1`.
pub struct Vertex<V, E, M>
where
    V: 'static + Send,
    E: 'static + Send,
    M: 'static + Send + Clone,
{
    id: i64,
    value: V,
    active: bool,
    edges: Vec<Edge<E>>,
    inboxes: [Vec<M>; 2],
    pub(crate) send_queue: RefCell<Vec<Message<M>>>,
    pub(crate) agg_queue: RefCell<Vec<(String, AggVal)>>,
}

fn inbox_index(superstep: i64) -> usize {
    (superstep & 1) as usize
}

impl<V, E, M> Vertex<V, E, M>
where
    V: 'static + Send,
    E: 'static + Send,
    M: 'static + Send + Clone,
{
    pub(crate) fn new(id: i64, value: V) -> Self {
        Vertex {
            id,
            value,
            active: true,
            edges: Vec::new(),
            inboxes: [Vec::new(), Vec::new()],
            send_queue: RefCell::new(Vec::new()),
            agg_queue: RefCell::new(Vec::new()),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut V {
        &mut self.value
    }

    pub fn set_value(&mut self, value: V) {
        self.value = value;
    }

    pub fn active(&self) -> bool {
        self.active
    }

    /// Declares that this vertex has no more work absent new messages. Not
    /// permanent: delivery of a message reactivates the vertex for exactly
    /// the superstep that consumes it.
    pub fn vote_to_halt(&mut self) {
        self.active = false;
    }

    pub(crate) fn activate(&mut self) {
        self.active = true;
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// The current edge collection, in insertion order.
    pub fn edges(&self) -> &[Edge<E>] {
        &self.edges
    }

    pub fn has_edge_to(&self, target: i64) -> bool {
        self.edges.iter().any(|edge| edge.target == target)
    }

    /// Appends an edge; returns false (and leaves the collection unchanged)
    /// if an edge to `target` already exists.
    pub fn add_edge(&mut self, target: i64, value: E) -> bool {
        if self.has_edge_to(target) {
            return false;
        }
        self.edges.push(Edge { target, value });
        true
    }

    /// A cursor over the edge collection supporting in-place removal of the
    /// edge last yielded. The only handle through which edges may be removed.
    pub fn edge_cursor(&mut self) -> EdgeCursor<'_, E> {
        EdgeCursor {
            edges: &mut self.edges,
            next: 0,
            yielded: false,
        }
    }

    pub fn send_message_to(&self, receiver: i64, value: M) {
        self.send_queue
            .borrow_mut()
            .push(Message::new(value, self.id, receiver));
    }

    /// Sends `value` to every target in the edge collection as it stands at
    /// call time, so earlier edge mutations in the same compute call affect
    /// the fan-out.
    pub fn send_message_to_all_edges(&self, value: M) {
        for edge in &self.edges {
            self.send_message_to(edge.target, value.clone());
        }
    }

    /// Contributes a partial value to the named accumulator for the current
    /// superstep.
    pub fn aggregate<T: Any + Send + Sync>(&self, name: &str, value: T) {
        self.agg_queue
            .borrow_mut()
            .push((name.to_string(), Arc::new(value)));
    }

    pub fn has_messages(&self, ctx: &Context<V, E, M>) -> bool {
        !self.inboxes[inbox_index(ctx.superstep())].is_empty()
    }

    /// Pops one inbound message for the current superstep. Delivery order is
    /// unspecified; algorithms may rely only on multiset semantics.
    pub fn read_message(&mut self, ctx: &Context<V, E, M>) -> Option<M> {
        self.inboxes[inbox_index(ctx.superstep())].pop()
    }

    /// Enqueues a delivery produced during `superstep` for consumption in
    /// the next superstep, waking the vertex.
    pub(crate) fn receive_message(&mut self, superstep: i64, value: M) {
        self.inboxes[inbox_index(superstep + 1)].push(value);
        self.activate();
    }

    pub(crate) fn pop_pending_message(&mut self, superstep: i64) -> Option<M> {
        self.inboxes[inbox_index(superstep + 1)].pop()
    }

    pub(crate) fn clear_messages(&mut self, superstep: i64) {
        self.inboxes[inbox_index(superstep)].clear();
    }

    pub(crate) fn take_aggregates(&mut self) -> Vec<(String, AggVal)> {
        std::mem::take(&mut *self.agg_queue.borrow_mut())
    }
}

/// Cursor over a vertex's edge collection. `remove` is defined only on the
/// element last yielded by `next`; calling it at any other point is a
/// contract violation and panics.
pub struct EdgeCursor<'a, E> {
    edges: &'a mut Vec<Edge<E>>,
    next: usize,
    yielded: bool,
}

impl<'a, E> EdgeCursor<'a, E> {
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&Edge<E>> {
        if self.next < self.edges.len() {
            let edge = &self.edges[self.next];
            self.next += 1;
            self.yielded = true;
            Some(edge)
        } else {
            self.yielded = false;
            None
        }
    }

    /// Removes the edge last yielded, preserving the order of the rest.
    pub fn remove(&mut self) -> Edge<E> {
        assert!(self.yielded, "EdgeCursor::remove without a preceding next");
        self.yielded = false;
        self.next -= 1;
        self.edges.remove(self.next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex_with_edges(targets: &[i64]) -> Vertex<(), (), i64> {
        let mut vertex = Vertex::new(1, ());
        for &target in targets {
            vertex.add_edge(target, ());
        }
        vertex
    }

    #[test]
    fn add_edge_rejects_duplicates() {
        let mut vertex = vertex_with_edges(&[2, 3]);
        assert!(!vertex.add_edge(2, ()));
        assert_eq!(vertex.num_edges(), 2);
        assert!(vertex.has_edge_to(3));
        assert!(!vertex.has_edge_to(4));
    }

    #[test]
    fn cursor_yields_in_order_and_removes_last_yielded() {
        let mut vertex = vertex_with_edges(&[2, 3, 4, 5]);

        let mut cursor = vertex.edge_cursor();
        let mut kept = Vec::new();
        while let Some(edge) = cursor.next() {
            if edge.target % 2 == 1 {
                cursor.remove();
            } else {
                kept.push(edge.target);
            }
        }
        assert_eq!(kept, vec![2, 4]);

        let remaining: Vec<i64> = vertex.edges().iter().map(|e| e.target).collect();
        assert_eq!(remaining, vec![2, 4]);
    }

    #[test]
    fn cursor_can_drain_every_edge() {
        let mut vertex = vertex_with_edges(&[2, 3, 4]);
        let mut cursor = vertex.edge_cursor();
        while cursor.next().is_some() {
            cursor.remove();
        }
        assert_eq!(vertex.num_edges(), 0);
    }

    #[test]
    #[should_panic(expected = "without a preceding next")]
    fn cursor_remove_before_next_panics() {
        let mut vertex = vertex_with_edges(&[2]);
        let mut cursor = vertex.edge_cursor();
        cursor.remove();
    }

    #[test]
    fn send_to_all_edges_sees_mutations_at_call_time() {
        let mut vertex = vertex_with_edges(&[2, 3, 4]);

        let mut cursor = vertex.edge_cursor();
        cursor.next();
        cursor.remove();
        vertex.send_message_to_all_edges(7);

        let receivers: Vec<i64> = vertex
            .send_queue
            .borrow()
            .iter()
            .map(|m| m.receiver)
            .collect();
        assert_eq!(receivers, vec![3, 4]);
    }
}
