/// Pre-delivery fold of same-destination messages within a superstep.
///
/// `combine` must be associative and commutative: messages reach the fold in
/// no particular order, and partial folds happen both on the sending side and
/// on the receiving side. A destination with a registered combiner observes
/// exactly one payload per superstep.
pub trait Combine<M>: Send + Sync {
    fn combine(&self, a: M, b: M) -> M;
}
