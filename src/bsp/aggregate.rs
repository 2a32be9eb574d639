use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};

/// A single aggregated value. Values are immutable once wrapped; `combine`
/// produces fresh ones.
pub type AggVal = Arc<dyn Any + Send + Sync>;

/// A named global accumulator's operator: an identity element plus an
/// associative, commutative fold. Partial contributions are merged across
/// vertices and workers in unspecified order, so a non-commutative `combine`
/// yields non-deterministic results; the engine cannot detect that.
pub trait Aggregate: Send + Sync {
    fn identity(&self) -> AggVal;
    fn combine(&self, a: AggVal, b: AggVal) -> Result<AggVal>;
}

fn expect<T: Copy + 'static>(value: &AggVal, op: &str) -> Result<T> {
    value.downcast_ref::<T>().copied().ok_or_else(|| {
        Error::AccumulatorMisuse(format!(
            "{op} aggregator received a value of unexpected type"
        ))
    })
}

pub struct LongSumAggregator;

impl Aggregate for LongSumAggregator {
    fn identity(&self) -> AggVal {
        Arc::new(0_i64)
    }

    fn combine(&self, a: AggVal, b: AggVal) -> Result<AggVal> {
        Ok(Arc::new(expect::<i64>(&a, "sum")? + expect::<i64>(&b, "sum")?))
    }
}

pub struct DoubleSumAggregator;

impl Aggregate for DoubleSumAggregator {
    fn identity(&self) -> AggVal {
        Arc::new(0_f64)
    }

    fn combine(&self, a: AggVal, b: AggVal) -> Result<AggVal> {
        Ok(Arc::new(expect::<f64>(&a, "sum")? + expect::<f64>(&b, "sum")?))
    }
}

pub struct LongMaxAggregator;

impl Aggregate for LongMaxAggregator {
    fn identity(&self) -> AggVal {
        Arc::new(i64::MIN)
    }

    fn combine(&self, a: AggVal, b: AggVal) -> Result<AggVal> {
        Ok(Arc::new(
            expect::<i64>(&a, "max")?.max(expect::<i64>(&b, "max")?),
        ))
    }
}

pub struct DoubleMaxAggregator;

impl Aggregate for DoubleMaxAggregator {
    fn identity(&self) -> AggVal {
        Arc::new(f64::NEG_INFINITY)
    }

    fn combine(&self, a: AggVal, b: AggVal) -> Result<AggVal> {
        Ok(Arc::new(
            expect::<f64>(&a, "max")?.max(expect::<f64>(&b, "max")?),
        ))
    }
}

pub struct DoubleMinAggregator;

impl Aggregate for DoubleMinAggregator {
    fn identity(&self) -> AggVal {
        Arc::new(f64::INFINITY)
    }

    fn combine(&self, a: AggVal, b: AggVal) -> Result<AggVal> {
        Ok(Arc::new(
            expect::<f64>(&a, "min")?.min(expect::<f64>(&b, "min")?),
        ))
    }
}

pub struct BoolAndAggregator;

impl Aggregate for BoolAndAggregator {
    fn identity(&self) -> AggVal {
        Arc::new(true)
    }

    fn combine(&self, a: AggVal, b: AggVal) -> Result<AggVal> {
        Ok(Arc::new(
            expect::<bool>(&a, "and")? && expect::<bool>(&b, "and")?,
        ))
    }
}

pub struct BoolOrAggregator;

impl Aggregate for BoolOrAggregator {
    fn identity(&self) -> AggVal {
        Arc::new(false)
    }

    fn combine(&self, a: AggVal, b: AggVal) -> Result<AggVal> {
        Ok(Arc::new(
            expect::<bool>(&a, "or")? || expect::<bool>(&b, "or")?,
        ))
    }
}

pub(crate) struct Registration {
    pub(crate) aggregator: Box<dyn Aggregate>,
    /// Persistent accumulators start each superstep from the previous
    /// superstep's merged value; regular ones reset to the identity.
    pub(crate) persistent: bool,
}

/// Accumulator declarations. Open until superstep 0 starts, sealed after.
#[derive(Default)]
pub struct AggregatorRegistry {
    entries: HashMap<String, Registration>,
    sealed: bool,
}

impl AggregatorRegistry {
    pub(crate) fn new() -> Self {
        AggregatorRegistry::default()
    }

    pub fn register(
        &mut self,
        name: &str,
        aggregator: Box<dyn Aggregate>,
        persistent: bool,
    ) -> Result<()> {
        if self.sealed {
            return Err(Error::AccumulatorMisuse(format!(
                "accumulator `{name}` registered after superstep 0"
            )));
        }
        if self.entries.contains_key(name) {
            return Err(Error::AccumulatorMisuse(format!(
                "accumulator `{name}` registered twice"
            )));
        }
        self.entries.insert(
            name.to_string(),
            Registration {
                aggregator,
                persistent,
            },
        );
        Ok(())
    }

    pub(crate) fn seal(&mut self) {
        self.sealed = true;
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Registration> {
        self.entries.get(name)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&String, &Registration)> {
        self.entries.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn identities(&self) -> HashMap<String, AggVal> {
        self.entries
            .iter()
            .map(|(name, registration)| (name.clone(), registration.aggregator.identity()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold<A: Aggregate>(aggregator: &A, values: Vec<AggVal>) -> AggVal {
        values
            .into_iter()
            .fold(aggregator.identity(), |acc, v| {
                aggregator.combine(acc, v).unwrap()
            })
    }

    #[test]
    fn standard_aggregators_fold_from_identity() {
        let longs: Vec<AggVal> = vec![Arc::new(2_i64), Arc::new(3_i64)];
        let sum = fold(&LongSumAggregator, longs);
        assert_eq!(*sum.downcast_ref::<i64>().unwrap(), 5);

        let doubles: Vec<AggVal> = vec![Arc::new(0.25), Arc::new(-1.0)];
        let max = fold(&DoubleMaxAggregator, doubles.clone());
        assert_eq!(*max.downcast_ref::<f64>().unwrap(), 0.25);

        let min = fold(&DoubleMinAggregator, doubles);
        assert_eq!(*min.downcast_ref::<f64>().unwrap(), -1.0);

        let bools: Vec<AggVal> = vec![Arc::new(true), Arc::new(false)];
        let all = fold(&BoolAndAggregator, bools.clone());
        assert!(!*all.downcast_ref::<bool>().unwrap());

        let any = fold(&BoolOrAggregator, bools);
        assert!(*any.downcast_ref::<bool>().unwrap());

        let empty = fold(&BoolOrAggregator, Vec::new());
        assert!(!*empty.downcast_ref::<bool>().unwrap());
    }

    #[test]
    fn combine_rejects_wrong_types() {
        let result = LongSumAggregator.combine(Arc::new(1_i64), Arc::new(0.5_f64));
        assert!(matches!(result, Err(Error::AccumulatorMisuse(_))));
    }

    #[test]
    fn registry_seals_and_rejects_duplicates() {
        let mut registry = AggregatorRegistry::new();
        registry
            .register("count", Box::new(LongSumAggregator), false)
            .unwrap();
        assert!(registry
            .register("count", Box::new(LongSumAggregator), false)
            .is_err());

        registry.seal();
        let late = registry.register("late", Box::new(LongSumAggregator), true);
        assert!(matches!(late, Err(Error::AccumulatorMisuse(_))));
        assert!(registry.contains("count"));
        assert!(!registry.contains("late"));
    }
}
