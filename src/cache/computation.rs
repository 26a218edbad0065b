//! computation.rs
//! A concurrent value store scoped to one cycle of one calculation configuration.

use crate::temporal::Instant;
use crate::value::{ComputedValue, Value, ValueSpecification};
use dashmap::DashMap;

/// Maps value specifications to computed values.
///
/// Safe for concurrent `get`/`put` from any number of threads. There is no
/// ordering between a `put` and a racing `get` of the same key: a reader must
/// only ask for a value once the graph says its producer has completed.
#[derive(Debug)]
pub struct ComputationCache {
    timestamp: Instant,
    values: DashMap<ValueSpecification, Value>,
}

impl ComputationCache {
    pub fn new(timestamp: Instant) -> Self {
        Self { timestamp, values: DashMap::new() }
    }

    /// The cycle timestamp this cache belongs to.
    pub fn timestamp(&self) -> Instant { self.timestamp }

    pub fn get(&self, spec: &ValueSpecification) -> Option<Value> {
        self.values.get(spec).map(|entry| entry.value().clone())
    }

    /// Looks up several values at once; absent ones come back as `None`.
    pub fn get_all<'a>(
        &self,
        specs: impl IntoIterator<Item = &'a ValueSpecification>,
    ) -> Vec<(ValueSpecification, Option<Value>)> {
        specs.into_iter().map(|spec| (spec.clone(), self.get(spec))).collect()
    }

    pub fn put(&self, value: ComputedValue) {
        self.values.insert(value.spec, value.value);
    }

    pub fn put_all(&self, values: impl IntoIterator<Item = ComputedValue>) {
        for value in values {
            self.put(value);
        }
    }

    pub fn contains(&self, spec: &ValueSpecification) -> bool { self.values.contains_key(spec) }
    pub fn len(&self) -> usize { self.values.len() }
    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    pub(crate) fn clear(&self) { self.values.clear(); }
}
