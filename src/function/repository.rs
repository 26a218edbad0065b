//! Compiled functions for one (registry, instant) pair.

use super::definition::{CompiledFunction, FunctionId};
use crate::temporal::{Instant, ValidityWindow};
use std::collections::HashMap;
use std::sync::Arc;

/// Compiled functions keyed by id.
///
/// The repository's own window is the intersection of the windows of everything
/// it holds, so any instant it covers is valid for every contained function.
#[derive(Debug, Clone)]
pub struct CompiledRepository {
    compiled_at: Instant,
    functions: HashMap<FunctionId, Arc<dyn CompiledFunction>>,
    validity: ValidityWindow,
}

impl CompiledRepository {
    pub fn new(compiled_at: Instant) -> Self {
        Self { compiled_at, functions: HashMap::new(), validity: ValidityWindow::UNBOUNDED }
    }

    pub fn compiled_at(&self) -> Instant { self.compiled_at }

    pub fn insert(&mut self, function: Arc<dyn CompiledFunction>) {
        self.validity = self.validity.intersect(&function.validity());
        self.functions.insert(function.function_id().clone(), function);
    }

    pub fn get(&self, id: &FunctionId) -> Option<&Arc<dyn CompiledFunction>> {
        self.functions.get(id)
    }

    pub fn contains(&self, id: &FunctionId) -> bool { self.functions.contains_key(id) }
    pub fn len(&self) -> usize { self.functions.len() }
    pub fn is_empty(&self) -> bool { self.functions.is_empty() }

    pub fn functions(&self) -> impl Iterator<Item = &Arc<dyn CompiledFunction>> {
        self.functions.values()
    }

    pub fn validity(&self) -> ValidityWindow { self.validity }
    pub fn earliest_invocation(&self) -> Option<Instant> { self.validity.earliest }
    pub fn latest_invocation(&self) -> Option<Instant> { self.validity.latest }
}
