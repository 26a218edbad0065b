//! The immutable set of function definitions for one initialization generation.

use super::definition::{FunctionDefinition, FunctionId};
use super::error::RegistryError;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a built registry. Part of the compilation cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistryId(pub u64);

impl fmt::Display for RegistryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "registry#{}", self.0)
    }
}

pub struct FunctionRegistry {
    id: RegistryId,
    functions: Vec<Arc<dyn FunctionDefinition>>,
    /// Display names, disambiguated. Parallel to `functions`.
    short_names: Vec<String>,
    by_id: HashMap<FunctionId, usize>,
}

impl FunctionRegistry {
    pub fn builder() -> FunctionRegistryBuilder { FunctionRegistryBuilder::default() }

    pub fn id(&self) -> RegistryId { self.id }
    pub fn len(&self) -> usize { self.functions.len() }
    pub fn is_empty(&self) -> bool { self.functions.is_empty() }

    pub fn get(&self, id: &FunctionId) -> Option<&Arc<dyn FunctionDefinition>> {
        self.by_id.get(id).map(|&i| &self.functions[i])
    }

    pub fn short_name(&self, id: &FunctionId) -> Option<&str> {
        self.by_id.get(id).map(|&i| self.short_names[i].as_str())
    }

    /// Definitions in registration order.
    pub fn functions(&self) -> impl Iterator<Item = &Arc<dyn FunctionDefinition>> {
        self.functions.iter()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("id", &self.id)
            .field("functions", &self.short_names)
            .finish()
    }
}

#[derive(Default)]
pub struct FunctionRegistryBuilder {
    functions: Vec<Arc<dyn FunctionDefinition>>,
    short_names: Vec<String>,
    by_id: HashMap<FunctionId, usize>,
    used_names: HashSet<String>,
}

impl FunctionRegistryBuilder {
    pub fn register(&mut self, function: Arc<dyn FunctionDefinition>) -> Result<&mut Self, RegistryError> {
        let id = function.unique_id().clone();
        if self.by_id.contains_key(&id) {
            return Err(RegistryError::DuplicateFunction(id));
        }

        // --- Unique Short Name ---
        let original_name = function.short_name().to_string();
        let mut candidate_name = original_name.clone();
        let mut counter = 1;
        while self.used_names.contains(&candidate_name) {
            candidate_name = format!("{}_{}", original_name, counter);
            counter += 1;
        }
        self.used_names.insert(candidate_name.clone());

        self.by_id.insert(id, self.functions.len());
        self.short_names.push(candidate_name);
        self.functions.push(function);
        Ok(self)
    }

    pub fn build(self) -> FunctionRegistry {
        FunctionRegistry {
            id: RegistryId(NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed)),
            functions: self.functions,
            short_names: self.short_names,
            by_id: self.by_id,
        }
    }
}
