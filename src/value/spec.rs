//! Value requirements (what a function asks for) and value specifications
//! (the fully resolved identity of one computed artifact).

use super::target::ComputationTarget;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered name/value qualifiers, e.g. `Currency=USD`, `Curve=Discounting`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ValueProperties(pub BTreeMap<String, String>);

impl ValueProperties {
    pub fn new() -> Self { Self::default() }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// True when every constraint in `self` is present, with the same value, in `other`.
    pub fn is_satisfied_by(&self, other: &ValueProperties) -> bool {
        self.0.iter().all(|(k, v)| other.0.get(k) == Some(v))
    }
}

impl fmt::Display for ValueProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{{{}}}", parts.join(","))
    }
}

/// A declared need for a value, possibly under-constrained.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueRequirement {
    pub name: String,
    pub target: ComputationTarget,
    pub constraints: ValueProperties,
}

impl ValueRequirement {
    pub fn new(name: impl Into<String>, target: ComputationTarget) -> Self {
        Self { name: name.into(), target, constraints: ValueProperties::new() }
    }

    pub fn with_constraints(mut self, constraints: ValueProperties) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn is_satisfied_by(&self, spec: &ValueSpecification) -> bool {
        self.name == spec.name && self.target == spec.target && self.constraints.is_satisfied_by(&spec.properties)
    }
}

/// Fully qualified identity of one computed artifact: name + target + properties.
///
/// This is the key of the computation cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueSpecification {
    pub name: String,
    pub target: ComputationTarget,
    pub properties: ValueProperties,
}

impl ValueSpecification {
    pub fn new(name: impl Into<String>, target: ComputationTarget, properties: ValueProperties) -> Self {
        Self { name: name.into(), target, properties }
    }
}

impl fmt::Display for ValueSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]{}", self.name, self.target, self.properties)
    }
}
