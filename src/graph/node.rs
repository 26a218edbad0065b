//! Defines the `DependencyNode`: one function applied to one target.

use crate::function::{FunctionId, FunctionKind, FunctionParameters};
use crate::value::{ComputationTarget, ValueSpecification};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A function reference together with the parameters it was resolved with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterizedFunction {
    pub id: FunctionId,
    pub kind: FunctionKind,
    pub parameters: FunctionParameters,
}

impl ParameterizedFunction {
    pub fn new(id: impl Into<FunctionId>, kind: FunctionKind) -> Self {
        Self { id: id.into(), kind, parameters: FunctionParameters::new() }
    }

    pub fn ordinary(id: impl Into<FunctionId>) -> Self { Self::new(id, FunctionKind::Ordinary) }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}

/// Identity of a node within one calculation configuration of a cycle.
///
/// Executors running overlapping subgraphs share node state through this key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    pub function: FunctionId,
    pub target: ComputationTarget,
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.function, self.target)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DependencyNode {
    pub function: ParameterizedFunction,
    pub target: ComputationTarget,
    /// Concrete specifications of the values this node consumes, as resolved by
    /// the graph builder.
    pub input_values: BTreeSet<ValueSpecification>,
    pub output_values: BTreeSet<ValueSpecification>,
}

impl DependencyNode {
    pub fn new(function: ParameterizedFunction, target: ComputationTarget) -> Self {
        Self { function, target, input_values: BTreeSet::new(), output_values: BTreeSet::new() }
    }

    pub fn with_input(mut self, spec: ValueSpecification) -> Self {
        self.input_values.insert(spec);
        self
    }

    pub fn with_output(mut self, spec: ValueSpecification) -> Self {
        self.output_values.insert(spec);
        self
    }

    pub fn key(&self) -> NodeKey {
        NodeKey { function: self.function.id.clone(), target: self.target.clone() }
    }

    pub fn kind(&self) -> FunctionKind { self.function.kind }
}

impl fmt::Display for DependencyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.function.id, self.target)
    }
}
