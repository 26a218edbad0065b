//! The function contract consumed by the engine.
//!
//! A `FunctionDefinition` is registered once per initialization generation. For a
//! given valuation instant it compiles to a `CompiledFunction`, which is only
//! valid inside its `ValidityWindow`. The pricing mathematics behind a function
//! are opaque to the engine.

use super::error::FunctionError;
use crate::interrupt::InterruptHandle;
use crate::temporal::{Instant, ValidityWindow};
use crate::value::{ComputationTarget, ComputedValue, Value, ValueRequirement, ValueSpecification};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionId(pub String);

impl FunctionId {
    pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FunctionId {
    fn from(s: &str) -> Self { Self(s.to_string()) }
}

/// What kind of unit a function is.
///
/// The executor and calculation nodes match on this instead of inspecting
/// concrete types. Only `Ordinary` functions run user code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum FunctionKind {
    #[default]
    Ordinary,
    /// Marks a node whose outputs come from the live-data snapshot; never dispatched.
    LiveDataSourcing,
    NoOp,
    /// Republishes its single input under a different specification.
    Relabelling,
    /// Publishes the target itself as the output value.
    TargetSourcing,
}

pub type FunctionParameters = BTreeMap<String, String>;

/// Environment handed to every compilation.
///
/// The generation token identifies the registry generation; when it changes all
/// previously compiled functions are stale.
#[derive(Debug, Clone, Default)]
pub struct CompilationContext {
    generation: u64,
    parameters: FunctionParameters,
    interrupt: InterruptHandle,
}

impl CompilationContext {
    pub fn new(generation: u64) -> Self {
        Self { generation, ..Default::default() }
    }

    pub fn with_parameters(mut self, parameters: FunctionParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Lets another thread abort a compile call that is waiting on the worker pool.
    pub fn with_interrupt(mut self, interrupt: InterruptHandle) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Fills in `defaults` for every parameter not already set.
    pub fn with_defaults(mut self, defaults: FunctionParameters) -> Self {
        for (name, value) in defaults {
            self.parameters.entry(name).or_insert(value);
        }
        self
    }

    pub fn interrupt(&self) -> &InterruptHandle { &self.interrupt }

    pub fn generation(&self) -> u64 { self.generation }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }
}

/// The resolved input values of one invocation, plus the parameters of the
/// node being invoked.
#[derive(Debug, Clone, Default)]
pub struct FunctionInputs {
    values: Vec<ComputedValue>,
    parameters: FunctionParameters,
}

impl FunctionInputs {
    pub fn new(values: Vec<ComputedValue>) -> Self { Self { values, parameters: FunctionParameters::new() } }

    pub fn with_parameters(mut self, parameters: FunctionParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    pub fn get(&self, spec: &ValueSpecification) -> Option<&Value> {
        self.values.iter().find(|v| &v.spec == spec).map(|v| &v.value)
    }

    /// The first input satisfying `requirement`.
    pub fn value_for(&self, requirement: &ValueRequirement) -> Option<&Value> {
        self.values.iter().find(|v| requirement.is_satisfied_by(&v.spec)).map(|v| &v.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComputedValue> { self.values.iter() }
    pub fn len(&self) -> usize { self.values.len() }
    pub fn is_empty(&self) -> bool { self.values.is_empty() }
}

/// An uncompiled calculation definition.
pub trait FunctionDefinition: Send + Sync {
    fn unique_id(&self) -> &FunctionId;

    fn short_name(&self) -> &str;

    fn kind(&self) -> FunctionKind { FunctionKind::Ordinary }

    /// Used for any parameter the engine configuration leaves unset.
    fn default_parameters(&self) -> FunctionParameters { FunctionParameters::new() }

    /// Produces an instance valid at `at`. The returned window must cover `at`.
    fn compile(&self, context: &CompilationContext, at: Instant) -> Result<Arc<dyn CompiledFunction>, FunctionError>;
}

/// A function bound to a validity window, ready for invocation.
///
/// The window is fixed for the lifetime of the instance.
pub trait CompiledFunction: Send + Sync {
    fn function_id(&self) -> &FunctionId;

    fn validity(&self) -> ValidityWindow;

    fn earliest_invocation(&self) -> Option<Instant> { self.validity().earliest }
    fn latest_invocation(&self) -> Option<Instant> { self.validity().latest }

    fn can_apply_to(&self, target: &ComputationTarget) -> bool;

    /// The value specifications this function could produce for `target`.
    fn results(&self, target: &ComputationTarget) -> Vec<ValueSpecification>;

    /// The inputs needed to produce `desired` for `target`.
    fn requirements(&self, target: &ComputationTarget, desired: &ValueSpecification) -> Vec<ValueRequirement>;

    fn execute(
        &self,
        inputs: &FunctionInputs,
        target: &ComputationTarget,
        desired: &[ValueSpecification],
    ) -> Result<Vec<ComputedValue>, FunctionError>;
}

impl fmt::Debug for dyn CompiledFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompiledFunction({} {})", self.function_id(), self.validity())
    }
}
