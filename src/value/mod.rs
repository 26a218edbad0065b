//! Identities of the artifacts the engine computes, and the values themselves.
pub mod computed;
pub mod spec;
pub mod target;

pub use computed::{ComputedValue, MissingValue, Value};
pub use spec::{ValueProperties, ValueRequirement, ValueSpecification};
pub use target::{ComputationTarget, TargetKind};
