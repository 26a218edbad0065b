//! computed.rs
//! The payload stored in the computation cache.

use super::spec::ValueSpecification;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Why a value that was expected is not there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissingValue {
    /// The producing node failed or was never run.
    NotCalculated,
    /// The live-data snapshot had nothing for this specification.
    MissingLiveData,
}

/// The atomic unit of data passed between nodes.
///
/// Cloning is cheap: series are shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Scalar(f64),
    Series(Arc<Vec<f64>>),
    Text(String),
    Missing(MissingValue),
}

impl Value {
    pub fn series(values: Vec<f64>) -> Self { Value::Series(Arc::new(values)) }

    pub fn is_missing(&self) -> bool { matches!(self, Value::Missing(_)) }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(s) => Some(*s),
            Value::Series(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    /// Element `i`, padding series with their last element and broadcasting scalars.
    #[inline(always)]
    pub fn get_at(&self, i: usize) -> Option<f64> {
        match self {
            Value::Scalar(s) => Some(*s),
            Value::Series(vec) => vec.get(i).or_else(|| vec.last()).copied(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedValue {
    pub spec: ValueSpecification,
    pub value: Value,
}

impl ComputedValue {
    pub fn new(spec: ValueSpecification, value: Value) -> Self {
        Self { spec, value }
    }
}
