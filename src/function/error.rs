use super::definition::FunctionId;
use thiserror::Error;

/// A failure raised by function code itself, while compiling or invoking.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FunctionError {
    #[error("Function '{function}' cannot be compiled: {reason}")]
    Compilation { function: FunctionId, reason: String },
    #[error("Function '{function}' failed during invocation: {reason}")]
    Invocation { function: FunctionId, reason: String },
    #[error("Function '{function}' is missing required input '{input}'")]
    MissingInput { function: FunctionId, input: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Function id '{0}' is registered more than once")]
    DuplicateFunction(FunctionId),
}
