//! Calculation definitions, their compiled (instant-valid) forms, and the
//! registry/service that owns them.
pub mod definition;
pub mod error;
pub mod registry;
pub mod repository;
pub mod service;

pub use definition::{
    CompilationContext, CompiledFunction, FunctionDefinition, FunctionId, FunctionInputs, FunctionKind,
    FunctionParameters,
};
pub use error::{FunctionError, RegistryError};
pub use registry::{FunctionRegistry, FunctionRegistryBuilder, RegistryId};
pub use repository::CompiledRepository;
pub use service::FunctionService;
