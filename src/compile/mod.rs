//! Turns a function registry into instant-valid compiled repositories,
//! reusing earlier compilations wherever their validity windows allow.
pub mod compiler;
pub mod error;

pub use compiler::{CachingFunctionCompiler, CompilationCacheKey};
pub use error::CompilationError;
