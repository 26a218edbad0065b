//! Core of a valuation engine's calculation layer.
//!
//! Functions are compiled per valuation instant through a time-bounded cache,
//! dependency graphs are executed by dispatching ready nodes as jobs, and the
//! values they produce live in per-cycle computation caches.

pub mod analysis;
pub mod cache;
pub mod compile;
pub mod compute;
pub mod config;
pub mod display;
pub mod function;
pub mod graph;
pub mod interrupt;
pub mod temporal;
pub mod value;

#[cfg(test)]
pub(crate) mod fixtures;

pub use cache::{CacheIdentity, ComputationCache, ComputationCacheSource};
pub use compile::{CachingFunctionCompiler, CompilationError};
pub use compute::{
    ComputationCycle, CycleIdentity, CycleResult, DependencyGraphExecutor, ExecutionError, ExecutionReport,
    JobDispatcher, LocalCalculationNode, LocalJobDispatcher, ResultReceiver,
};
pub use config::{ConfigError, EngineConfig};
pub use function::{
    CompilationContext, CompiledFunction, CompiledRepository, FunctionDefinition, FunctionKind, FunctionRegistry,
    FunctionService,
};
pub use graph::{DependencyGraph, DependencyNode, NodeId};
pub use interrupt::InterruptHandle;
pub use temporal::{Instant, ValidityWindow};
