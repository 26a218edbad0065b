//! Per-cycle stores of computed values shared between nodes and workers.
pub mod computation;
pub mod source;

pub use computation::ComputationCache;
pub use source::{CacheIdentity, ComputationCacheSource};
