use crate::function::RegistryId;
use crate::temporal::Instant;
use thiserror::Error;

/// Failures that abort a whole `compile` call.
///
/// A single function failing to compile is not one of these; it is logged and
/// left out of the repository.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompilationError {
    #[error("Concurrent compilation of {registry} at {instant} failed: {reason}")]
    ConcurrentCompilationFailure { registry: RegistryId, instant: Instant, reason: String },
    #[error("Compilation of {registry} at {instant} was interrupted with {outstanding} function(s) outstanding")]
    Interrupted { registry: RegistryId, instant: Instant, outstanding: usize },
}
