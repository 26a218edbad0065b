use crate::compile::CompilationError;
use crate::graph::GraphError;
use thiserror::Error;

/// Fatal conditions of one executor run. A failing node is not one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
    #[error("Execution of '{configuration}' interrupted with {outstanding} job(s) outstanding")]
    Interrupted { configuration: String, outstanding: usize },
    #[error("Every result receiver of '{configuration}' was dropped with {outstanding} job(s) outstanding")]
    ResultChannelClosed { configuration: String, outstanding: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CycleError {
    #[error("Cycle '{0}' has already been executed")]
    AlreadyExecuted(String),
    #[error("Functions could not be compiled for the cycle: {0}")]
    Compilation(#[from] CompilationError),
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),
    #[error("Driving thread for '{0}' panicked")]
    DriverPanicked(String),
}
