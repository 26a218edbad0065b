//! Runs dependency graphs: jobs, their dispatch, the local calculation node,
//! the per-graph executor and the cycle that ties them together.
pub mod cycle;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod job;
pub mod ledger;
pub mod node;

pub use cycle::{ComputationCycle, ConfigurationResult, CycleResources, CycleResult, CycleState, LiveDataSnapshot};
pub use dispatch::{JobDispatcher, LocalJobDispatcher, ResultReceiver};
pub use error::{CycleError, ExecutionError};
pub use executor::{DependencyGraphExecutor, ExecutionReport};
pub use job::{
    CycleIdentity, InvocationOutcome, Job, JobId, JobIdSource, JobItem, JobResult, JobResultItem, JobSpec,
};
pub use ledger::{CycleStateOracle, NodeState, NodeStateLedger};
pub use node::LocalCalculationNode;
