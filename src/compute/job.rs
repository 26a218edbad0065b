//! Units of dispatched work and what comes back from them.
//!
//! Everything here is plain data with serde derives so a transport can carry
//! jobs to another process unchanged.

use crate::cache::CacheIdentity;
use crate::graph::{DependencyNode, ParameterizedFunction};
use crate::temporal::Instant;
use crate::value::{ComputationTarget, ValueSpecification};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job#{}", self.0)
    }
}

/// Hands out job ids. One source is shared by every executor of a cycle so ids
/// never collide within it.
#[derive(Debug)]
pub struct JobIdSource(AtomicU64);

impl JobIdSource {
    pub fn new() -> Self { Self(AtomicU64::new(1)) }

    pub fn next_id(&self) -> JobId { JobId(self.0.fetch_add(1, Ordering::Relaxed)) }
}

impl Default for JobIdSource {
    fn default() -> Self { Self::new() }
}

/// The cycle-level facts every job of one cycle shares.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CycleIdentity {
    pub cycle_id: String,
    pub view: String,
    /// The instant functions are compiled for.
    pub valuation_time: Instant,
    /// Keys the computation caches of this cycle.
    pub iteration_timestamp: Instant,
}

impl CycleIdentity {
    pub fn new(cycle_id: impl Into<String>, view: impl Into<String>, valuation_time: Instant) -> Self {
        Self { cycle_id: cycle_id.into(), view: view.into(), valuation_time, iteration_timestamp: valuation_time }
    }

    pub fn with_iteration_timestamp(mut self, timestamp: Instant) -> Self {
        self.iteration_timestamp = timestamp;
        self
    }
}

/// Identity of one submitted job. Results are correlated back through it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobSpec {
    pub job_id: JobId,
    pub cycle: CycleIdentity,
    pub calculation_configuration: String,
}

impl JobSpec {
    pub fn cache_identity(&self) -> CacheIdentity {
        CacheIdentity::new(self.cycle.view.clone(), self.calculation_configuration.clone())
    }
}

/// One node invocation within a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobItem {
    pub function: ParameterizedFunction,
    pub target: ComputationTarget,
    pub inputs: SmallVec<[ValueSpecification; 4]>,
    pub desired_outputs: SmallVec<[ValueSpecification; 2]>,
}

impl JobItem {
    pub fn from_node(node: &DependencyNode) -> Self {
        Self {
            function: node.function.clone(),
            target: node.target.clone(),
            inputs: node.input_values.iter().cloned().collect(),
            desired_outputs: node.output_values.iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub spec: JobSpec,
    pub items: Vec<JobItem>,
}

impl Job {
    pub fn new(spec: JobSpec, items: Vec<JobItem>) -> Self { Self { spec, items } }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvocationOutcome {
    Success,
    FunctionFailed { message: String },
    MissingInputs { missing: Vec<ValueSpecification> },
    MissingOutputs { missing: Vec<ValueSpecification> },
}

impl InvocationOutcome {
    pub fn is_success(&self) -> bool { matches!(self, InvocationOutcome::Success) }
}

impl fmt::Display for InvocationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationOutcome::Success => f.write_str("success"),
            InvocationOutcome::FunctionFailed { message } => write!(f, "function failed: {}", message),
            InvocationOutcome::MissingInputs { missing } => write!(f, "{} input(s) missing", missing.len()),
            InvocationOutcome::MissingOutputs { missing } => write!(f, "{} output(s) not produced", missing.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResultItem {
    pub target: ComputationTarget,
    pub outcome: InvocationOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub spec: JobSpec,
    pub items: Vec<JobResultItem>,
    /// Name of the calculation node that ran the job.
    pub compute_node: String,
    pub duration: Duration,
}

impl JobResult {
    pub fn is_success(&self) -> bool { self.items.iter().all(|item| item.outcome.is_success()) }

    /// The first failing item's outcome, for logging.
    pub fn first_failure(&self) -> Option<&InvocationOutcome> {
        self.items.iter().map(|item| &item.outcome).find(|outcome| !outcome.is_success())
    }
}
