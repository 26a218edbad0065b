use crate::function::FunctionKind;
use std::collections::BTreeMap;
use std::time::Duration;

/// Counters gathered by one executor run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionStatistics {
    pub total_nodes: usize,
    /// Jobs handed to the dispatcher (one per node).
    pub dispatched_jobs: usize,
    /// Nodes whose job came back successful.
    pub executed: usize,
    /// Nodes whose own job failed.
    pub failed: usize,
    /// Nodes failed without running because an input failed.
    pub propagated_failures: usize,
    /// Live-data nodes, satisfied before the graph runs and never dispatched.
    pub live_data_skipped: usize,
    /// Nodes another executor of the same cycle had already settled.
    pub reconciled: usize,
    pub dispatch_counts: BTreeMap<FunctionKind, usize>,
    /// Sum of the durations workers reported.
    pub total_job_time: Duration,
    pub max_job_time: Duration,
    pub wall_clock: Duration,
}

impl ExecutionStatistics {
    pub fn new(total_nodes: usize) -> Self {
        Self { total_nodes, ..Default::default() }
    }

    pub fn record_dispatch(&mut self, kind: FunctionKind) {
        self.dispatched_jobs += 1;
        *self.dispatch_counts.entry(kind).or_insert(0) += 1;
    }

    pub fn record_result(&mut self, duration: Duration, success: bool) {
        if success {
            self.executed += 1;
        } else {
            self.failed += 1;
        }
        self.total_job_time += duration;
        self.max_job_time = self.max_job_time.max(duration);
    }

    /// Average reported job duration, zero if nothing was dispatched.
    pub fn mean_job_time(&self) -> Duration {
        match u32::try_from(self.executed + self.failed) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.total_job_time / n,
        }
    }

    /// Nodes that ended failed for any reason.
    pub fn total_failed(&self) -> usize { self.failed + self.propagated_failures }
}
