//! The transport between an executor and whatever runs its jobs.

use super::job::{Job, JobResult};
use super::node::LocalCalculationNode;
use rayon::ThreadPool;
use std::sync::Arc;
use tracing::debug;

/// Receives the result of a submitted job, from any thread.
pub trait ResultReceiver: Send + Sync {
    fn result_received(&self, result: JobResult);
}

/// Accepts jobs and reports each one's result exactly once, asynchronously.
pub trait JobDispatcher: Send + Sync {
    fn submit(&self, job: Job, receiver: Arc<dyn ResultReceiver>);
}

/// Runs jobs in-process on the worker pool.
pub struct LocalJobDispatcher {
    node: Arc<LocalCalculationNode>,
    pool: Arc<ThreadPool>,
}

impl LocalJobDispatcher {
    pub fn new(node: Arc<LocalCalculationNode>, pool: Arc<ThreadPool>) -> Self {
        Self { node, pool }
    }
}

impl JobDispatcher for LocalJobDispatcher {
    fn submit(&self, job: Job, receiver: Arc<dyn ResultReceiver>) {
        let node = Arc::clone(&self.node);
        debug!(job = %job.spec.job_id, items = job.items.len(), node = node.name(), "queueing job on local node");
        self.pool.spawn(move || {
            let result = node.execute_job(&job);
            receiver.result_received(result);
        });
    }
}
