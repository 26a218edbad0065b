//! executor.rs
//! Drives one dependency graph through a cycle.
//!
//! The driving thread owns every scheduling set. Workers only ever touch the
//! result queue, which the driving thread drains after a bounded wait.

use super::dispatch::{JobDispatcher, ResultReceiver};
use super::error::ExecutionError;
use super::job::{CycleIdentity, Job, JobId, JobIdSource, JobItem, JobResult, JobSpec};
use super::ledger::CycleStateOracle;
use crate::analysis::telemetry::ExecutionStatistics;
use crate::function::FunctionKind;
use crate::graph::{DependencyGraph, NodeId};
use crate::interrupt::InterruptHandle;
use crate::value::ComputationTarget;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

struct ResultQueue {
    tx: Sender<JobResult>,
}

impl ResultReceiver for ResultQueue {
    fn result_received(&self, result: JobResult) {
        // Fails only when the executor has already abandoned the run.
        let _ = self.tx.send(result);
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    /// Nodes that completed successfully, including live-data nodes and nodes
    /// settled by another executor.
    pub executed: HashSet<NodeId>,
    /// Nodes whose job failed plus everything downstream of them.
    pub failed: HashSet<NodeId>,
    pub statistics: ExecutionStatistics,
}

impl ExecutionReport {
    pub fn is_executed(&self, id: NodeId) -> bool { self.executed.contains(&id) }
    pub fn is_failed(&self, id: NodeId) -> bool { self.failed.contains(&id) }

    pub fn failed_targets(&self, graph: &DependencyGraph) -> BTreeSet<ComputationTarget> {
        self.failed.iter().map(|&id| graph[id].target.clone()).collect()
    }
}

struct RunState {
    /// Kept in topological order so one reconcile pass propagates along chains.
    to_execute: Vec<NodeId>,
    executing: HashMap<JobId, NodeId>,
    executed: HashSet<NodeId>,
    failed: HashSet<NodeId>,
    statistics: ExecutionStatistics,
}

pub struct DependencyGraphExecutor<'g> {
    graph: &'g DependencyGraph,
    cycle: CycleIdentity,
    dispatcher: Arc<dyn JobDispatcher>,
    oracle: Arc<dyn CycleStateOracle>,
    job_ids: Arc<JobIdSource>,
    poll_interval: Duration,
    interrupt: InterruptHandle,
}

impl<'g> DependencyGraphExecutor<'g> {
    pub fn new(
        graph: &'g DependencyGraph,
        cycle: CycleIdentity,
        dispatcher: Arc<dyn JobDispatcher>,
        oracle: Arc<dyn CycleStateOracle>,
    ) -> Self {
        Self {
            graph,
            cycle,
            dispatcher,
            oracle,
            job_ids: Arc::new(JobIdSource::new()),
            poll_interval: DEFAULT_POLL_INTERVAL,
            interrupt: InterruptHandle::new(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_interrupt(mut self, interrupt: InterruptHandle) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Shares job numbering with the other executors of the cycle.
    pub fn with_job_ids(mut self, job_ids: Arc<JobIdSource>) -> Self {
        self.job_ids = job_ids;
        self
    }

    fn configuration(&self) -> &str { self.graph.calculation_configuration() }

    /// Runs the graph to completion. Returns once every node is executed or
    /// failed and no dispatched job is outstanding.
    pub fn execute(&self) -> Result<ExecutionReport, ExecutionError> {
        let started = std::time::Instant::now();
        let order = self.graph.topological_order()?;

        let mut run = RunState {
            to_execute: Vec::with_capacity(order.len()),
            executing: HashMap::new(),
            executed: HashSet::new(),
            failed: HashSet::new(),
            statistics: ExecutionStatistics::new(self.graph.node_count()),
        };

        for id in order {
            let node = &self.graph[id];
            if node.kind() == FunctionKind::LiveDataSourcing {
                run.executed.insert(id);
                run.statistics.live_data_skipped += 1;
                self.oracle.mark_executed(&node.key());
            } else {
                run.to_execute.push(id);
            }
        }

        let (tx, rx) = mpsc::channel();
        let mut sender = Some(tx);

        loop {
            self.reconcile(&mut run);
            if let Some(tx) = &sender {
                self.dispatch_ready(&mut run, tx);
            }
            if run.to_execute.is_empty() {
                // From here on only the receivers of outstanding jobs hold the queue open.
                sender = None;
            }

            if run.executing.is_empty() {
                if run.to_execute.is_empty() {
                    break;
                }
                self.fail_stalled(&mut run);
                continue;
            }

            for result in self.await_results(&rx, &run)? {
                self.apply_result(&mut run, result);
            }
        }

        run.statistics.wall_clock = started.elapsed();
        info!(
            configuration = self.configuration(),
            cycle = %self.cycle.cycle_id,
            nodes = self.graph.node_count(),
            executed = run.executed.len(),
            failed = run.failed.len(),
            jobs = run.statistics.dispatched_jobs,
            elapsed_ms = run.statistics.wall_clock.as_millis() as u64,
            "dependency graph executed"
        );
        Ok(ExecutionReport { executed: run.executed, failed: run.failed, statistics: run.statistics })
    }

    /// Settles nodes the oracle already knows about and fails nodes with a failed input.
    fn reconcile(&self, run: &mut RunState) {
        let RunState { to_execute, executed, failed, statistics, .. } = run;
        to_execute.retain(|&id| {
            let key = self.graph[id].key();
            if self.oracle.is_failed(&key) {
                failed.insert(id);
                statistics.reconciled += 1;
                return false;
            }
            if self.oracle.is_executed(&key) {
                executed.insert(id);
                statistics.reconciled += 1;
                return false;
            }
            if self.graph.inputs(id).any(|input| failed.contains(&input)) {
                failed.insert(id);
                statistics.propagated_failures += 1;
                self.oracle.mark_failed(&key);
                return false;
            }
            true
        });
    }

    fn dispatch_ready(&self, run: &mut RunState, tx: &Sender<JobResult>) {
        let ready: Vec<NodeId> = run
            .to_execute
            .iter()
            .copied()
            .filter(|&id| self.graph.inputs(id).all(|input| run.executed.contains(&input)))
            .collect();
        if ready.is_empty() {
            return;
        }
        let dispatched: HashSet<NodeId> = ready.iter().copied().collect();
        run.to_execute.retain(|id| !dispatched.contains(id));

        for id in ready {
            let node = &self.graph[id];
            let spec = JobSpec {
                job_id: self.job_ids.next_id(),
                cycle: self.cycle.clone(),
                calculation_configuration: self.configuration().to_string(),
            };
            debug!(job = %spec.job_id, node = %node, "dispatching job");
            run.executing.insert(spec.job_id, id);
            run.statistics.record_dispatch(node.kind());
            let job = Job::new(spec, vec![JobItem::from_node(node)]);
            self.dispatcher.submit(job, Arc::new(ResultQueue { tx: tx.clone() }));
        }
    }

    /// Blocks for at most one poll interval, then takes whatever else is queued.
    fn await_results(&self, rx: &Receiver<JobResult>, run: &RunState) -> Result<Vec<JobResult>, ExecutionError> {
        let mut results = Vec::new();
        match rx.recv_timeout(self.poll_interval) {
            Ok(result) => results.push(result),
            Err(RecvTimeoutError::Timeout) => {
                info!(configuration = self.configuration(), outstanding = run.executing.len(), "waiting for job results");
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(ExecutionError::ResultChannelClosed {
                    configuration: self.configuration().to_string(),
                    outstanding: run.executing.len(),
                });
            }
        }
        if self.interrupt.is_interrupted() {
            warn!(configuration = self.configuration(), outstanding = run.executing.len(), "execution interrupted");
            return Err(ExecutionError::Interrupted {
                configuration: self.configuration().to_string(),
                outstanding: run.executing.len(),
            });
        }
        results.extend(rx.try_iter());
        Ok(results)
    }

    fn apply_result(&self, run: &mut RunState, result: JobResult) {
        let Some(id) = run.executing.remove(&result.spec.job_id) else {
            warn!(job = %result.spec.job_id, "result for a job this executor is not waiting on");
            return;
        };
        let node = &self.graph[id];
        let success = result.is_success();
        run.statistics.record_result(result.duration, success);

        if success {
            run.executed.insert(id);
            self.oracle.mark_executed(&node.key());
            return;
        }

        warn!(
            job = %result.spec.job_id,
            node = %node,
            compute_node = %result.compute_node,
            reason = %result.first_failure().map(ToString::to_string).unwrap_or_default(),
            "job failed"
        );
        run.failed.insert(id);
        self.oracle.mark_failed(&node.key());

        let downstream = self.graph.downstream_from(&[id]);
        let RunState { to_execute, failed, statistics, .. } = run;
        let before = to_execute.len();
        to_execute.retain(|&n| {
            if !downstream.contains(&n) {
                return true;
            }
            failed.insert(n);
            self.oracle.mark_failed(&self.graph[n].key());
            false
        });
        let propagated = before - to_execute.len();
        if propagated > 0 {
            statistics.propagated_failures += propagated;
            info!(node = %node, propagated, "failure propagated downstream");
        }
    }

    /// Nothing is running and nothing is ready. Only reachable if the oracle
    /// reports a node executed while one of its inputs is still pending here.
    fn fail_stalled(&self, run: &mut RunState) {
        warn!(
            configuration = self.configuration(),
            remaining = run.to_execute.len(),
            "no node can make progress, failing the remainder"
        );
        for id in run.to_execute.drain(..) {
            run.failed.insert(id);
            run.statistics.propagated_failures += 1;
            self.oracle.mark_failed(&self.graph[id].key());
        }
    }
}
