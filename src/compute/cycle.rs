//! A single computation cycle: every calculation configuration of one view,
//! evaluated at one valuation instant.

use super::dispatch::{JobDispatcher, LocalJobDispatcher};
use super::error::CycleError;
use super::executor::{DependencyGraphExecutor, ExecutionReport, DEFAULT_POLL_INTERVAL};
use super::job::{CycleIdentity, JobIdSource};
use super::ledger::NodeStateLedger;
use super::node::LocalCalculationNode;
use crate::analysis::telemetry::ExecutionStatistics;
use crate::cache::{CacheIdentity, ComputationCache, ComputationCacheSource};
use crate::config::{ConfigError, EngineConfig};
use crate::function::{FunctionKind, FunctionRegistry, FunctionService};
use crate::graph::DependencyGraph;
use crate::interrupt::InterruptHandle;
use crate::value::{ComputationTarget, ComputedValue, MissingValue, Value, ValueSpecification};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// Market data as of the cycle's valuation time.
pub trait LiveDataSnapshot: Send + Sync {
    fn query(&self, spec: &ValueSpecification) -> Option<Value>;
}

impl LiveDataSnapshot for HashMap<ValueSpecification, Value> {
    fn query(&self, spec: &ValueSpecification) -> Option<Value> { self.get(spec).cloned() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    AwaitingExecution,
    Executing,
    Executed,
    ExecutionInterrupted,
}

/// Shared services a cycle runs against.
#[derive(Clone)]
pub struct CycleResources {
    pub functions: Arc<FunctionService>,
    pub caches: Arc<ComputationCacheSource>,
    pub dispatcher: Arc<dyn JobDispatcher>,
    pub poll_interval: Duration,
}

impl CycleResources {
    pub fn new(
        functions: Arc<FunctionService>,
        caches: Arc<ComputationCacheSource>,
        dispatcher: Arc<dyn JobDispatcher>,
    ) -> Self {
        Self { functions, caches, dispatcher, poll_interval: DEFAULT_POLL_INTERVAL }
    }

    /// A single-process engine assembled from `config`: the function service
    /// with its worker pool, one local calculation node, and the executor result wait.
    pub fn local(config: &EngineConfig, registry: FunctionRegistry) -> Result<Self, ConfigError> {
        let functions = Arc::new(FunctionService::from_config(config, registry)?);
        let caches = Arc::new(ComputationCacheSource::new());
        let node = Arc::new(LocalCalculationNode::from_config(config, Arc::clone(&functions), Arc::clone(&caches)));
        let dispatcher = Arc::new(LocalJobDispatcher::new(node, Arc::clone(functions.pool())));
        Ok(Self::new(functions, caches, dispatcher).with_poll_interval(config.result_poll_interval()))
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigurationResult {
    /// Every terminal output of the graph. `None` if nothing was ever written for it.
    pub values: BTreeMap<ValueSpecification, Option<Value>>,
    pub failed_targets: BTreeSet<ComputationTarget>,
    pub statistics: ExecutionStatistics,
}

#[derive(Debug, Clone)]
pub struct CycleResult {
    pub identity: CycleIdentity,
    pub configurations: BTreeMap<String, ConfigurationResult>,
}

impl CycleResult {
    pub fn value(&self, configuration: &str, spec: &ValueSpecification) -> Option<&Value> {
        self.configurations.get(configuration)?.values.get(spec)?.as_ref()
    }
}

pub struct ComputationCycle {
    identity: CycleIdentity,
    graphs: Vec<DependencyGraph>,
    resources: CycleResources,
    state: CycleState,
    interrupt: InterruptHandle,
    ledgers: BTreeMap<String, Arc<NodeStateLedger>>,
}

impl ComputationCycle {
    pub fn new(identity: CycleIdentity, graphs: Vec<DependencyGraph>, resources: CycleResources) -> Self {
        Self {
            identity,
            graphs,
            resources,
            state: CycleState::AwaitingExecution,
            interrupt: InterruptHandle::new(),
            ledgers: BTreeMap::new(),
        }
    }

    pub fn with_interrupt(mut self, interrupt: InterruptHandle) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn identity(&self) -> &CycleIdentity { &self.identity }
    pub fn state(&self) -> CycleState { self.state }
    pub fn interrupt_handle(&self) -> &InterruptHandle { &self.interrupt }

    /// Node states recorded for `configuration` during execution.
    pub fn ledger(&self, configuration: &str) -> Option<&NodeStateLedger> {
        self.ledgers.get(configuration).map(Arc::as_ref)
    }

    /// Runs every configuration's graph, each on its own driving thread.
    ///
    /// A cycle executes at most once.
    pub fn execute(&mut self, live_data: &dyn LiveDataSnapshot) -> Result<CycleResult, CycleError> {
        if self.state != CycleState::AwaitingExecution {
            return Err(CycleError::AlreadyExecuted(self.identity.cycle_id.clone()));
        }
        self.state = CycleState::Executing;
        info!(
            cycle = %self.identity.cycle_id,
            view = %self.identity.view,
            valuation_time = %self.identity.valuation_time,
            configurations = self.graphs.len(),
            "starting computation cycle"
        );

        // Compile up front on this thread so jobs find the repository cached.
        if let Err(e) = self.resources.functions.compile_interruptible(self.identity.valuation_time, &self.interrupt) {
            self.state = CycleState::ExecutionInterrupted;
            return Err(e.into());
        }

        let caches: Vec<Arc<ComputationCache>> = self
            .graphs
            .iter()
            .map(|graph| {
                let identity = CacheIdentity::new(self.identity.view.clone(), graph.calculation_configuration());
                let cache = self.resources.caches.get_cache(&identity, self.identity.iteration_timestamp);
                prepare_live_data(graph, &cache, live_data);
                cache
            })
            .collect();

        self.ledgers = self
            .graphs
            .iter()
            .map(|graph| (graph.calculation_configuration().to_string(), Arc::new(NodeStateLedger::new())))
            .collect();

        let job_ids = Arc::new(JobIdSource::new());
        let outcomes: Vec<Result<ExecutionReport, CycleError>> = thread::scope(|scope| {
            let handles: Vec<_> = self
                .graphs
                .iter()
                .map(|graph| {
                    let configuration = graph.calculation_configuration().to_string();
                    let oracle = Arc::clone(&self.ledgers[&configuration]);
                    let executor = DependencyGraphExecutor::new(
                        graph,
                        self.identity.clone(),
                        Arc::clone(&self.resources.dispatcher),
                        oracle,
                    )
                    .with_poll_interval(self.resources.poll_interval)
                    .with_interrupt(self.interrupt.clone())
                    .with_job_ids(Arc::clone(&job_ids));
                    (configuration, scope.spawn(move || executor.execute()))
                })
                .collect();

            handles
                .into_iter()
                .map(|(configuration, handle)| match handle.join() {
                    Ok(outcome) => outcome.map_err(CycleError::from),
                    Err(_) => Err(CycleError::DriverPanicked(configuration)),
                })
                .collect()
        });

        let mut result = CycleResult { identity: self.identity.clone(), configurations: BTreeMap::new() };
        for ((graph, cache), outcome) in self.graphs.iter().zip(&caches).zip(outcomes) {
            let report = match outcome {
                Ok(report) => report,
                Err(e) => {
                    warn!(cycle = %self.identity.cycle_id, configuration = graph.calculation_configuration(), error = %e, "cycle aborted");
                    self.state = CycleState::ExecutionInterrupted;
                    return Err(e);
                }
            };
            let values = graph.terminal_outputs().iter().map(|spec| (spec.clone(), cache.get(spec))).collect();
            result.configurations.insert(
                graph.calculation_configuration().to_string(),
                ConfigurationResult {
                    values,
                    failed_targets: report.failed_targets(graph),
                    statistics: report.statistics,
                },
            );
        }

        self.state = CycleState::Executed;
        info!(cycle = %self.identity.cycle_id, "computation cycle executed");
        Ok(result)
    }

    /// Frees every computation cache of this cycle. Returns how many were released.
    pub fn release(&self) -> usize {
        self.resources.caches.release_caches(&self.identity.view, self.identity.iteration_timestamp)
    }
}

/// Copies every live-data node output from the snapshot into the cache.
fn prepare_live_data(graph: &DependencyGraph, cache: &ComputationCache, live_data: &dyn LiveDataSnapshot) {
    let mut missing = 0usize;
    let live_nodes = graph.node_ids().map(|id| &graph[id]).filter(|n| n.kind() == FunctionKind::LiveDataSourcing);
    for node in live_nodes {
        for spec in &node.output_values {
            let value = live_data.query(spec).unwrap_or_else(|| {
                missing += 1;
                Value::Missing(MissingValue::MissingLiveData)
            });
            cache.put(ComputedValue::new(spec.clone(), value));
        }
    }
    if missing > 0 {
        warn!(configuration = graph.calculation_configuration(), missing, "live data unavailable for some inputs");
    }
}
