//! Shared test doubles: scriptable functions, graph builders and a dispatcher
//! that records what the executor asked of it.

use crate::compute::{InvocationOutcome, Job, JobDispatcher, JobResult, JobResultItem, ResultReceiver};
use crate::function::{
    CompilationContext, CompiledFunction, FunctionDefinition, FunctionError, FunctionId, FunctionInputs, FunctionKind,
    FunctionParameters,
};
use crate::graph::{DependencyGraph, DependencyNode, NodeId, ParameterizedFunction};
use crate::temporal::{Instant, ValidityWindow};
use crate::value::{ComputationTarget, ComputedValue, Value, ValueProperties, ValueRequirement, ValueSpecification};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// A value named `name` on a shared primitive target.
pub fn spec(name: &str) -> ValueSpecification {
    ValueSpecification::new(name, ComputationTarget::primitive("test"), ValueProperties::new())
}

/// True when both handles point at the same compiled instance.
pub fn same_instance(a: &Arc<dyn CompiledFunction>, b: &Arc<dyn CompiledFunction>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

// --- Functions ---

#[derive(Clone)]
enum OnCompile {
    Succeed,
    Fail,
    Panic,
    RequireParameter(String),
}

#[derive(Clone)]
enum OnInvoke {
    /// Adds up scalar inputs and publishes the sum as every desired output.
    Sum,
    Fail,
    Panic,
    ProduceNothing,
    /// Publishes the named node parameter as text.
    EchoParameter(String),
}

#[derive(Clone)]
pub struct TestFunction {
    id: FunctionId,
    window: fn(Instant) -> ValidityWindow,
    compile_delay: Duration,
    on_compile: OnCompile,
    on_invoke: OnInvoke,
    defaults: FunctionParameters,
    compiles: Arc<AtomicUsize>,
    invocations: Arc<AtomicUsize>,
}

impl TestFunction {
    /// Valid forever, sums its inputs.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.into(),
            window: |_| ValidityWindow::UNBOUNDED,
            compile_delay: Duration::ZERO,
            on_compile: OnCompile::Succeed,
            on_invoke: OnInvoke::Sum,
            defaults: FunctionParameters::new(),
            compiles: Arc::new(AtomicUsize::new(0)),
            invocations: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Window of the instance compiled for a given instant.
    pub fn with_window(mut self, window: fn(Instant) -> ValidityWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_compile_delay(mut self, delay: Duration) -> Self {
        self.compile_delay = delay;
        self
    }

    pub fn failing_compile(mut self) -> Self {
        self.on_compile = OnCompile::Fail;
        self
    }

    pub fn panicking_compile(mut self) -> Self {
        self.on_compile = OnCompile::Panic;
        self
    }

    pub fn requiring_parameter(mut self, name: &str) -> Self {
        self.on_compile = OnCompile::RequireParameter(name.to_string());
        self
    }

    pub fn with_default_parameter(mut self, name: &str, value: &str) -> Self {
        self.defaults.insert(name.to_string(), value.to_string());
        self
    }

    pub fn echoing_parameter(mut self, name: &str) -> Self {
        self.on_invoke = OnInvoke::EchoParameter(name.to_string());
        self
    }

    pub fn failing_invoke(mut self) -> Self {
        self.on_invoke = OnInvoke::Fail;
        self
    }

    pub fn panicking_invoke(mut self) -> Self {
        self.on_invoke = OnInvoke::Panic;
        self
    }

    pub fn producing_nothing(mut self) -> Self {
        self.on_invoke = OnInvoke::ProduceNothing;
        self
    }

    pub fn compile_counter(&self) -> Arc<AtomicUsize> { Arc::clone(&self.compiles) }
    pub fn invoke_counter(&self) -> Arc<AtomicUsize> { Arc::clone(&self.invocations) }

    fn compile_error(&self, reason: &str) -> FunctionError {
        FunctionError::Compilation { function: self.id.clone(), reason: reason.to_string() }
    }
}

impl FunctionDefinition for TestFunction {
    fn unique_id(&self) -> &FunctionId { &self.id }

    fn short_name(&self) -> &str { self.id.as_str() }

    fn default_parameters(&self) -> FunctionParameters { self.defaults.clone() }

    fn compile(&self, context: &CompilationContext, at: Instant) -> Result<Arc<dyn CompiledFunction>, FunctionError> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        if !self.compile_delay.is_zero() {
            thread::sleep(self.compile_delay);
        }
        match &self.on_compile {
            OnCompile::Succeed => {}
            OnCompile::Fail => return Err(self.compile_error("scripted failure")),
            OnCompile::Panic => panic!("scripted compile panic in {}", self.id),
            OnCompile::RequireParameter(name) => {
                if context.parameter(name).is_none() {
                    return Err(self.compile_error(&format!("parameter '{}' not set", name)));
                }
            }
        }
        Ok(Arc::new(TestCompiled {
            id: self.id.clone(),
            window: (self.window)(at),
            on_invoke: self.on_invoke.clone(),
            invocations: Arc::clone(&self.invocations),
        }))
    }
}

struct TestCompiled {
    id: FunctionId,
    window: ValidityWindow,
    on_invoke: OnInvoke,
    invocations: Arc<AtomicUsize>,
}

impl CompiledFunction for TestCompiled {
    fn function_id(&self) -> &FunctionId { &self.id }

    fn validity(&self) -> ValidityWindow { self.window }

    fn can_apply_to(&self, _: &ComputationTarget) -> bool { true }

    fn results(&self, target: &ComputationTarget) -> Vec<ValueSpecification> {
        vec![ValueSpecification::new("Value", target.clone(), ValueProperties::new())]
    }

    fn requirements(&self, _: &ComputationTarget, _: &ValueSpecification) -> Vec<ValueRequirement> { Vec::new() }

    fn execute(
        &self,
        inputs: &FunctionInputs,
        _: &ComputationTarget,
        desired: &[ValueSpecification],
    ) -> Result<Vec<ComputedValue>, FunctionError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        match &self.on_invoke {
            OnInvoke::Sum => {
                let total: f64 = inputs.iter().filter_map(|v| v.value.as_scalar()).sum();
                Ok(desired.iter().map(|spec| ComputedValue::new(spec.clone(), Value::Scalar(total))).collect())
            }
            OnInvoke::Fail => {
                Err(FunctionError::Invocation { function: self.id.clone(), reason: "scripted failure".into() })
            }
            OnInvoke::Panic => panic!("scripted invoke panic in {}", self.id),
            OnInvoke::ProduceNothing => Ok(Vec::new()),
            OnInvoke::EchoParameter(name) => {
                let value = inputs.parameter(name).ok_or_else(|| FunctionError::Invocation {
                    function: self.id.clone(),
                    reason: format!("parameter '{}' not set", name),
                })?;
                Ok(desired.iter().map(|spec| ComputedValue::new(spec.clone(), Value::Text(value.to_string()))).collect())
            }
        }
    }
}

// --- Graphs ---

/// The single output of the fixture node labelled `label`.
pub fn output_of(label: &str) -> ValueSpecification {
    ValueSpecification::new("Value", ComputationTarget::security(label), ValueProperties::new())
}

pub struct GraphFixture {
    pub graph: DependencyGraph,
    ids: HashMap<String, NodeId>,
}

impl GraphFixture {
    pub fn id(&self, label: &str) -> NodeId { self.ids[label] }

    pub fn ids(&self, labels: &[&str]) -> HashSet<NodeId> { labels.iter().map(|l| self.id(l)).collect() }

    /// Labels of the nodes feeding `label`.
    pub fn inputs_of(&self, label: &str) -> Vec<String> {
        self.graph.inputs(self.id(label)).map(|id| self.graph[id].target.id.clone()).collect()
    }
}

/// Ordinary nodes running function `calc`, one per label, wired by `(input, dependent)` edges.
pub fn graph_of(labels: &[&str], edges: &[(&str, &str)]) -> GraphFixture {
    let nodes: Vec<_> = labels.iter().map(|l| (*l, "calc", FunctionKind::Ordinary)).collect();
    graph_of_kinds(&nodes, edges)
}

/// Nodes given as `(label, function, kind)` in configuration `Default`.
pub fn graph_of_kinds(nodes: &[(&str, &str, FunctionKind)], edges: &[(&str, &str)]) -> GraphFixture {
    graph_in("Default", nodes, edges)
}

/// Each node outputs `output_of(label)` and consumes the outputs of its inputs.
/// Every output is terminal.
pub fn graph_in(configuration: &str, nodes: &[(&str, &str, FunctionKind)], edges: &[(&str, &str)]) -> GraphFixture {
    let mut graph = DependencyGraph::new(configuration);
    let mut ids = HashMap::new();
    for (label, function, kind) in nodes {
        let mut node = DependencyNode::new(ParameterizedFunction::new(*function, *kind), ComputationTarget::security(*label))
            .with_output(output_of(label));
        for (input, _) in edges.iter().filter(|(_, dependent)| dependent == label) {
            node = node.with_input(output_of(input));
        }
        ids.insert(label.to_string(), graph.add_node(node));
    }
    for (input, dependent) in edges {
        graph.add_dependency(ids[*input], ids[*dependent]).unwrap();
    }
    for label in nodes.iter().map(|(label, ..)| label) {
        graph.add_terminal_output(output_of(label));
    }
    GraphFixture { graph, ids }
}

// --- Dispatch ---

/// A meeting point for `parties` threads, giving up after a timeout.
pub struct Rendezvous {
    parties: usize,
    arrived: Mutex<usize>,
    all_here: Condvar,
}

impl Rendezvous {
    pub fn new(parties: usize) -> Self {
        Self { parties, arrived: Mutex::new(0), all_here: Condvar::new() }
    }

    /// True if every party arrived before `timeout` ran out.
    pub fn arrive_and_wait(&self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        let mut arrived = self.arrived.lock();
        *arrived += 1;
        if *arrived >= self.parties {
            self.all_here.notify_all();
            return true;
        }
        while *arrived < self.parties {
            if self.all_here.wait_until(&mut arrived, deadline).timed_out() {
                return *arrived >= self.parties;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Dispatched(String),
    Completed(String),
}

/// Completes each job on its own thread after a delay, logging dispatch and
/// completion by target label. Targets listed as failing report a failed item.
pub struct RecordingDispatcher {
    events: Arc<Mutex<Vec<Event>>>,
    failing: HashSet<String>,
    rendezvous: Option<(HashSet<String>, Arc<Rendezvous>)>,
    delay: Duration,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            failing: HashSet::new(),
            rendezvous: None,
            delay: Duration::from_millis(2),
        }
    }

    pub fn failing(mut self, labels: &[&str]) -> Self {
        self.failing = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Jobs for `labels` only complete once all of them are running at the same time.
    pub fn with_rendezvous(mut self, labels: &[&str]) -> Self {
        let members = labels.iter().map(|l| l.to_string()).collect();
        self.rendezvous = Some((members, Arc::new(Rendezvous::new(labels.len()))));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn events(&self) -> Vec<Event> { self.events.lock().clone() }

    pub fn dispatched(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Dispatched(label) => Some(label),
                Event::Completed(_) => None,
            })
            .collect()
    }

    fn position(&self, event: &Event) -> Option<usize> { self.events.lock().iter().position(|e| e == event) }

    /// True if every input of `label` completed before `label` was dispatched.
    pub fn dispatched_after_inputs(&self, fixture: &GraphFixture, label: &str) -> bool {
        let Some(dispatched) = self.position(&Event::Dispatched(label.to_string())) else {
            return false;
        };
        fixture
            .inputs_of(label)
            .into_iter()
            .all(|input| self.position(&Event::Completed(input)).is_some_and(|done| done < dispatched))
    }
}

impl JobDispatcher for RecordingDispatcher {
    fn submit(&self, job: Job, receiver: Arc<dyn ResultReceiver>) {
        let target = job.items[0].target.clone();
        self.events.lock().push(Event::Dispatched(target.id.clone()));

        let events = Arc::clone(&self.events);
        let fails = self.failing.contains(&target.id);
        let rendezvous = self
            .rendezvous
            .as_ref()
            .filter(|(members, _)| members.contains(&target.id))
            .map(|(_, meeting)| Arc::clone(meeting));
        let delay = self.delay;

        thread::spawn(move || {
            thread::sleep(delay);
            let met = rendezvous.map_or(true, |meeting| meeting.arrive_and_wait(Duration::from_secs(5)));
            let outcome = if fails || !met {
                InvocationOutcome::FunctionFailed { message: "scripted failure".into() }
            } else {
                InvocationOutcome::Success
            };
            events.lock().push(Event::Completed(target.id.clone()));
            receiver.result_received(JobResult {
                spec: job.spec,
                items: vec![JobResultItem { target, outcome }],
                compute_node: "recording".into(),
                duration: delay,
            });
        });
    }
}
