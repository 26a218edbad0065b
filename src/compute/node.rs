//! A calculation node that executes jobs in the current process.

use super::job::{InvocationOutcome, Job, JobItem, JobResult, JobResultItem};
use crate::cache::{ComputationCache, ComputationCacheSource};
use crate::config::EngineConfig;
use crate::function::{CompiledRepository, FunctionInputs, FunctionKind, FunctionService};
use crate::value::{ComputedValue, MissingValue, Value};
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct LocalCalculationNode {
    name: String,
    functions: Arc<FunctionService>,
    caches: Arc<ComputationCacheSource>,
}

impl LocalCalculationNode {
    pub fn new(name: impl Into<String>, functions: Arc<FunctionService>, caches: Arc<ComputationCacheSource>) -> Self {
        Self { name: name.into(), functions, caches }
    }

    /// A node named after the configured `node_name`.
    pub fn from_config(
        config: &EngineConfig,
        functions: Arc<FunctionService>,
        caches: Arc<ComputationCacheSource>,
    ) -> Self {
        Self::new(config.node_name.clone(), functions, caches)
    }

    pub fn name(&self) -> &str { &self.name }

    /// Runs every item of `job` against the cycle's computation cache.
    ///
    /// Never panics: a panicking function is reported as a failed item.
    pub fn execute_job(&self, job: &Job) -> JobResult {
        let started = std::time::Instant::now();
        let cache = self.caches.get_cache(&job.spec.cache_identity(), job.spec.cycle.iteration_timestamp);

        let items = match self.functions.compile(job.spec.cycle.valuation_time) {
            Ok(repository) => job.items.iter().map(|item| self.execute_item(item, &repository, &cache)).collect(),
            Err(e) => {
                warn!(job = %job.spec.job_id, error = %e, "no compiled functions for job, failing every item");
                job.items
                    .iter()
                    .map(|item| {
                        publish_not_calculated(item, &cache);
                        JobResultItem {
                            target: item.target.clone(),
                            outcome: InvocationOutcome::FunctionFailed { message: e.to_string() },
                        }
                    })
                    .collect()
            }
        };

        JobResult { spec: job.spec.clone(), items, compute_node: self.name.clone(), duration: started.elapsed() }
    }

    fn execute_item(&self, item: &JobItem, repository: &CompiledRepository, cache: &ComputationCache) -> JobResultItem {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| invoke(item, repository, cache))).unwrap_or_else(|_| {
            InvocationOutcome::FunctionFailed { message: format!("function '{}' panicked", item.function.id) }
        });

        if !outcome.is_success() {
            debug!(function = %item.function.id, target = %item.target, outcome = %outcome, "item failed");
            publish_not_calculated(item, cache);
        }
        JobResultItem { target: item.target.clone(), outcome }
    }
}

fn invoke(item: &JobItem, repository: &CompiledRepository, cache: &ComputationCache) -> InvocationOutcome {
    match item.function.kind {
        // Live data is placed in the cache before the graph runs.
        FunctionKind::LiveDataSourcing | FunctionKind::NoOp => InvocationOutcome::Success,
        FunctionKind::Relabelling => {
            let source = item.inputs.first().and_then(|spec| cache.get(spec)).filter(|v| !v.is_missing());
            match source {
                Some(value) => {
                    for output in &item.desired_outputs {
                        cache.put(ComputedValue::new(output.clone(), value.clone()));
                    }
                    InvocationOutcome::Success
                }
                None => InvocationOutcome::MissingInputs { missing: item.inputs.to_vec() },
            }
        }
        FunctionKind::TargetSourcing => {
            for output in &item.desired_outputs {
                cache.put(ComputedValue::new(output.clone(), Value::Text(item.target.id.clone())));
            }
            InvocationOutcome::Success
        }
        FunctionKind::Ordinary => invoke_ordinary(item, repository, cache),
    }
}

fn invoke_ordinary(item: &JobItem, repository: &CompiledRepository, cache: &ComputationCache) -> InvocationOutcome {
    let Some(function) = repository.get(&item.function.id) else {
        return InvocationOutcome::FunctionFailed {
            message: format!("function '{}' is not compiled at {}", item.function.id, repository.compiled_at()),
        };
    };
    if !function.can_apply_to(&item.target) {
        return InvocationOutcome::FunctionFailed {
            message: format!("function '{}' does not apply to {}", item.function.id, item.target),
        };
    }

    // --- Gather Inputs ---
    let mut inputs = Vec::with_capacity(item.inputs.len());
    let mut missing = Vec::new();
    for spec in &item.inputs {
        match cache.get(spec) {
            Some(value) if !value.is_missing() => inputs.push(ComputedValue::new(spec.clone(), value)),
            _ => missing.push(spec.clone()),
        }
    }
    if !missing.is_empty() {
        return InvocationOutcome::MissingInputs { missing };
    }

    // --- Invoke ---
    let inputs = FunctionInputs::new(inputs).with_parameters(item.function.parameters.clone());
    let produced = match function.execute(&inputs, &item.target, &item.desired_outputs) {
        Ok(values) => values,
        Err(e) => return InvocationOutcome::FunctionFailed { message: e.to_string() },
    };

    let produced_specs: HashSet<_> = produced.iter().map(|v| v.spec.clone()).collect();
    cache.put_all(produced);

    let missing: Vec<_> = item.desired_outputs.iter().filter(|spec| !produced_specs.contains(*spec)).cloned().collect();
    if missing.is_empty() {
        InvocationOutcome::Success
    } else {
        InvocationOutcome::MissingOutputs { missing }
    }
}

/// Marks every desired output the item did not produce.
fn publish_not_calculated(item: &JobItem, cache: &ComputationCache) {
    for spec in &item.desired_outputs {
        if !cache.contains(spec) {
            cache.put(ComputedValue::new(spec.clone(), Value::Missing(MissingValue::NotCalculated)));
        }
    }
}
