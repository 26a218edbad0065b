//! Process-level owner of the function registry.
//!
//! Callers hold a `FunctionService` instead of reaching for global state. It
//! pairs the current registry with its initialization generation so that a
//! reinitialization invalidates every earlier compilation.

use super::definition::{CompilationContext, FunctionParameters};
use super::registry::FunctionRegistry;
use super::repository::CompiledRepository;
use crate::compile::{CachingFunctionCompiler, CompilationError};
use crate::config::{ConfigError, EngineConfig};
use crate::interrupt::InterruptHandle;
use crate::temporal::Instant;
use parking_lot::RwLock;
use rayon::ThreadPool;
use std::sync::Arc;
use tracing::info;

struct Initialization {
    registry: Arc<FunctionRegistry>,
    generation: u64,
}

pub struct FunctionService {
    current: RwLock<Initialization>,
    compiler: CachingFunctionCompiler,
    pool: Arc<ThreadPool>,
    parameters: FunctionParameters,
}

impl FunctionService {
    pub fn new(registry: FunctionRegistry, pool: Arc<ThreadPool>, cache_capacity: usize) -> Self {
        Self {
            current: RwLock::new(Initialization { registry: Arc::new(registry), generation: 1 }),
            compiler: CachingFunctionCompiler::new(cache_capacity),
            pool,
            parameters: FunctionParameters::new(),
        }
    }

    /// Builds the worker pool and compiler the configuration describes.
    pub fn from_config(config: &EngineConfig, registry: FunctionRegistry) -> Result<Self, ConfigError> {
        config.validate()?;
        let pool = Arc::new(config.build_worker_pool()?);
        Ok(Self::new(registry, pool, config.compilation_cache_capacity)
            .with_parameters(config.function_parameters.clone()))
    }

    pub fn with_parameters(mut self, parameters: FunctionParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn registry(&self) -> Arc<FunctionRegistry> { Arc::clone(&self.current.read().registry) }
    pub fn generation(&self) -> u64 { self.current.read().generation }
    pub fn compiler(&self) -> &CachingFunctionCompiler { &self.compiler }
    pub fn pool(&self) -> &Arc<ThreadPool> { &self.pool }

    pub fn compile(&self, at: Instant) -> Result<Arc<CompiledRepository>, CompilationError> {
        self.compile_interruptible(at, &InterruptHandle::new())
    }

    /// Like [`FunctionService::compile`], abandoning the wait once `interrupt` is raised.
    pub fn compile_interruptible(
        &self,
        at: Instant,
        interrupt: &InterruptHandle,
    ) -> Result<Arc<CompiledRepository>, CompilationError> {
        let (registry, generation) = {
            let current = self.current.read();
            (Arc::clone(&current.registry), current.generation)
        };
        let context = CompilationContext::new(generation)
            .with_parameters(self.parameters.clone())
            .with_interrupt(interrupt.clone());
        self.compiler.compile(&registry, &context, &self.pool, at)
    }

    /// Swaps in a new registry. The next compile flushes every cached repository.
    pub fn reinitialize(&self, registry: FunctionRegistry) {
        let mut current = self.current.write();
        current.generation += 1;
        current.registry = Arc::new(registry);
        info!(generation = current.generation, functions = current.registry.len(), "function registry reinitialized");
    }
}
