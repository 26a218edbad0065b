//! compiler.rs
//! Time-bounded function compilation cache.
//!
//! Compiled repositories are cached per (registry, instant). A request for a new
//! instant is first answered from the nearest cached neighbours if their windows
//! reach it; otherwise a fresh repository is built, salvaging individual compiled
//! functions from those neighbours and compiling the rest on the worker pool.

use super::error::CompilationError;
use crate::function::{
    CompilationContext, CompiledFunction, CompiledRepository, FunctionError, FunctionId, FunctionRegistry, RegistryId,
};
use crate::temporal::Instant;
use parking_lot::{Condvar, Mutex};
use rayon::ThreadPool;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How often a caller blocked on the worker pool re-checks its interrupt flag.
const INTERRUPT_POLL: Duration = Duration::from_millis(25);

/// Cache key. Ordered by registry, then instant, so that the entries of one
/// registry form a contiguous run sorted by time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompilationCacheKey {
    pub registry: RegistryId,
    pub instant: Instant,
}

impl fmt::Display for CompilationCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.registry, self.instant)
    }
}

type Outcome = Result<Arc<CompiledRepository>, CompilationError>;

/// A compilation in progress that other callers for the same key wait on.
struct InFlight {
    generation: u64,
    outcome: Mutex<Option<Outcome>>,
    ready: Condvar,
}

impl InFlight {
    fn new(generation: u64) -> Self {
        Self { generation, outcome: Mutex::new(None), ready: Condvar::new() }
    }

    fn publish(&self, outcome: Outcome) {
        *self.outcome.lock() = Some(outcome);
        self.ready.notify_all();
    }

    fn wait(&self) -> Outcome {
        let mut slot = self.outcome.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            self.ready.wait(&mut slot);
        }
    }
}

#[derive(Default)]
struct CacheState {
    generation: Option<u64>,
    index: BTreeMap<CompilationCacheKey, Arc<CompiledRepository>>,
    /// Insertion order of cached keys; the front is evicted first.
    active: VecDeque<CompilationCacheKey>,
    in_flight: HashMap<CompilationCacheKey, Arc<InFlight>>,
}

impl CacheState {
    fn adopt_generation(&mut self, generation: u64) {
        if self.generation == Some(generation) {
            return;
        }
        if !self.index.is_empty() {
            info!(
                previous = ?self.generation,
                current = generation,
                dropped = self.index.len(),
                "function initialization changed, flushing compilation cache"
            );
        }
        self.index.clear();
        self.active.clear();
        self.generation = Some(generation);
    }

    /// Nearest entry for the same registry at or before `key.instant`.
    fn previous(&self, key: &CompilationCacheKey) -> Option<Arc<CompiledRepository>> {
        self.index
            .range(..=*key)
            .next_back()
            .filter(|(k, _)| k.registry == key.registry)
            .map(|(_, repo)| Arc::clone(repo))
    }

    /// Nearest entry for the same registry at or after `key.instant`.
    fn next(&self, key: &CompilationCacheKey) -> Option<Arc<CompiledRepository>> {
        self.index
            .range(*key..)
            .next()
            .filter(|(k, _)| k.registry == key.registry)
            .map(|(_, repo)| Arc::clone(repo))
    }

    /// Caches `repository` unless the generation it was compiled under has since been flushed.
    fn insert_if_current(
        &mut self,
        key: CompilationCacheKey,
        generation: u64,
        repository: &Arc<CompiledRepository>,
        capacity: usize,
    ) {
        if self.generation == Some(generation) {
            self.insert(key, Arc::clone(repository), capacity);
        }
    }

    fn insert(&mut self, key: CompilationCacheKey, repository: Arc<CompiledRepository>, capacity: usize) {
        if let Some(slot) = self.index.get_mut(&key) {
            *slot = repository;
            return;
        }
        while self.active.len() >= capacity {
            match self.active.pop_front() {
                Some(oldest) => {
                    self.index.remove(&oldest);
                    debug!(evicted = %oldest, "compilation cache at capacity");
                }
                None => break,
            }
        }
        self.index.insert(key, repository);
        self.active.push_back(key);
    }
}

enum Lookup {
    Hit(Arc<CompiledRepository>),
    Wait {
        flight: Arc<InFlight>,
        previous: Option<Arc<CompiledRepository>>,
        next: Option<Arc<CompiledRepository>>,
    },
    Compile {
        flight: Arc<InFlight>,
        previous: Option<Arc<CompiledRepository>>,
        next: Option<Arc<CompiledRepository>>,
    },
}

/// Compiles registries into instant-valid repositories, memoizing across
/// instants and deduplicating concurrent requests for the same key.
pub struct CachingFunctionCompiler {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl CachingFunctionCompiler {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), state: Mutex::new(CacheState::default()) }
    }

    pub fn capacity(&self) -> usize { self.capacity }

    /// Number of cached repositories.
    pub fn len(&self) -> usize { self.state.lock().index.len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn is_cached(&self, registry: RegistryId, instant: Instant) -> bool {
        self.state.lock().index.contains_key(&CompilationCacheKey { registry, instant })
    }

    pub fn invalidate_all(&self) {
        let mut state = self.state.lock();
        state.index.clear();
        state.active.clear();
    }

    /// Returns a repository in which every function is valid at `at`.
    ///
    /// At most one compilation per (registry, instant) runs at a time; other
    /// callers for the same key block until it publishes and share its result.
    pub fn compile(
        &self,
        registry: &FunctionRegistry,
        context: &CompilationContext,
        pool: &ThreadPool,
        at: Instant,
    ) -> Result<Arc<CompiledRepository>, CompilationError> {
        let key = CompilationCacheKey { registry: registry.id(), instant: at };

        match self.lookup(key, context.generation()) {
            Lookup::Hit(repository) => Ok(repository),
            Lookup::Wait { flight, previous, next } => {
                if pool.current_thread_index().is_some() {
                    // The owner's jobs may be queued behind this worker.
                    debug!(key = %key, "compilation in flight elsewhere, compiling inline on pool worker");
                    let outcome = self
                        .compile_fresh(registry, context, pool, at, previous.as_deref(), next.as_deref())
                        .map(Arc::new);
                    if let Ok(repository) = &outcome {
                        self.state.lock().insert_if_current(key, flight.generation, repository, self.capacity);
                    }
                    return outcome;
                }
                debug!(key = %key, "waiting on in-flight compilation");
                flight.wait().map_err(|e| CompilationError::ConcurrentCompilationFailure {
                    registry: key.registry,
                    instant: at,
                    reason: e.to_string(),
                })
            }
            Lookup::Compile { flight, previous, next } => {
                let outcome = self
                    .compile_fresh(registry, context, pool, at, previous.as_deref(), next.as_deref())
                    .map(Arc::new);
                {
                    let mut state = self.state.lock();
                    // A caller on a newer generation may have replaced this flight.
                    if state.in_flight.get(&key).is_some_and(|current| Arc::ptr_eq(current, &flight)) {
                        state.in_flight.remove(&key);
                    }
                    if let Ok(repository) = &outcome {
                        state.insert_if_current(key, flight.generation, repository, self.capacity);
                    }
                }
                flight.publish(outcome.clone());
                outcome
            }
        }
    }

    fn lookup(&self, key: CompilationCacheKey, generation: u64) -> Lookup {
        let mut state = self.state.lock();
        state.adopt_generation(generation);

        let previous = state.previous(&key);
        let next = state.next(&key);

        if let Some(repository) = &previous {
            let window = repository.validity();
            if window.is_unbounded_forward() || window.covers(key.instant) {
                debug!(key = %key, from = %repository.compiled_at(), "reusing earlier compilation");
                return Lookup::Hit(Arc::clone(repository));
            }
        }
        if let Some(repository) = &next {
            let window = repository.validity();
            if window.is_unbounded_backward() || window.covers(key.instant) {
                debug!(key = %key, from = %repository.compiled_at(), "reusing later compilation");
                return Lookup::Hit(Arc::clone(repository));
            }
        }
        if let Some(repository) = state.index.get(&key) {
            return Lookup::Hit(Arc::clone(repository));
        }

        // Only a compilation under the caller's own generation can be joined.
        if let Some(flight) = state.in_flight.get(&key).filter(|f| f.generation == generation) {
            return Lookup::Wait { flight: Arc::clone(flight), previous, next };
        }
        let flight = Arc::new(InFlight::new(generation));
        state.in_flight.insert(key, Arc::clone(&flight));
        Lookup::Compile { flight, previous, next }
    }

    fn compile_fresh(
        &self,
        registry: &FunctionRegistry,
        context: &CompilationContext,
        pool: &ThreadPool,
        at: Instant,
        previous: Option<&CompiledRepository>,
        next: Option<&CompiledRepository>,
    ) -> Result<CompiledRepository, CompilationError> {
        let mut repository = CompiledRepository::new(at);
        let (tx, rx) = mpsc::channel::<(FunctionId, Result<Arc<dyn CompiledFunction>, FunctionError>)>();
        let mut salvaged = 0usize;
        let mut outstanding = 0usize;
        // A worker of `pool` blocking on jobs queued behind it could starve the pool.
        let inline = pool.current_thread_index().is_some();

        // 1. Salvage what neighbours already hold; queue the rest.
        for function in registry.functions() {
            if let Some(compiled) = salvage(function.unique_id(), at, previous, next) {
                repository.insert(compiled);
                salvaged += 1;
                continue;
            }

            let context = context.clone().with_defaults(function.default_parameters());
            let function = Arc::clone(function);
            let tx = tx.clone();
            let job = move || {
                let id = function.unique_id().clone();
                let result = panic::catch_unwind(AssertUnwindSafe(|| function.compile(&context, at)))
                    .unwrap_or_else(|_| {
                        Err(FunctionError::Compilation { function: id.clone(), reason: "panicked".into() })
                    });
                // The receiver is gone only if the caller was interrupted.
                let _ = tx.send((id, result));
            };
            if inline {
                job();
            } else {
                pool.spawn(job);
            }
            outstanding += 1;
        }
        drop(tx);

        // 2. Collect. Individual failures are omitted, never fatal.
        let submitted = outstanding;
        let mut omitted = 0usize;
        while outstanding > 0 {
            match rx.recv_timeout(INTERRUPT_POLL) {
                Ok((id, Ok(compiled))) => {
                    outstanding -= 1;
                    if !compiled.validity().covers(at) {
                        warn!(function = %id, instant = %at, window = %compiled.validity(), "compiled window excludes requested instant, omitting");
                        omitted += 1;
                        continue;
                    }
                    check_window_drift(&id, compiled.as_ref(), previous, next);
                    repository.insert(compiled);
                }
                Ok((id, Err(e))) => {
                    outstanding -= 1;
                    omitted += 1;
                    warn!(function = %id, instant = %at, error = %e, "function compilation failed, omitting");
                }
                Err(RecvTimeoutError::Timeout) => {
                    if context.interrupt().is_interrupted() {
                        return Err(CompilationError::Interrupted { registry: registry.id(), instant: at, outstanding });
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(CompilationError::Interrupted { registry: registry.id(), instant: at, outstanding });
                }
            }
        }

        debug!(
            registry = %registry.id(),
            instant = %at,
            compiled = submitted - omitted,
            salvaged,
            omitted,
            window = %repository.validity(),
            "built compiled repository"
        );
        Ok(repository)
    }
}

/// A neighbour's compiled instance of `id`, if its own window reaches `at`.
fn salvage(
    id: &FunctionId,
    at: Instant,
    previous: Option<&CompiledRepository>,
    next: Option<&CompiledRepository>,
) -> Option<Arc<dyn CompiledFunction>> {
    [previous, next]
        .into_iter()
        .flatten()
        .filter_map(|repository| repository.get(id))
        .find(|compiled| compiled.validity().covers(at))
        .cloned()
}

/// Windows are only expected to change across generations. Two instances of one
/// function whose windows overlap but differ mean the function broke that rule.
fn check_window_drift(
    id: &FunctionId,
    fresh: &dyn CompiledFunction,
    previous: Option<&CompiledRepository>,
    next: Option<&CompiledRepository>,
) {
    let fresh_window = fresh.validity();
    for earlier in [previous, next].into_iter().flatten().filter_map(|r| r.get(id)) {
        let old_window = earlier.validity();
        if old_window != fresh_window && !old_window.intersect(&fresh_window).is_empty() {
            warn!(
                function = %id,
                cached = %old_window,
                fresh = %fresh_window,
                "validity window changed without an initialization change"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{same_instance, TestFunction};
    use crate::interrupt::InterruptHandle;
    use crate::temporal::ValidityWindow;
    use rayon::ThreadPoolBuilder;
    use std::sync::atomic::Ordering;
    use std::sync::Barrier;
    use std::thread;

    fn pool() -> ThreadPool {
        ThreadPoolBuilder::new().num_threads(4).build().unwrap()
    }

    fn registry_of(functions: Vec<TestFunction>) -> FunctionRegistry {
        let mut builder = FunctionRegistry::builder();
        for f in functions {
            builder.register(Arc::new(f)).unwrap();
        }
        builder.build()
    }

    fn zero_to_hundred(at: Instant) -> ValidityWindow {
        if at.0 <= 100 {
            ValidityWindow::between(Instant(0), Instant(100))
        } else {
            ValidityWindow::starting_at(Instant(101))
        }
    }

    fn exactly(at: Instant) -> ValidityWindow {
        ValidityWindow::between(at, at)
    }

    #[test]
    fn test_instants_inside_window_share_compiled_instances() {
        let f1 = TestFunction::new("F1").with_window(zero_to_hundred);
        let compiles = f1.compile_counter();
        let registry = registry_of(vec![f1]);
        let compiler = CachingFunctionCompiler::new(8);
        let ctx = CompilationContext::new(1);
        let pool = pool();

        let first = compiler.compile(&registry, &ctx, &pool, Instant(10)).unwrap();
        let second = compiler.compile(&registry, &ctx, &pool, Instant(60)).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(same_instance(first.get(&"F1".into()).unwrap(), second.get(&"F1".into()).unwrap()));
        assert_eq!(compiles.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_only_expired_functions_are_recompiled() {
        let f1 = TestFunction::new("F1").with_window(zero_to_hundred);
        let f2 = TestFunction::new("F2");
        let (f1_compiles, f2_compiles) = (f1.compile_counter(), f2.compile_counter());
        let registry = registry_of(vec![f1, f2]);
        let compiler = CachingFunctionCompiler::new(8);
        let ctx = CompilationContext::new(1);
        let pool = pool();

        let at_50 = compiler.compile(&registry, &ctx, &pool, Instant(50)).unwrap();
        let at_150 = compiler.compile(&registry, &ctx, &pool, Instant(150)).unwrap();

        assert!(!Arc::ptr_eq(&at_50, &at_150));
        assert!(same_instance(at_50.get(&"F2".into()).unwrap(), at_150.get(&"F2".into()).unwrap()));
        assert!(!same_instance(at_50.get(&"F1".into()).unwrap(), at_150.get(&"F1".into()).unwrap()));
        assert_eq!(f1_compiles.load(Ordering::SeqCst), 2);
        assert_eq!(f2_compiles.load(Ordering::SeqCst), 1);
        assert_eq!(at_150.validity(), ValidityWindow::starting_at(Instant(101)));
    }

    #[test]
    fn test_later_entry_answers_earlier_instant() {
        let f1 = TestFunction::new("F1").with_window(|_| ValidityWindow::between(Instant(100), Instant(200)));
        let compiles = f1.compile_counter();
        let registry = registry_of(vec![f1]);
        let compiler = CachingFunctionCompiler::new(8);
        let ctx = CompilationContext::new(1);
        let pool = pool();

        let at_150 = compiler.compile(&registry, &ctx, &pool, Instant(150)).unwrap();
        let at_120 = compiler.compile(&registry, &ctx, &pool, Instant(120)).unwrap();

        assert!(Arc::ptr_eq(&at_150, &at_120));
        assert_eq!(compiles.load(Ordering::SeqCst), 1);
        assert_eq!(compiler.len(), 1);
    }

    #[test]
    fn test_capacity_evicts_oldest_entry() {
        let registry = registry_of(vec![TestFunction::new("F1").with_window(exactly)]);
        let compiler = CachingFunctionCompiler::new(2);
        let ctx = CompilationContext::new(1);
        let pool = pool();

        for t in [1, 2, 3] {
            compiler.compile(&registry, &ctx, &pool, Instant(t)).unwrap();
            assert!(compiler.len() <= 2);
        }

        assert_eq!(compiler.len(), 2);
        assert!(!compiler.is_cached(registry.id(), Instant(1)));
        assert!(compiler.is_cached(registry.id(), Instant(2)));
        assert!(compiler.is_cached(registry.id(), Instant(3)));
    }

    #[test]
    fn test_concurrent_callers_share_one_compilation() {
        let f1 = TestFunction::new("F1").with_compile_delay(Duration::from_millis(100));
        let compiles = f1.compile_counter();
        let registry = Arc::new(registry_of(vec![f1]));
        let compiler = Arc::new(CachingFunctionCompiler::new(8));
        let pool = Arc::new(pool());
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let (registry, compiler, pool, barrier) =
                    (Arc::clone(&registry), Arc::clone(&compiler), Arc::clone(&pool), Arc::clone(&barrier));
                thread::spawn(move || {
                    barrier.wait();
                    compiler.compile(&registry, &CompilationContext::new(1), &pool, Instant(42)).unwrap()
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(compiles.load(Ordering::SeqCst), 1);
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_failed_and_panicking_functions_are_omitted() {
        let registry = registry_of(vec![
            TestFunction::new("good"),
            TestFunction::new("bad").failing_compile(),
            TestFunction::new("explodes").panicking_compile(),
        ]);
        let compiler = CachingFunctionCompiler::new(8);
        let repo = compiler.compile(&registry, &CompilationContext::new(1), &pool(), Instant(5)).unwrap();

        assert_eq!(repo.len(), 1);
        assert!(repo.contains(&"good".into()));
        assert!(!repo.contains(&"bad".into()));
    }

    #[test]
    fn test_window_excluding_instant_is_omitted() {
        let registry = registry_of(vec![
            TestFunction::new("stale").with_window(|_| ValidityWindow::ending_at(Instant(0))),
        ]);
        let compiler = CachingFunctionCompiler::new(8);
        let repo = compiler.compile(&registry, &CompilationContext::new(1), &pool(), Instant(5)).unwrap();
        assert!(repo.is_empty());
    }

    #[test]
    fn test_generation_change_flushes_cache() {
        let f1 = TestFunction::new("F1");
        let compiles = f1.compile_counter();
        let registry = registry_of(vec![f1]);
        let compiler = CachingFunctionCompiler::new(8);
        let pool = pool();

        compiler.compile(&registry, &CompilationContext::new(1), &pool, Instant(10)).unwrap();
        compiler.compile(&registry, &CompilationContext::new(1), &pool, Instant(20)).unwrap();
        assert_eq!(compiles.load(Ordering::SeqCst), 1);

        compiler.compile(&registry, &CompilationContext::new(2), &pool, Instant(20)).unwrap();
        assert_eq!(compiles.load(Ordering::SeqCst), 2);
        assert_eq!(compiler.len(), 1);
    }

    #[test]
    fn test_new_generation_does_not_join_stale_compilation() {
        let f1 = TestFunction::new("F1").with_compile_delay(Duration::from_millis(300));
        let compiles = f1.compile_counter();
        let registry = Arc::new(registry_of(vec![f1]));
        let compiler = Arc::new(CachingFunctionCompiler::new(8));
        let pool = Arc::new(pool());

        let stale = {
            let (registry, compiler, pool) = (Arc::clone(&registry), Arc::clone(&compiler), Arc::clone(&pool));
            thread::spawn(move || compiler.compile(&registry, &CompilationContext::new(1), &pool, Instant(7)))
        };
        thread::sleep(Duration::from_millis(50));

        let fresh = compiler.compile(&registry, &CompilationContext::new(2), &pool, Instant(7)).unwrap();
        let stale = stale.join().unwrap().unwrap();

        assert!(!Arc::ptr_eq(&stale, &fresh));
        assert_eq!(compiles.load(Ordering::SeqCst), 2);
        assert_eq!(compiler.len(), 1);
        let cached = compiler.compile(&registry, &CompilationContext::new(2), &pool, Instant(7)).unwrap();
        assert!(Arc::ptr_eq(&cached, &fresh));
    }

    #[test]
    fn test_pool_worker_compiles_inline_instead_of_waiting() {
        let f1 = TestFunction::new("F1");
        let compiles = f1.compile_counter();
        let registry = Arc::new(registry_of(vec![f1]));
        let compiler = Arc::new(CachingFunctionCompiler::new(8));
        let pool = Arc::new(ThreadPoolBuilder::new().num_threads(1).build().unwrap());
        let (tx, rx) = mpsc::channel();

        // Keeps the only worker busy until the owner below has queued its job behind it.
        {
            let (registry, compiler, worker_pool) = (Arc::clone(&registry), Arc::clone(&compiler), Arc::clone(&pool));
            pool.spawn(move || {
                thread::sleep(Duration::from_millis(100));
                let _ = tx.send(compiler.compile(&registry, &CompilationContext::new(1), &worker_pool, Instant(7)));
            });
        }
        thread::sleep(Duration::from_millis(20));
        let owner = {
            let (registry, compiler, pool) = (Arc::clone(&registry), Arc::clone(&compiler), Arc::clone(&pool));
            thread::spawn(move || compiler.compile(&registry, &CompilationContext::new(1), &pool, Instant(7)))
        };

        let from_worker = rx.recv_timeout(Duration::from_secs(5)).expect("pool worker blocked on in-flight compile");
        let from_owner = owner.join().unwrap();

        assert!(from_worker.unwrap().contains(&"F1".into()));
        assert!(from_owner.unwrap().contains(&"F1".into()));
        assert_eq!(compiles.load(Ordering::SeqCst), 2);
        assert!(compiler.is_cached(registry.id(), Instant(7)));
    }

    #[test]
    fn test_registries_do_not_share_entries() {
        let a = registry_of(vec![TestFunction::new("F1")]);
        let b = registry_of(vec![TestFunction::new("F1")]);
        let compiler = CachingFunctionCompiler::new(8);
        let ctx = CompilationContext::new(1);
        let pool = pool();

        let from_a = compiler.compile(&a, &ctx, &pool, Instant(10)).unwrap();
        let from_b = compiler.compile(&b, &ctx, &pool, Instant(10)).unwrap();
        assert!(!Arc::ptr_eq(&from_a, &from_b));
        assert_eq!(compiler.len(), 2);
    }

    #[test]
    fn test_interrupt_aborts_compile_and_fails_waiters() {
        let f1 = TestFunction::new("slow").with_compile_delay(Duration::from_millis(600));
        let registry = Arc::new(registry_of(vec![f1]));
        let compiler = Arc::new(CachingFunctionCompiler::new(8));
        let pool = Arc::new(pool());
        let interrupt = InterruptHandle::new();

        let owner = {
            let (registry, compiler, pool) = (Arc::clone(&registry), Arc::clone(&compiler), Arc::clone(&pool));
            let ctx = CompilationContext::new(1).with_interrupt(interrupt.clone());
            thread::spawn(move || compiler.compile(&registry, &ctx, &pool, Instant(7)))
        };
        thread::sleep(Duration::from_millis(60));

        let waiter = {
            let (registry, compiler, pool) = (Arc::clone(&registry), Arc::clone(&compiler), Arc::clone(&pool));
            thread::spawn(move || compiler.compile(&registry, &CompilationContext::new(1), &pool, Instant(7)))
        };
        thread::sleep(Duration::from_millis(60));
        interrupt.interrupt();

        let owner_result = owner.join().unwrap();
        let waiter_result = waiter.join().unwrap();
        assert!(matches!(owner_result, Err(CompilationError::Interrupted { outstanding: 1, .. })));
        assert!(matches!(waiter_result, Err(CompilationError::ConcurrentCompilationFailure { .. })));
        assert!(!compiler.is_cached(registry.id(), Instant(7)));
    }
}
