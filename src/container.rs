//! The runtime value held by unit-of-work entry points.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::category::Category;
use crate::config::RuntimeConfig;
use crate::descriptors::BindingDescriptor;
use crate::error::{DiError, DiResult};
use crate::injector::Injector;
use crate::internal::{ShutdownBag, ShutdownReport};
use crate::key::{key_of, Key};
use crate::pool::Pools;
use crate::registration::{Binding, Registry, Source};
use crate::traits::{Component, Wire};
use crate::worker::{Bus, Tracked, Worker};

/// Frozen bindings plus their pools.
///
/// A `Container` is built once by [`Bindings::build`](crate::Bindings::build)
/// and shared by every unit of work; cloning is cheap. Several containers
/// can coexist in one process, which keeps tests isolated.
///
/// # Examples
///
/// ```
/// use ferrous_pool::{Bindings, Category, Component, Wire};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Repo;
/// impl Wire for Repo {}
/// impl Component for Repo {}
///
/// let mut bindings = Bindings::new();
/// bindings.bind(Category::Repository, Repo::default);
/// let container = bindings.build().unwrap();
///
/// let a = container.run(|worker| container.get::<Repo>(worker).unwrap());
/// let b = container.run(|worker| container.get::<Repo>(worker).unwrap());
///
/// // Single-threaded, so the second unit of work reuses the pooled instance.
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

pub(crate) struct ContainerInner {
    pub(crate) registry: Registry,
    pub(crate) pools: Pools,
    pub(crate) config: RuntimeConfig,
    shutdown: Mutex<ShutdownBag>,
    boot: Mutex<BootProgress>,
    booted: AtomicBool,
}

/// How far [`Container::boot`] got; a retry resumes from here.
#[derive(Default)]
struct BootProgress {
    /// Registry index of the next binding whose start hook may run
    next_start: usize,
    /// Registry index of the next binding to prewarm
    next_prewarm: usize,
}

impl Container {
    pub(crate) fn new(registry: Registry, shutdown: ShutdownBag, config: RuntimeConfig) -> Self {
        let pools = Pools::new(&registry.bindings, config.max_idle_per_type);
        Self {
            inner: Arc::new(ContainerInner {
                registry,
                pools,
                config,
                shutdown: Mutex::new(shutdown),
                boot: Mutex::new(BootProgress::default()),
                booted: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    // ----- Unit of work -----

    /// Starts a unit of work with an empty bus.
    pub fn begin(&self) -> Worker {
        self.begin_with_bus(Bus::new())
    }

    /// Starts a unit of work carrying propagated metadata, e.g. inbound headers.
    pub fn begin_with_bus(&self, bus: Bus) -> Worker {
        let worker = Worker::new(bus);
        tracing::trace!(worker.id = worker.id(), "begin");
        worker
    }

    /// Wires every slot of `entry` for `worker`.
    ///
    /// Returns the number of pooled instances newly tracked on the worker.
    /// On error the instances acquired so far stay tracked and are released
    /// by [`finish`](Self::finish) as usual.
    pub fn wire<W: Wire + ?Sized>(&self, entry: &W, worker: &Worker) -> DiResult<usize> {
        let span = worker.logger();
        let _entered = span.enter();
        let mut injector = Injector::new(&self.inner, worker);
        entry.wire(&mut injector)?;
        Ok(injector.tracked())
    }

    /// Resolves one dependency for `worker`: acquired, wired, hooked and tracked.
    ///
    /// `T` may be a concrete type or an interface.
    pub fn get<T>(&self, worker: &Worker) -> DiResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let span = worker.logger();
        let _entered = span.enter();
        Injector::new(&self.inner, worker)
            .resolve::<T>()?
            .ok_or(DiError::NotFound(std::any::type_name::<T>()))
    }

    /// Tears a unit of work down.
    ///
    /// Every tracked instance goes back to its pool in acquisition order and
    /// the bus and store are cleared. If the worker was deferred, nothing is
    /// released: the instances stay owned by the worker and are dropped with
    /// its last handle. Finishing the same worker twice is a no-op.
    pub fn finish(&self, worker: Worker) {
        if !worker.mark_finished() {
            tracing::warn!(worker.id = worker.id(), "worker finished twice");
            return;
        }
        if worker.is_defer_recycle() {
            tracing::debug!(
                worker.id = worker.id(),
                outstanding = worker.acquired_count(),
                "teardown deferred, nothing returned to the pool"
            );
            return;
        }

        let tracked = worker.take_tracked();
        let released = tracked.len();
        for Tracked { binding, instance } in tracked {
            if let Some(b) = self.inner.registry.bindings.get(binding) {
                self.inner.pools.release(binding, b, instance);
            }
        }
        worker.clear_transient();
        tracing::trace!(
            worker.id = worker.id(),
            released,
            elapsed = ?worker.elapsed(),
            "finish"
        );
    }

    /// Runs `f` inside a fresh unit of work and tears it down afterwards.
    pub fn run<R>(&self, f: impl FnOnce(&Worker) -> R) -> R {
        let worker = self.begin();
        let output = f(&worker);
        self.finish(worker);
        output
    }

    // ----- Raw pool access -----

    /// Takes an instance of `T` out of its pool without wiring or hooks.
    ///
    /// Singletons return the shared instance, factories a fresh one.
    pub fn acquire<T: Component>(&self) -> DiResult<Arc<T>> {
        let key = key_of::<T>();
        let (index, binding) = self.concrete(&key).ok_or(DiError::NotFound(key.display_name()))?;
        self.inner
            .pools
            .acquire(index, binding)?
            .downcast::<T>()
            .map_err(|_| DiError::TypeMismatch(key.display_name()))
    }

    /// Returns an instance to its pool. Singleton, factory and unbound
    /// instances are ignored.
    ///
    /// Releasing the same acquisition twice puts it in the free list twice;
    /// workers never do that.
    pub fn release<T: Component>(&self, instance: Arc<T>) {
        if let Some((index, binding)) = self.concrete(&key_of::<T>()) {
            self.inner.pools.release(index, binding, instance);
        }
    }

    /// Idle instances currently pooled for `T`.
    pub fn idle_count<T: Component>(&self) -> usize {
        self.concrete(&key_of::<T>())
            .and_then(|(index, _)| self.inner.pools.list(index))
            .map_or(0, |list| list.idle())
    }

    fn concrete(&self, key: &Key) -> Option<(usize, &Binding)> {
        Category::COMPONENT_SCOPE.iter().find_map(|category| {
            self.inner
                .registry
                .get(*category, key)
                .map(|index| (index, &self.inner.registry.bindings[index]))
        })
    }

    // ----- Introspection -----

    /// Looks up what `T` resolves to in `category`.
    ///
    /// Concrete types are matched by type, interfaces through their declared
    /// implementations; more than one implementation is an error.
    pub fn resolve<T: ?Sized + 'static>(&self, category: Category) -> DiResult<Option<BindingDescriptor>> {
        let resolved = self.inner.registry.resolve(&[category], &key_of::<T>())?;
        Ok(resolved.map(|r| BindingDescriptor::from_binding(r.index, r.binding)))
    }

    /// Describes every binding, in registration order.
    pub fn descriptors(&self) -> Vec<BindingDescriptor> {
        self.inner
            .registry
            .iter()
            .map(|(order, binding)| BindingDescriptor::from_binding(order, binding))
            .collect()
    }

    // ----- Application lifecycle -----

    /// Runs application-start hooks, then prewarms the pools.
    ///
    /// Start hooks run once per singleton Infra binding, in registration
    /// order. The first failure aborts boot; a later call resumes at the hook
    /// that failed, so hooks that already succeeded never run twice.
    /// Concurrent callers wait for the boot in progress. After a successful
    /// boot, further calls do nothing.
    pub fn boot(&self) -> DiResult<()> {
        let mut progress = self.inner.boot.lock();
        if self.is_booted() {
            return Ok(());
        }
        self.boot_from(&mut progress)?;
        self.inner.booted.store(true, Ordering::Release);
        Ok(())
    }

    fn boot_from(&self, progress: &mut BootProgress) -> DiResult<()> {
        let registry = &self.inner.registry;
        for (index, binding) in registry.iter().skip(progress.next_start) {
            if binding.category == Category::Infra {
                if let Source::Singleton(instance) = &binding.source {
                    (binding.start)(instance).map_err(|error| DiError::StartHook {
                        type_name: binding.type_name(),
                        error: Arc::new(error),
                    })?;
                    tracing::debug!(component = binding.type_name(), "started");
                }
            }
            progress.next_start = index + 1;
        }

        let prewarm = self.inner.config.prewarm;
        for (index, binding) in registry.iter().skip(progress.next_prewarm) {
            if prewarm > 0 && binding.is_pooled() {
                self.inner.pools.prewarm(index, binding, prewarm)?;
            }
            progress.next_prewarm = index + 1;
        }
        tracing::debug!(bindings = registry.len(), prewarm, "booted");
        Ok(())
    }

    pub fn is_booted(&self) -> bool {
        self.inner.booted.load(Ordering::Acquire)
    }

    /// Runs the shutdown callbacks once, in registration order.
    ///
    /// Failures are logged and reported, never propagated. Later calls
    /// return an empty report.
    pub fn shutdown(&self) -> ShutdownReport {
        let mut bag = std::mem::take(&mut *self.inner.shutdown.lock());
        let report = bag.run_all();
        tracing::debug!(ran = report.ran.len(), failed = report.failed.len(), "shutdown");
        report
    }

    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        let mut s = String::new();
        s.push_str("=== Container ===\n");
        for (index, binding) in self.inner.registry.iter() {
            let descriptor = BindingDescriptor::from_binding(index, binding);
            let idle = self.inner.pools.list(index).map_or(0, |list| list.idle());
            s.push_str(&format!("  {descriptor} idle={idle}\n"));
        }
        s
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("bindings", &self.inner.registry.len())
            .field("booted", &self.is_booted())
            .field("config", &self.inner.config)
            .finish()
    }
}
