//! Unit-of-work context.
//!
//! A [`Worker`] is created once per inbound unit of work (request, timer tick,
//! bus dispatch) by [`Container::begin`](crate::Container::begin), handed to
//! every component wired for it, and torn down by
//! [`Container::finish`](crate::Container::finish).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use once_cell::sync::OnceCell;
use parking_lot::{Mutex, MutexGuard, RwLock};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::Span;

use crate::category::Category;
use crate::context::Context;
use crate::registration::AnyArc;

mod bus;
mod store;

pub use bus::Bus;
pub use store::Store;

static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

/// An instance checked out of the pool on behalf of one worker.
pub(crate) struct Tracked {
    pub(crate) binding: usize,
    pub(crate) instance: AnyArc,
}

/// Handle to the per-unit-of-work context.
///
/// Cloning is cheap and every clone refers to the same worker. The worker
/// owns the instances acquired for it until teardown; after
/// [`defer_recycle`](Worker::defer_recycle) it keeps owning them until the
/// last handle is dropped, at which point they are dropped rather than pooled.
///
/// # Examples
///
/// ```
/// use ferrous_pool::Bindings;
///
/// let container = Bindings::new().build().unwrap();
/// let worker = container.begin();
///
/// worker.bus().set("x-request-id", "r-1");
/// worker.store().insert("attempt", 1u32);
/// assert!(!worker.is_defer_recycle());
///
/// container.finish(worker);
/// ```
#[derive(Clone)]
pub struct Worker {
    inner: Arc<WorkerInner>,
}

pub(crate) struct WorkerInner {
    id: u64,
    bus: Bus,
    store: Store,
    logger: RwLock<Span>,
    started_at: Instant,
    started_wall: SystemTime,
    context: RwLock<Context>,
    defer_recycle: AtomicBool,
    finished: AtomicBool,
    acquired_infra: Mutex<Vec<Tracked>>,
    acquired_services: Mutex<Vec<Tracked>>,
    rand: OnceCell<Mutex<SmallRng>>,
}

impl Worker {
    pub(crate) fn new(bus: Bus) -> Self {
        let id = NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            inner: Arc::new(WorkerInner {
                id,
                bus,
                store: Store::new(),
                logger: RwLock::new(tracing::debug_span!("worker", worker.id = id)),
                started_at: Instant::now(),
                started_wall: SystemTime::now(),
                context: RwLock::new(Context::background()),
                defer_recycle: AtomicBool::new(false),
                finished: AtomicBool::new(false),
                acquired_infra: Mutex::new(Vec::new()),
                acquired_services: Mutex::new(Vec::new()),
                rand: OnceCell::new(),
            }),
        }
    }

    /// Process-unique identifier, useful for log correlation.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Propagated request metadata.
    pub fn bus(&self) -> &Bus {
        &self.inner.bus
    }

    /// Request-scoped cache.
    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    /// The span components log under.
    pub fn logger(&self) -> Span {
        self.inner.logger.read().clone()
    }

    /// Replaces the worker's span, e.g. with one carrying route fields.
    pub fn set_logger(&self, span: Span) {
        *self.inner.logger.write() = span;
    }

    pub fn started_at(&self) -> Instant {
        self.inner.started_at
    }

    /// Wall-clock start time.
    pub fn started_at_wall(&self) -> SystemTime {
        self.inner.started_wall
    }

    pub fn elapsed(&self) -> Duration {
        self.inner.started_at.elapsed()
    }

    /// The cancellation context outbound calls should honour.
    pub fn context(&self) -> Context {
        self.inner.context.read().clone()
    }

    /// Replaces the context, e.g. with `worker.context().with_timeout(..)`.
    pub fn set_context(&self, context: Context) {
        *self.inner.context.write() = context;
    }

    /// Keeps everything acquired for this worker out of the pool.
    ///
    /// Call this before handing the worker (or its components) to a task that
    /// outlives the unit of work. The switch is one-way.
    pub fn defer_recycle(&self) {
        if !self.inner.defer_recycle.swap(true, Ordering::AcqRel) {
            tracing::debug!(worker.id = self.inner.id, "recycle deferred");
        }
    }

    pub fn is_defer_recycle(&self) -> bool {
        self.inner.defer_recycle.load(Ordering::Acquire)
    }

    /// Per-worker random source, seeded from the clock on first use.
    pub fn rand(&self) -> MutexGuard<'_, SmallRng> {
        self.inner
            .rand
            .get_or_init(|| {
                let nanos = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_nanos() as u64)
                    .unwrap_or_default();
                Mutex::new(SmallRng::seed_from_u64(nanos ^ self.inner.id.rotate_left(32)))
            })
            .lock()
    }

    /// True once the worker has been torn down normally.
    pub fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::Acquire)
    }

    /// Number of pooled instances currently owned by this worker.
    pub fn acquired_count(&self) -> usize {
        self.inner.acquired_infra.lock().len() + self.inner.acquired_services.lock().len()
    }

    pub(crate) fn track(&self, category: Category, tracked: Tracked) {
        match category {
            Category::Infra => self.inner.acquired_infra.lock().push(tracked),
            _ => self.inner.acquired_services.lock().push(tracked),
        }
    }

    /// Drains tracked instances, services before infrastructure, each in
    /// acquisition order.
    pub(crate) fn take_tracked(&self) -> Vec<Tracked> {
        let mut tracked = std::mem::take(&mut *self.inner.acquired_services.lock());
        tracked.append(&mut self.inner.acquired_infra.lock());
        tracked
    }

    /// Flags the worker finished; returns false if it already was.
    pub(crate) fn mark_finished(&self) -> bool {
        !self.inner.finished.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn clear_transient(&self) {
        self.inner.bus.clear();
        self.inner.store.clear();
    }

    pub(crate) fn downgrade(&self) -> Weak<WorkerInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<WorkerInner>) -> Option<Worker> {
        weak.upgrade().map(|inner| Worker { inner })
    }

    /// Whether two handles refer to the same worker.
    pub fn ptr_eq(&self, other: &Worker) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.inner.id)
            .field("defer_recycle", &self.is_defer_recycle())
            .field("finished", &self.is_finished())
            .field("acquired", &self.acquired_count())
            .finish()
    }
}

impl Drop for WorkerInner {
    fn drop(&mut self) {
        let deferred = *self.defer_recycle.get_mut();
        let finished = *self.finished.get_mut();
        let outstanding = self.acquired_infra.get_mut().len() + self.acquired_services.get_mut().len();
        if !deferred && !finished && outstanding > 0 {
            tracing::warn!(
                worker.id = self.id,
                outstanding,
                "worker dropped without finish; instances will not return to the pool"
            );
        }
    }
}
