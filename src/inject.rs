//! Injectable slots declared as component fields.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::error::{DiError, DiResult};
use crate::worker::{Worker, WorkerInner};

/// A dependency slot filled by the [`Injector`](crate::Injector).
///
/// `T` is either a bound concrete type or an interface (`dyn Trait`) declared
/// with [`Binder::implements`](crate::Binder::implements).
///
/// A slot remembers who filled it. A value supplied by the caller (through
/// [`with`](Self::with) or [`replace`](Self::replace)) is never touched by
/// wiring. A value the injector filled belongs to the worker it was wired
/// for: wiring again for that worker leaves it alone, wiring for any other
/// worker resolves a fresh instance, so a component coming back out of the
/// pool never shares its dependencies with another unit of work.
///
/// # Examples
///
/// ```
/// use ferrous_pool::Inject;
/// use std::sync::Arc;
///
/// let slot: Inject<String> = Inject::new();
/// assert!(!slot.is_set());
/// assert!(slot.get().is_err());
///
/// let preset = Inject::with(Arc::new("caller supplied".to_string()));
/// assert_eq!(&*preset.get().unwrap(), "caller supplied");
/// assert!(preset.is_caller_supplied());
/// ```
pub struct Inject<T: ?Sized> {
    slot: RwLock<Filled<T>>,
}

struct Filled<T: ?Sized> {
    value: Option<Arc<T>>,
    /// Worker the injector filled the slot for; `None` for caller values
    wired_for: Option<u64>,
}

impl<T: ?Sized> Filled<T> {
    fn needs_wiring(&self, worker_id: u64) -> bool {
        match (&self.value, self.wired_for) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(_), Some(id)) => id != worker_id,
        }
    }
}

impl<T: ?Sized + 'static> Inject<T> {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(Filled { value: None, wired_for: None }),
        }
    }

    /// Creates a slot pre-filled by the caller; wiring will skip it.
    pub fn with(value: Arc<T>) -> Self {
        Self {
            slot: RwLock::new(Filled { value: Some(value), wired_for: None }),
        }
    }

    /// Returns the wired value.
    pub fn get(&self) -> DiResult<Arc<T>> {
        self.try_get()
            .ok_or(DiError::NotWired(std::any::type_name::<T>()))
    }

    /// Returns the wired value, if any.
    pub fn try_get(&self) -> Option<Arc<T>> {
        self.slot.read().value.clone()
    }

    pub fn is_set(&self) -> bool {
        self.slot.read().value.is_some()
    }

    /// True when the value came from the caller rather than the injector.
    pub fn is_caller_supplied(&self) -> bool {
        let slot = self.slot.read();
        slot.value.is_some() && slot.wired_for.is_none()
    }

    /// Overwrites the slot with a caller value and returns the previous one.
    pub fn replace(&self, value: Arc<T>) -> Option<Arc<T>> {
        let mut slot = self.slot.write();
        slot.wired_for = None;
        slot.value.replace(value)
    }

    /// Empties the slot so the next wiring fills it again.
    pub fn clear(&self) -> Option<Arc<T>> {
        let mut slot = self.slot.write();
        slot.wired_for = None;
        slot.value.take()
    }

    /// Whether wiring for `worker_id` has to resolve this slot.
    pub(crate) fn needs_wiring(&self, worker_id: u64) -> bool {
        self.slot.read().needs_wiring(worker_id)
    }

    /// Drops a value the injector filled; caller values stay.
    pub(crate) fn clear_wired(&self) {
        let mut slot = self.slot.write();
        if slot.wired_for.is_some() {
            slot.value = None;
            slot.wired_for = None;
        }
    }

    /// Stores a value resolved for `worker_id` unless another writer got
    /// there first.
    pub(crate) fn fill(&self, value: Arc<T>, worker_id: u64) -> bool {
        let mut slot = self.slot.write();
        if !slot.needs_wiring(worker_id) {
            return false;
        }
        slot.value = Some(value);
        slot.wired_for = Some(worker_id);
        true
    }
}

impl<T: ?Sized + 'static> Default for Inject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized + 'static> fmt::Debug for Inject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.read();
        f.debug_struct("Inject")
            .field("type", &std::any::type_name::<T>())
            .field("set", &slot.value.is_some())
            .field("wired_for", &slot.wired_for)
            .finish()
    }
}

/// Slot holding the current [`Worker`].
///
/// The reference is weak: a component sitting idle in the pool never keeps a
/// finished worker alive, and a worker handed to a spawned task under
/// deferred recycle is dropped once that task lets go of it. A slot whose
/// worker is gone or torn down counts as unset and is re-filled by the next
/// wiring.
#[derive(Default)]
pub struct WorkerRef {
    slot: RwLock<Option<Weak<WorkerInner>>>,
}

impl WorkerRef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Points the slot at `worker`, replacing any previous worker.
    pub fn set(&self, worker: &Worker) {
        *self.slot.write() = Some(worker.downgrade());
    }

    /// Returns the worker this slot points at.
    pub fn get(&self) -> DiResult<Worker> {
        self.try_get().ok_or(DiError::NotWired("Worker"))
    }

    /// Returns the worker if it is still alive and not torn down.
    ///
    /// A deferred worker stays reachable after teardown.
    pub fn try_get(&self) -> Option<Worker> {
        self.slot
            .read()
            .as_ref()
            .and_then(Worker::upgrade)
            .filter(|worker| !worker.is_finished() || worker.is_defer_recycle())
    }

    pub fn is_set(&self) -> bool {
        self.try_get().is_some()
    }

    pub fn clear(&self) {
        *self.slot.write() = None;
    }
}

impl fmt::Debug for WorkerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerRef")
            .field("worker", &self.try_get().map(|w| w.id()))
            .finish()
    }
}
