//! Type-indexed object pools.
//!
//! Every pooled binding owns one [`ObjectPool`] free list, created when the
//! container is built. The index from binding to free list never changes
//! afterwards, so lookups are lock-free and only the free list itself is
//! guarded.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::DiResult;
use crate::registration::{AnyArc, Binding, Source};

/// Concurrent free list of idle `Arc<T>` instances.
///
/// `T` may be unsized; the runtime stores `dyn Any + Send + Sync`.
///
/// # Examples
///
/// ```
/// use ferrous_pool::ObjectPool;
/// use std::sync::Arc;
///
/// let pool: ObjectPool<String> = ObjectPool::new(Some(1));
/// assert!(pool.pop().is_none());
///
/// pool.push(Arc::new("a".to_string()));
/// pool.push(Arc::new("b".to_string())); // over the cap, dropped
///
/// assert_eq!(pool.idle(), 1);
/// assert_eq!(&*pool.pop().unwrap(), "a");
/// ```
pub struct ObjectPool<T: ?Sized> {
    idle: Mutex<Vec<Arc<T>>>,
    max_idle: Option<usize>,
    created: AtomicUsize,
}

impl<T: ?Sized> ObjectPool<T> {
    /// Creates an empty pool keeping at most `max_idle` idle instances.
    pub fn new(max_idle: Option<usize>) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
            created: AtomicUsize::new(0),
        }
    }

    /// Takes the most recently released instance.
    pub fn pop(&self) -> Option<Arc<T>> {
        self.idle.lock().pop()
    }

    /// Returns an instance; returns false when the cap made the pool drop it.
    pub fn push(&self, value: Arc<T>) -> bool {
        let mut idle = self.idle.lock();
        if self.max_idle.is_some_and(|max| idle.len() >= max) {
            return false;
        }
        idle.push(value);
        true
    }

    /// Pops an idle instance or builds a new one with `make`.
    pub fn get_or_try_create<E>(&self, make: impl FnOnce() -> Result<Arc<T>, E>) -> Result<Arc<T>, E> {
        if let Some(value) = self.pop() {
            return Ok(value);
        }
        let value = make()?;
        self.created.fetch_add(1, Ordering::Relaxed);
        Ok(value)
    }

    /// Number of idle instances.
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    /// Number of instances this pool had to construct.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    /// Drops every idle instance.
    pub fn drain(&self) -> usize {
        let mut idle = self.idle.lock();
        let count = idle.len();
        idle.clear();
        count
    }
}

impl<T: ?Sized> std::fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectPool")
            .field("idle", &self.idle())
            .field("created", &self.created())
            .field("max_idle", &self.max_idle)
            .finish()
    }
}

/// Free lists for every binding, indexed like the registry.
pub(crate) struct Pools {
    lists: Box<[Option<ObjectPool<dyn std::any::Any + Send + Sync>>]>,
}

impl Pools {
    pub(crate) fn new(bindings: &[Binding], max_idle: Option<usize>) -> Self {
        let lists = bindings
            .iter()
            .map(|binding| binding.is_pooled().then(|| ObjectPool::new(max_idle)))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { lists }
    }

    /// Produces an instance for `binding` without wiring it.
    pub(crate) fn acquire(&self, index: usize, binding: &Binding) -> DiResult<AnyArc> {
        match &binding.source {
            Source::Singleton(instance) => Ok(instance.clone()),
            Source::Fresh(ctor) => ctor(),
            Source::Pooled(ctor) => match self.list(index) {
                Some(list) => {
                    let instance = list.get_or_try_create(|| ctor())?;
                    tracing::trace!(binding = binding.type_name(), idle = list.idle(), "acquired");
                    Ok(instance)
                }
                None => ctor(),
            },
        }
    }

    /// Returns an instance to its free list. Non-pooled bindings ignore it.
    pub(crate) fn release(&self, index: usize, binding: &Binding, instance: AnyArc) {
        let Some(list) = self.list(index) else {
            return;
        };
        if list.push(instance) {
            tracing::trace!(binding = binding.type_name(), idle = list.idle(), "released");
        } else {
            tracing::trace!(binding = binding.type_name(), "free list full, instance dropped");
        }
    }

    /// Tops the free list of a pooled binding up to `count` idle instances.
    pub(crate) fn prewarm(&self, index: usize, binding: &Binding, count: usize) -> DiResult<()> {
        let (Some(list), Source::Pooled(ctor)) = (self.list(index), &binding.source) else {
            return Ok(());
        };
        while list.idle() < count {
            let instance = ctor()?;
            list.created.fetch_add(1, Ordering::Relaxed);
            if !list.push(instance) {
                break;
            }
        }
        Ok(())
    }

    pub(crate) fn list(&self, index: usize) -> Option<&ObjectPool<dyn std::any::Any + Send + Sync>> {
        self.lists.get(index).and_then(Option::as_ref)
    }
}
