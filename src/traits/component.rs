//! Lifecycle protocol for pooled and singleton components.

use crate::error::BoxError;
use crate::worker::Worker;
use crate::traits::Wire;

/// A type that can be bound, pooled and wired by the runtime.
///
/// Both hooks are optional. `begin_request` fires exactly once per
/// acquisition, including when the instance comes back out of the pool, so it
/// is the place to capture the worker and reset per-request state. The runtime
/// never resets fields itself.
///
/// `on_app_start` only runs for singleton bindings in [`Category::Infra`],
/// once, from [`Container::boot`].
///
/// [`Category::Infra`]: crate::Category::Infra
/// [`Container::boot`]: crate::Container::boot
///
/// # Examples
///
/// ```
/// use ferrous_pool::{Component, Wire, Worker, WorkerRef};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Default)]
/// struct AuditTrail {
///     worker: WorkerRef,
///     entries: AtomicUsize,
/// }
///
/// impl Wire for AuditTrail {}
///
/// impl Component for AuditTrail {
///     fn begin_request(&self, worker: &Worker) {
///         self.worker.set(worker);
///         self.entries.store(0, Ordering::Relaxed);
///     }
/// }
/// ```
pub trait Component: Wire + Send + Sync + 'static {
    /// Per-acquisition setup, invoked after the instance's slots are wired.
    fn begin_request(&self, worker: &Worker) {
        let _ = worker;
    }

    /// One-time application start hook for singleton infrastructure.
    fn on_app_start(&self) -> Result<(), BoxError> {
        Ok(())
    }
}
