//! Slot visitor used by the injection engine.

use crate::error::DiResult;
use crate::injector::Injector;

/// Hands a component's injectable slots to the [`Injector`].
///
/// Implementations call the injector once per slot; embedded parts are
/// flattened with [`Injector::embed`]. Slots that are already set are left
/// alone, so caller-supplied values survive wiring.
///
/// The default implementation wires nothing, which suits leaf components.
///
/// # Examples
///
/// ```
/// use ferrous_pool::{DiResult, Inject, Injector, Wire, WorkerRef};
///
/// struct Clock;
/// impl Wire for Clock {}
///
/// #[derive(Default)]
/// struct Base {
///     worker: WorkerRef,
/// }
///
/// impl Wire for Base {
///     fn wire(&self, injector: &mut Injector<'_>) -> DiResult<()> {
///         injector.inject_worker(&self.worker);
///         Ok(())
///     }
/// }
///
/// #[derive(Default)]
/// struct Handler {
///     base: Base,
///     clock: Inject<Clock>,
/// }
///
/// impl Wire for Handler {
///     fn wire(&self, injector: &mut Injector<'_>) -> DiResult<()> {
///         injector.embed(&self.base)?;
///         injector.inject(&self.clock)
///     }
/// }
/// ```
pub trait Wire {
    /// Offers every slot of `self` to the injector.
    fn wire(&self, injector: &mut Injector<'_>) -> DiResult<()> {
        let _ = injector;
        Ok(())
    }
}
