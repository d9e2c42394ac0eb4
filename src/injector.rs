//! Recursive injection engine.

use std::sync::Arc;

use crate::category::Category;
use crate::container::ContainerInner;
use crate::error::{DiError, DiResult};
use crate::inject::{Inject, WorkerRef};
use crate::internal::ResolutionPath;
use crate::key::key_of;
use crate::registration::{AnyArc, Binding, Source};
use crate::traits::Wire;
use crate::worker::{Tracked, Worker};

/// Fills component slots for one worker.
///
/// An injector is handed to [`Wire::wire`]. Each call resolves a slot against
/// the bindings visible from the component being wired, acquires the instance,
/// wires it recursively, fires its `begin_request` hook and finally assigns
/// it. Pooled instances are tracked on the worker as soon as they are
/// acquired, so an error halfway through still leaves them to be released by
/// [`Container::finish`](crate::Container::finish).
///
/// A slot filled for an earlier worker is resolved again, so an instance
/// coming back out of the pool never reaches into another unit of work's
/// dependencies.
///
/// Slots on services, repositories and infrastructure search Repository,
/// Service, Infra and Factory bindings. Slots on factory-built instances only
/// see Repository, Infra and Factory bindings.
pub struct Injector<'a> {
    container: &'a ContainerInner,
    worker: &'a Worker,
    scope: &'static [Category],
    path: ResolutionPath,
    tracked: usize,
}

impl<'a> Injector<'a> {
    pub(crate) fn new(container: &'a ContainerInner, worker: &'a Worker) -> Self {
        Self {
            container,
            worker,
            scope: Category::COMPONENT_SCOPE,
            path: ResolutionPath::new(container.config.max_wire_depth, container.config.detect_cycles),
            tracked: 0,
        }
    }

    /// The worker this injector wires for.
    pub fn worker(&self) -> &Worker {
        self.worker
    }

    /// Categories searched for the component currently being wired.
    pub fn scope(&self) -> &'static [Category] {
        self.scope
    }

    /// Pooled instances tracked so far by this injector.
    pub fn tracked(&self) -> usize {
        self.tracked
    }

    /// Assigns the current worker unless the slot already holds a live one.
    pub fn inject_worker(&mut self, slot: &WorkerRef) {
        if !slot.is_set() {
            slot.set(self.worker);
        }
    }

    /// Fills a slot for the current worker. A type nothing is bound to
    /// leaves it as it was.
    ///
    /// Caller-supplied values and values already wired for this worker are
    /// kept. A value wired for an earlier worker is replaced by a fresh
    /// acquisition.
    pub fn inject<T>(&mut self, slot: &Inject<T>) -> DiResult<()>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let worker_id = self.worker.id();
        if !slot.needs_wiring(worker_id) {
            return Ok(());
        }
        match self.resolve::<T>()? {
            Some(value) => {
                slot.fill(value, worker_id);
            }
            None => {
                // Leftover from an earlier worker; that instance is no longer ours
                slot.clear_wired();
            }
        }
        Ok(())
    }

    /// Like [`inject`](Self::inject), but a missing binding is an error.
    pub fn require<T>(&mut self, slot: &Inject<T>) -> DiResult<()>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let worker_id = self.worker.id();
        if !slot.needs_wiring(worker_id) {
            return Ok(());
        }
        match self.resolve::<T>()? {
            Some(value) => {
                slot.fill(value, worker_id);
                Ok(())
            }
            None => Err(DiError::NotFound(std::any::type_name::<T>())),
        }
    }

    /// Wires an embedded part as if its slots were declared on the parent.
    pub fn embed<W: Wire + ?Sized>(&mut self, part: &W) -> DiResult<()> {
        part.wire(self)
    }

    /// Resolves, acquires and activates an instance of `T` without a slot.
    ///
    /// Returns `Ok(None)` when nothing in scope is bound to `T`.
    pub fn resolve<T>(&mut self) -> DiResult<Option<Arc<T>>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = key_of::<T>();
        let container = self.container;
        let Some(resolved) = container.registry.resolve(self.scope, &key)? else {
            tracing::trace!(slot = key.display_name(), "no binding in scope, slot skipped");
            return Ok(None);
        };

        let instance = self.materialize(resolved.index, resolved.binding)?;
        let boxed = (resolved.cast)(instance)?;
        boxed
            .downcast::<Arc<T>>()
            .map(|typed| Some(*typed))
            .map_err(|_| DiError::TypeMismatch(key.display_name()))
    }

    fn materialize(&mut self, index: usize, binding: &'a Binding) -> DiResult<AnyArc> {
        match &binding.source {
            Source::Singleton(instance) => Ok(instance.clone()),
            Source::Pooled(_) => {
                let instance = self.container.pools.acquire(index, binding)?;
                self.worker.track(
                    binding.category,
                    Tracked {
                        binding: index,
                        instance: instance.clone(),
                    },
                );
                self.tracked += 1;
                self.activate(binding, &instance, Category::COMPONENT_SCOPE)?;
                Ok(instance)
            }
            Source::Fresh(_) => {
                let instance = self.container.pools.acquire(index, binding)?;
                self.activate(binding, &instance, Category::FACTORY_SCOPE)?;
                Ok(instance)
            }
        }
    }

    /// Wires `instance` with `scope`, then runs its `begin_request` hook.
    fn activate(&mut self, binding: &Binding, instance: &AnyArc, scope: &'static [Category]) -> DiResult<()> {
        self.path.enter(&binding.key)?;
        let outer = std::mem::replace(&mut self.scope, scope);
        tracing::trace!(
            component = binding.type_name(),
            category = %binding.category,
            depth = self.path.depth(),
            "wiring"
        );
        let result = (binding.wire)(instance, self);
        self.scope = outer;
        self.path.leave();
        result?;

        (binding.begin)(instance, self.worker);
        Ok(())
    }
}

impl std::fmt::Debug for Injector<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injector")
            .field("worker", &self.worker.id())
            .field("scope", &self.scope)
            .field("depth", &self.path.depth())
            .field("tracked", &self.tracked)
            .finish()
    }
}
