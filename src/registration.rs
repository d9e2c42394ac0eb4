//! Binding table types.

use std::any::{Any, TypeId};
use std::sync::Arc;

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::category::Category;
use crate::error::{BoxError, DiError, DiResult};
use crate::injector::Injector;
use crate::key::Key;
use crate::traits::Component;
use crate::worker::Worker;

// Type-erased Arc for storage
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

/// Boxed `Arc<I>` for some (possibly unsized) `I`, produced by a caster.
pub(crate) type AnyBox = Box<dyn Any + Send + Sync>;

pub(crate) type Ctor = Arc<dyn Fn() -> DiResult<AnyArc> + Send + Sync>;
pub(crate) type Caster = Arc<dyn Fn(AnyArc) -> DiResult<AnyBox> + Send + Sync>;
pub(crate) type WireFn = fn(&AnyArc, &mut Injector<'_>) -> DiResult<()>;
pub(crate) type BeginFn = fn(&AnyArc, &Worker);
pub(crate) type StartFn = fn(&AnyArc) -> Result<(), BoxError>;

/// How a binding produces instances.
#[derive(Clone)]
pub(crate) enum Source {
    /// Popped from the free list, or constructed when it is empty
    Pooled(Ctor),
    /// Shared by every acquisition
    Singleton(AnyArc),
    /// Constructed on every acquisition, never recycled
    Fresh(Ctor),
}

/// A registered type with its constructor and erased lifecycle thunks.
pub(crate) struct Binding {
    pub(crate) key: Key,
    pub(crate) category: Category,
    pub(crate) source: Source,
    /// Casts the erased instance to a boxed `Arc<T>` of the concrete type
    pub(crate) as_self: Caster,
    pub(crate) wire: WireFn,
    pub(crate) begin: BeginFn,
    pub(crate) start: StartFn,
    /// Interfaces this binding was declared to implement
    pub(crate) interfaces: Vec<&'static str>,
}

impl Binding {
    pub(crate) fn new<T: Component>(category: Category, source: Source) -> Self {
        Self {
            key: crate::key::key_of::<T>(),
            category,
            source,
            as_self: Arc::new(cast_self::<T>),
            wire: wire_erased::<T>,
            begin: begin_erased::<T>,
            start: start_erased::<T>,
            interfaces: Vec::new(),
        }
    }

    pub(crate) fn is_singleton(&self) -> bool {
        matches!(self.source, Source::Singleton(_))
    }

    pub(crate) fn is_pooled(&self) -> bool {
        matches!(self.source, Source::Pooled(_))
    }

    pub(crate) fn type_name(&self) -> &'static str {
        self.key.display_name()
    }
}

fn downcast_ref<T: Component>(instance: &AnyArc) -> DiResult<&T> {
    instance
        .downcast_ref::<T>()
        .ok_or(DiError::TypeMismatch(std::any::type_name::<T>()))
}

fn cast_self<T: Component>(instance: AnyArc) -> DiResult<AnyBox> {
    instance
        .downcast::<T>()
        .map(|typed| Box::new(typed) as AnyBox)
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
}

fn wire_erased<T: Component>(instance: &AnyArc, injector: &mut Injector<'_>) -> DiResult<()> {
    downcast_ref::<T>(instance)?.wire(injector)
}

fn begin_erased<T: Component>(instance: &AnyArc, worker: &Worker) {
    if let Ok(component) = downcast_ref::<T>(instance) {
        component.begin_request(worker);
    }
}

fn start_erased<T: Component>(instance: &AnyArc) -> Result<(), BoxError> {
    match instance.downcast_ref::<T>() {
        Some(component) => component.on_app_start(),
        None => Ok(()),
    }
}

/// A bound type satisfying an interface.
#[derive(Clone)]
pub(crate) struct Implementation {
    pub(crate) binding: usize,
    pub(crate) cast: Caster,
}

/// Outcome of a lookup.
pub(crate) struct Resolved<'r> {
    pub(crate) index: usize,
    pub(crate) binding: &'r Binding,
    pub(crate) cast: &'r Caster,
}

/// Binding table: registration-ordered bindings plus lookup indexes.
#[derive(Default)]
pub(crate) struct Registry {
    pub(crate) bindings: Vec<Binding>,
    by_type: AHashMap<(Category, TypeId), usize>,
    interfaces: AHashMap<TypeId, SmallVec<[Implementation; 2]>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a binding, refusing a second binding of the same type in the same category.
    pub(crate) fn insert(&mut self, binding: Binding) -> DiResult<usize> {
        let slot = (binding.category, binding.key.type_id());
        if self.by_type.contains_key(&slot) {
            return Err(DiError::DuplicateBinding {
                type_name: binding.type_name(),
                category: binding.category,
            });
        }
        let index = self.bindings.len();
        self.by_type.insert(slot, index);
        self.bindings.push(binding);
        Ok(index)
    }

    /// Records that binding `index` satisfies the interface `key`.
    pub(crate) fn add_interface(&mut self, index: usize, key: Key, cast: Caster) {
        let implementations = self.interfaces.entry(key.type_id()).or_default();
        if implementations.iter().any(|i| i.binding == index) {
            return;
        }
        implementations.push(Implementation { binding: index, cast });
        if let Some(binding) = self.bindings.get_mut(index) {
            binding.interfaces.push(key.display_name());
        }
    }

    pub(crate) fn get(&self, category: Category, key: &Key) -> Option<usize> {
        self.by_type.get(&(category, key.type_id())).copied()
    }

    /// Finds the binding serving `key` within `scope`.
    ///
    /// Concrete types are looked up category by category in scope order.
    /// Interfaces gather every implementation whose category is in scope; more
    /// than one is an [`DiError::AmbiguousInterface`].
    pub(crate) fn resolve(&self, scope: &[Category], key: &Key) -> DiResult<Option<Resolved<'_>>> {
        for category in scope {
            if let Some(index) = self.get(*category, key) {
                let binding = &self.bindings[index];
                return Ok(Some(Resolved {
                    index,
                    binding,
                    cast: &binding.as_self,
                }));
            }
        }

        let Some(implementations) = self.interfaces.get(&key.type_id()) else {
            return Ok(None);
        };
        let mut in_scope = implementations
            .iter()
            .filter(|i| scope.contains(&self.bindings[i.binding].category));

        let Some(first) = in_scope.next() else {
            return Ok(None);
        };
        let rest: Vec<&Implementation> = in_scope.collect();
        if !rest.is_empty() {
            let candidates = std::iter::once(first)
                .chain(rest)
                .map(|i| self.bindings[i.binding].type_name())
                .collect();
            return Err(DiError::AmbiguousInterface {
                interface: key.display_name(),
                candidates,
            });
        }

        Ok(Some(Resolved {
            index: first.binding,
            binding: &self.bindings[first.binding],
            cast: &first.cast,
        }))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (usize, &Binding)> {
        self.bindings.iter().enumerate()
    }

    pub(crate) fn len(&self) -> usize {
        self.bindings.len()
    }
}
