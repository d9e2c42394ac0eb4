//! Binding collection.
//!
//! This module contains [`Bindings`], where constructors and singletons are
//! registered, and [`Binder`], returned by every registration to declare the
//! interfaces the bound type satisfies.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::category::Category;
use crate::config::RuntimeConfig;
use crate::container::Container;
use crate::descriptors::BindingDescriptor;
use crate::error::{BoxError, DiError, DiResult};
use crate::internal::ShutdownBag;
use crate::key::key_of;
use crate::registration::{AnyArc, AnyBox, Binding, Caster, Ctor, Registry, Source};
use crate::traits::Component;

/// Registration surface of the runtime.
///
/// Registration never fails on the spot. Problems such as binding a type
/// twice in one category are recorded and returned by [`build`](Self::build),
/// so a misconfigured application cannot start serving.
///
/// # Examples
///
/// ```rust
/// use ferrous_pool::{Bindings, Category, Component, DiResult, Inject, Injector, Wire};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str);
/// }
///
/// struct StdoutLogger;
/// impl Logger for StdoutLogger {
///     fn log(&self, msg: &str) { println!("{msg}"); }
/// }
/// impl Wire for StdoutLogger {}
/// impl Component for StdoutLogger {}
///
/// #[derive(Default)]
/// struct Repo;
/// impl Wire for Repo {}
/// impl Component for Repo {}
///
/// #[derive(Default)]
/// struct Svc {
///     repo: Inject<Repo>,
///     logger: Inject<dyn Logger>,
/// }
///
/// impl Wire for Svc {
///     fn wire(&self, injector: &mut Injector<'_>) -> DiResult<()> {
///         injector.require(&self.repo)?;
///         injector.require(&self.logger)
///     }
/// }
///
/// let mut bindings = Bindings::new();
/// bindings.bind(Category::Repository, Repo::default);
/// bindings
///     .bind_singleton(Category::Infra, StdoutLogger)
///     .implements::<dyn Logger>(|l| l);
///
/// let container = bindings.build().unwrap();
/// let worker = container.begin();
/// let svc = Svc::default();
/// container.wire(&svc, &worker).unwrap();
///
/// svc.logger.get().unwrap().log("wired");
/// container.finish(worker);
/// ```
pub struct Bindings {
    registry: Registry,
    errors: Vec<DiError>,
    shutdown: ShutdownBag,
    config: RuntimeConfig,
}

impl Bindings {
    /// Creates an empty collection with default settings.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Creates an empty collection with the given settings.
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            registry: Registry::new(),
            errors: Vec::new(),
            shutdown: ShutdownBag::default(),
            config,
        }
    }

    /// Settings the container will be built with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    // ----- Constructor bindings -----

    /// Binds `T` in `category` with an infallible constructor.
    ///
    /// Service, Repository and Infra bindings are pooled. Factory bindings
    /// construct a fresh instance every time they are resolved.
    pub fn bind<T, F>(&mut self, category: Category, ctor: F) -> Binder<'_, T>
    where
        T: Component,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let ctor: Ctor = Arc::new(move || Ok(Arc::new(ctor()) as AnyArc));
        self.bind_ctor::<T>(category, ctor)
    }

    /// Binds `T` with a constructor that may fail, e.g. while opening a connection.
    ///
    /// The error reaches the caller of [`Container::wire`] or
    /// [`Container::get`] as [`DiError::Construction`].
    pub fn try_bind<T, E, F>(&mut self, category: Category, ctor: F) -> Binder<'_, T>
    where
        T: Component,
        E: Into<BoxError>,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        let ctor: Ctor = Arc::new(move || match ctor() {
            Ok(value) => Ok(Arc::new(value) as AnyArc),
            Err(error) => Err(DiError::Construction {
                type_name: std::any::type_name::<T>(),
                error: Arc::new(error.into()),
            }),
        });
        self.bind_ctor::<T>(category, ctor)
    }

    fn bind_ctor<T: Component>(&mut self, category: Category, ctor: Ctor) -> Binder<'_, T> {
        let source = if category.is_pooled() {
            Source::Pooled(ctor)
        } else {
            Source::Fresh(ctor)
        };
        self.insert(Binding::new::<T>(category, source))
    }

    // ----- Singleton bindings -----

    /// Binds a ready-made instance shared by every unit of work.
    ///
    /// Singletons are never pooled, wired or tracked. Singletons in
    /// [`Category::Infra`] get their `on_app_start` hook called by
    /// [`Container::boot`].
    pub fn bind_singleton<T: Component>(&mut self, category: Category, instance: T) -> Binder<'_, T> {
        self.bind_singleton_arc(category, Arc::new(instance))
    }

    /// Binds a singleton the caller keeps a handle to.
    pub fn bind_singleton_arc<T: Component>(&mut self, category: Category, instance: Arc<T>) -> Binder<'_, T> {
        if !category.is_pooled() {
            self.errors.push(DiError::SingletonFactory(std::any::type_name::<T>()));
            return Binder::rejected(self);
        }
        let binding = Binding::new::<T>(category, Source::Singleton(instance as AnyArc));
        self.insert(binding)
    }

    fn insert<T>(&mut self, binding: Binding) -> Binder<'_, T> {
        tracing::debug!(
            component = binding.type_name(),
            category = %binding.category,
            singleton = binding.is_singleton(),
            "bind"
        );
        match self.registry.insert(binding) {
            Ok(index) => Binder {
                bindings: self,
                index: Some(index),
                _marker: PhantomData,
            },
            Err(error) => {
                self.errors.push(error);
                Binder::rejected(self)
            }
        }
    }

    // ----- Shutdown -----

    /// Registers a callback for [`Container::shutdown`].
    ///
    /// Callbacks run once, in registration order. A failing or panicking
    /// callback is logged and the remaining ones still run.
    pub fn on_shutdown<E, F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        E: Into<BoxError>,
        F: FnOnce() -> Result<(), E> + Send + 'static,
    {
        self.shutdown.push(
            name.into(),
            Box::new(move || -> Result<(), BoxError> { f().map_err(Into::into) }),
        );
        self
    }

    // ----- Introspection -----

    /// Describes every accepted binding, in registration order.
    pub fn descriptors(&self) -> Vec<BindingDescriptor> {
        self.registry
            .iter()
            .map(|(order, binding)| BindingDescriptor::from_binding(order, binding))
            .collect()
    }

    /// Number of accepted bindings.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.len() == 0
    }

    /// Freezes the bindings into a [`Container`].
    ///
    /// Fails with the first registration error, if any was recorded.
    pub fn build(self) -> DiResult<Container> {
        self.config.validate()?;
        if let Some(first) = self.errors.first() {
            for error in &self.errors {
                tracing::error!(%error, "invalid binding");
            }
            return Err(first.clone());
        }
        tracing::debug!(
            bindings = self.registry.len(),
            shutdown_hooks = self.shutdown.len(),
            "container built"
        );
        Ok(Container::new(self.registry, self.shutdown, self.config))
    }
}

impl Default for Bindings {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Bindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bindings")
            .field("bindings", &self.registry.len())
            .field("errors", &self.errors)
            .field("config", &self.config)
            .finish()
    }
}

/// Declares interfaces for the binding just registered.
///
/// A binder for a rejected registration (duplicate, singleton factory)
/// accepts and ignores every call; the original error is reported by
/// [`Bindings::build`].
pub struct Binder<'b, T> {
    bindings: &'b mut Bindings,
    index: Option<usize>,
    _marker: PhantomData<fn() -> T>,
}

impl<'b, T> Binder<'b, T> {
    fn rejected(bindings: &'b mut Bindings) -> Self {
        Self {
            bindings,
            index: None,
            _marker: PhantomData,
        }
    }

    /// Position of the binding in registration order, `None` if it was rejected.
    pub fn index(&self) -> Option<usize> {
        self.index
    }
}

impl<T: Component> Binder<'_, T> {
    /// Declares that the bound type satisfies the interface `I`.
    ///
    /// `cast` is almost always the identity closure `|x| x`, which performs
    /// the unsizing coercion from `Arc<T>` to `Arc<I>`.
    pub fn implements<I>(&mut self, cast: impl Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        let Some(index) = self.index else {
            return self;
        };
        let caster: Caster = Arc::new(move |instance: AnyArc| {
            let typed = instance
                .downcast::<T>()
                .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))?;
            Ok(Box::new(cast(typed)) as AnyBox)
        });
        let key = key_of::<I>();
        tracing::debug!(
            component = std::any::type_name::<T>(),
            interface = key.display_name(),
            "implements"
        );
        self.bindings.registry.add_interface(index, key, caster);
        self
    }
}
