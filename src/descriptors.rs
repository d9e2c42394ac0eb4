//! Binding descriptors for introspection and diagnostics.

use std::fmt;

use crate::category::Category;
use crate::key::Key;
use crate::registration::Binding;

/// Read-only view of one binding.
///
/// # Use Cases
///
/// - **Startup checks**: assert that every handler's dependencies are bound
/// - **Debugging**: list what is pooled versus shared
/// - **Health endpoints**: report the binding table
///
/// # Examples
///
/// ```rust
/// use ferrous_pool::{Bindings, Category, Component, Wire};
/// use std::sync::Arc;
///
/// trait Clock: Send + Sync {}
///
/// #[derive(Default)]
/// struct SystemClock;
/// impl Clock for SystemClock {}
/// impl Wire for SystemClock {}
/// impl Component for SystemClock {}
///
/// #[derive(Default)]
/// struct UserRepo;
/// impl Wire for UserRepo {}
/// impl Component for UserRepo {}
///
/// let mut bindings = Bindings::new();
/// bindings.bind(Category::Repository, UserRepo::default);
/// bindings
///     .bind_singleton(Category::Infra, SystemClock)
///     .implements::<dyn Clock>(|c| c);
///
/// let descriptors = bindings.descriptors();
/// assert_eq!(descriptors.len(), 2);
///
/// let clock = descriptors.iter().find(|d| d.singleton).unwrap();
/// assert_eq!(clock.category, Category::Infra);
/// assert!(!clock.pooled);
/// assert!(clock.interfaces[0].contains("Clock"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingDescriptor {
    /// The bound concrete type
    pub key: Key,
    pub category: Category,
    /// Shared instance, never pooled
    pub singleton: bool,
    /// Recycled through a free list
    pub pooled: bool,
    /// Interfaces declared with [`Binder::implements`](crate::Binder::implements)
    pub interfaces: Vec<&'static str>,
    /// Position in registration order
    pub order: usize,
}

impl BindingDescriptor {
    pub(crate) fn from_binding(order: usize, binding: &Binding) -> Self {
        Self {
            key: binding.key,
            category: binding.category,
            singleton: binding.is_singleton(),
            pooled: binding.is_pooled(),
            interfaces: binding.interfaces.clone(),
            order,
        }
    }

    /// Human-readable type name of the bound type.
    pub fn type_name(&self) -> &'static str {
        self.key.display_name()
    }

    /// Whether the binding constructs a fresh instance on every resolution.
    pub fn is_fresh(&self) -> bool {
        !self.singleton && !self.pooled
    }

    /// Whether this binding satisfies the interface with the given type name.
    pub fn implements(&self, interface: &str) -> bool {
        self.interfaces.iter().any(|i| *i == interface)
    }
}

impl fmt::Display for BindingDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.singleton {
            "singleton"
        } else if self.pooled {
            "pooled"
        } else {
            "fresh"
        };
        write!(f, "#{} {} [{}, {}]", self.order, self.type_name(), self.category, mode)?;
        if !self.interfaces.is_empty() {
            write!(f, " implements {}", self.interfaces.join(", "))?;
        }
        Ok(())
    }
}
