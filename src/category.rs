//! Binding categories.

use std::fmt;

/// Category a binding is registered under.
///
/// Categories decide how an instance is produced and which registries the
/// injector searches when filling a slot.
///
/// - **Service** / **Repository** / **Infra**: pooled per type unless bound as
///   a singleton.
/// - **Factory**: never pooled; every resolution constructs a fresh instance,
///   whose own slots are filled from Repository and Infra bindings only.
///
/// # Examples
///
/// ```rust
/// use ferrous_pool::Category;
///
/// assert!(Category::Service.is_pooled());
/// assert!(!Category::Factory.is_pooled());
/// assert_eq!(Category::Repository.to_string(), "repository");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum Category {
    /// Application services, usually what controllers and handlers depend on
    Service,
    /// Persistence-facing components
    Repository,
    /// Aggregate factories, constructed fresh per resolution
    Factory,
    /// Cross-cutting infrastructure (clients, caches, loggers)
    Infra,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Category; 4] = [
        Category::Service,
        Category::Repository,
        Category::Factory,
        Category::Infra,
    ];

    /// Search order for slots on services, repositories and infra components.
    pub(crate) const COMPONENT_SCOPE: &'static [Category] = &[
        Category::Repository,
        Category::Service,
        Category::Infra,
        Category::Factory,
    ];

    /// Search order for slots on factory-built instances.
    pub(crate) const FACTORY_SCOPE: &'static [Category] = &[
        Category::Repository,
        Category::Infra,
        Category::Factory,
    ];

    /// Whether non-singleton bindings in this category are recycled.
    pub fn is_pooled(self) -> bool {
        !matches!(self, Category::Factory)
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Category::Service => "service",
            Category::Repository => "repository",
            Category::Factory => "factory",
            Category::Infra => "infra",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
