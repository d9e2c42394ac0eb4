//! Error types for the injection runtime.

use std::sync::Arc;

use crate::category::Category;

/// Boxed error returned by fallible constructors, start hooks and shutdown callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Injection runtime errors
///
/// Configuration errors (`NotFound`, `AmbiguousInterface`, `DuplicateBinding`,
/// `SingletonFactory`, `Circular`, `DepthExceeded`, `InvalidConfig`) are
/// programmer errors and should abort startup. `Construction` is a resource
/// error and is returned to the caller of the unit of work, which decides
/// whether to fail it.
///
/// # Examples
///
/// ```rust
/// use ferrous_pool::{Bindings, DiError};
///
/// struct Unbound;
/// impl ferrous_pool::Wire for Unbound {}
/// impl ferrous_pool::Component for Unbound {}
///
/// let container = Bindings::new().build().unwrap();
/// match container.acquire::<Unbound>() {
///     Err(DiError::NotFound(name)) => assert!(name.ends_with("Unbound")),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, thiserror::Error)]
pub enum DiError {
    /// No binding exists for the requested type
    #[error("no binding for {0}")]
    NotFound(&'static str),
    /// Type-erased instance did not downcast to the requested type
    #[error("type mismatch for {0}")]
    TypeMismatch(&'static str),
    /// More than one bound type implements the requested interface
    #[error("{interface} is implemented by more than one binding: {}", candidates.join(", "))]
    AmbiguousInterface {
        interface: &'static str,
        candidates: Vec<&'static str>,
    },
    /// The same concrete type was bound twice in one category
    #[error("{type_name} is bound more than once in category {category}")]
    DuplicateBinding {
        type_name: &'static str,
        category: Category,
    },
    /// Factory bindings always construct fresh instances
    #[error("{0} cannot be bound as a singleton factory")]
    SingletonFactory(&'static str),
    /// Wiring re-entered a type already on the resolution path
    #[error("circular wiring: {}", .0.join(" -> "))]
    Circular(Vec<&'static str>),
    /// Wiring went deeper than the configured limit
    #[error("max wiring depth {0} exceeded")]
    DepthExceeded(usize),
    /// A constructor reported a failure
    #[error("constructor for {type_name} failed: {error}")]
    Construction {
        type_name: &'static str,
        error: Arc<BoxError>,
    },
    /// A slot was read before the injector filled it
    #[error("{0} has not been wired")]
    NotWired(&'static str),
    /// An application-start hook failed during boot
    #[error("start hook for {type_name} failed: {error}")]
    StartHook {
        type_name: &'static str,
        error: Arc<BoxError>,
    },
    /// Runtime settings were rejected
    #[error("invalid runtime config: {0}")]
    InvalidConfig(String),
}

impl DiError {
    /// Returns true for errors caused by a misconfigured binding table.
    ///
    /// These are never worth retrying; the entry point should treat them as fatal.
    pub fn is_configuration(&self) -> bool {
        !matches!(
            self,
            DiError::Construction { .. } | DiError::NotWired(_) | DiError::StartHook { .. }
        )
    }
}

/// Result type for runtime operations
pub type DiResult<T> = Result<T, DiError>;
