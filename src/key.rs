//! Type keys for binding lookup.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Key identifying a bound concrete type or an interface (`dyn Trait`).
///
/// Equality and hashing only look at the `TypeId`; the name is carried for
/// diagnostics.
///
/// # Examples
///
/// ```rust
/// use ferrous_pool::{key_of, Key};
///
/// trait Greeter: Send + Sync {}
///
/// let concrete = key_of::<String>();
/// let interface = key_of::<dyn Greeter>();
///
/// assert_eq!(concrete, key_of::<String>());
/// assert_ne!(concrete, interface);
/// assert!(interface.display_name().contains("Greeter"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Key {
    id: TypeId,
    name: &'static str,
}

impl Key {
    /// Creates a key from its parts.
    pub fn new(id: TypeId, name: &'static str) -> Self {
        Self { id, name }
    }

    /// The underlying `TypeId`.
    #[inline(always)]
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Human-readable type name, as produced by `std::any::type_name`.
    pub fn display_name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for Key {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Key {}

impl Hash for Key {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Builds the key for `T`, which may be unsized (`dyn Trait`).
#[inline(always)]
pub fn key_of<T: ?Sized + 'static>() -> Key {
    Key::new(TypeId::of::<T>(), std::any::type_name::<T>())
}
