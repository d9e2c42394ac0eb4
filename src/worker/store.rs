//! Request-scoped key/value cache.

use std::any::Any;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;

type StoredValue = Arc<dyn Any + Send + Sync>;

/// String-keyed cache that lives as long as its worker.
///
/// Distinct from the pool: entries are arbitrary values meant for short-lived
/// memoization, such as a first-level cache in front of a persistence cache or
/// a transaction handle shared by several repositories of one request.
///
/// # Examples
///
/// ```
/// use ferrous_pool::Store;
///
/// let store = Store::new();
/// store.insert("user:7", String::from("ada"));
///
/// assert_eq!(store.get::<String>("user:7").as_deref().map(String::as_str), Some("ada"));
/// assert!(store.get::<u32>("user:7").is_none());
///
/// let hits = store.get_or_insert_with("hits", || 1u32);
/// assert_eq!(*hits, 1);
/// ```
#[derive(Default)]
pub struct Store {
    entries: RwLock<AHashMap<String, StoredValue>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, replacing any previous entry.
    pub fn insert<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.insert_arc(key, Arc::new(value));
    }

    /// Stores an already shared value.
    pub fn insert_arc<T: Any + Send + Sync>(&self, key: impl Into<String>, value: Arc<T>) {
        self.entries.write().insert(key.into(), value);
    }

    /// Returns the entry under `key` if it holds a `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let value = self.entries.read().get(key).cloned()?;
        value.downcast::<T>().ok()
    }

    /// Returns the entry under `key`, computing and storing it first if absent.
    ///
    /// An existing entry of another type is replaced.
    pub fn get_or_insert_with<T, F>(&self, key: &str, init: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        if let Some(existing) = self.get::<T>(key) {
            return existing;
        }
        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(key).cloned().and_then(|v| v.downcast::<T>().ok()) {
            return existing;
        }
        let value = Arc::new(init());
        entries.insert(key.to_string(), value.clone());
        value
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        f.debug_struct("Store").field("keys", &keys).finish()
    }
}
