//! Propagated request metadata.

use std::collections::HashMap;

use ahash::AHashMap;
use parking_lot::RwLock;

/// Header-like metadata that travels with a unit of work.
///
/// Keys are case-sensitive and each key holds an ordered list of values.
/// Downstream calls (outbound requests, published events) copy the bus so
/// trace and tenant information propagates without threading it through
/// every call site.
///
/// # Examples
///
/// ```
/// use ferrous_pool::Bus;
///
/// let bus = Bus::new();
/// bus.add("x-trace-id", "abc");
/// bus.add("x-tag", "a");
/// bus.add("x-tag", "b");
///
/// assert_eq!(bus.get("x-trace-id").as_deref(), Some("abc"));
/// assert_eq!(bus.get_all("x-tag"), vec!["a", "b"]);
/// assert_eq!(bus.get("X-Trace-Id"), None);
/// ```
#[derive(Default)]
pub struct Bus {
    entries: RwLock<AHashMap<String, Vec<String>>>,
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` to the values of `key`.
    pub fn add(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .write()
            .entry(key.into())
            .or_default()
            .push(value.into());
    }

    /// Replaces every value of `key` with `value`.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.write().insert(key.into(), vec![value.into()]);
    }

    /// First value of `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .get(key)
            .and_then(|values| values.first().cloned())
    }

    /// Every value of `key`, in insertion order.
    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.entries.read().get(key).cloned().unwrap_or_default()
    }

    /// Removes `key` and returns its values.
    pub fn remove(&self, key: &str) -> Vec<String> {
        self.entries.write().remove(key).unwrap_or_default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Keys currently present, sorted for stable output.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Copies the metadata out, e.g. to attach it to an outbound call.
    pub fn snapshot(&self) -> HashMap<String, Vec<String>> {
        self.entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Appends every pair from `pairs`.
    pub fn extend<K, V, I>(&self, pairs: I)
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut entries = self.entries.write();
        for (key, value) in pairs {
            entries.entry(key.into()).or_default().push(value.into());
        }
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl Clone for Bus {
    fn clone(&self) -> Self {
        Self {
            entries: RwLock::new(self.entries.read().clone()),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Bus {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let bus = Bus::new();
        bus.extend(iter);
        bus
    }
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.snapshot()).finish()
    }
}
