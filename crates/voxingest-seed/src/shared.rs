use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

/// Concurrency-safe key/value map.
///
/// Producer tasks use it to set aside link data (e.g. user id to earned
/// trophies) while submitting primary records; the follow-up stage reads a
/// snapshot once the producers are done.
#[derive(Debug, Default)]
pub struct SharedMap<K, V> {
    data: RwLock<HashMap<K, V>>,
}

impl<K, V> SharedMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.write().insert(key, value);
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.read().get(key).cloned()
    }

    pub fn remove(&self, key: &K) {
        self.write().remove(key);
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    /// Returns a copy of the entire map.
    pub fn snapshot(&self) -> HashMap<K, V> {
        self.read().clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<K, V>> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<K, V>> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }
}
