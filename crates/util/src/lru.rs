//! Small LRU cache over the ordered map: the key list doubles as the
//! recency list, oldest first.

use crate::ordmap::{OrderedMap, TableKey};

pub const DEFAULT_LRU_CAPACITY: usize = 11;

pub struct LruCache<K: TableKey, V> {
    entries: OrderedMap<K, V>,
    capacity: usize,
}

impl<K: TableKey, V> LruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        LruCache {
            entries: OrderedMap::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts an entry, returning the evicted least-recently-used value
    /// when the cache was full.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        let mut evicted = None;
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            if let Some(oldest) = self.entries.first_key().cloned() {
                evicted = self.entries.remove(&oldest);
            }
        }
        self.entries.insert(key, value);
        evicted
    }

    /// Looks an entry up and promotes it to most-recently-used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if self.entries.contains_key(key) {
            self.entries.touch(key);
            self.entries.get(key)
        } else {
            None
        }
    }
}

impl<K: TableKey, V> Default for LruCache<K, V> {
    fn default() -> Self {
        LruCache::new(DEFAULT_LRU_CAPACITY)
    }
}
