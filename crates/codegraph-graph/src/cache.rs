use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cache entry with TTL and access tracking.
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    created_at: Instant,
    access_count: u64,
    ttl: Duration,
}

impl<T> CacheEntry<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            access_count: 1,
            ttl,
        }
    }

    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }

    fn access(&mut self) -> &T {
        self.access_count += 1;
        &self.value
    }
}

/// Generic TTL + LRU cache. Used by the retrieval crate to memoize
/// embedding lookups and other per-request work that would otherwise repeat
/// across pattern steps within a single retrieval.
pub struct LruCache<K, V> {
    cache: DashMap<K, CacheEntry<V>>,
    access_order: Arc<RwLock<VecDeque<K>>>,
    max_size: usize,
    default_ttl: Duration,
}

impl<K, V> LruCache<K, V>
where
    K: Clone + Eq + std::hash::Hash,
    V: Clone,
{
    pub fn new(max_size: usize, default_ttl: Duration) -> Self {
        Self {
            cache: DashMap::new(),
            access_order: Arc::new(RwLock::new(VecDeque::new())),
            max_size,
            default_ttl,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut entry = self.cache.get_mut(key)?;

        if entry.is_expired() {
            drop(entry);
            self.cache.remove(key);
            return None;
        }

        let value = entry.access().clone();

        let mut access_order = self.access_order.write();
        if let Some(pos) = access_order.iter().position(|k| k == key) {
            access_order.remove(pos);
        }
        access_order.push_back(key.clone());

        Some(value)
    }

    pub fn insert(&self, key: K, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    pub fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) {
        self.ensure_capacity();

        let entry = CacheEntry::new(value, ttl);
        self.cache.insert(key.clone(), entry);

        let mut access_order = self.access_order.write();
        if let Some(pos) = access_order.iter().position(|k| k == &key) {
            access_order.remove(pos);
        }
        access_order.push_back(key);
    }

    pub fn invalidate(&self, key: &K) {
        self.cache.remove(key);
        let mut access_order = self.access_order.write();
        if let Some(pos) = access_order.iter().position(|k| k == key) {
            access_order.remove(pos);
        }
    }

    pub fn clear(&self) {
        self.cache.clear();
        self.access_order.write().clear();
    }

    fn ensure_capacity(&self) {
        while self.cache.len() >= self.max_size {
            let mut access_order = self.access_order.write();
            if let Some(oldest_key) = access_order.pop_front() {
                self.cache.remove(&oldest_key);
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_when_over_capacity() {
        let cache = LruCache::new(3, Duration::from_secs(60));

        cache.insert("key1", "value1");
        cache.insert("key2", "value2");
        cache.insert("key3", "value3");

        assert_eq!(cache.get(&"key1"), Some("value1"));
        assert_eq!(cache.get(&"key2"), Some("value2"));

        cache.insert("key4", "value4");
        assert_eq!(cache.get(&"key3"), None);
        assert_eq!(cache.get(&"key4"), Some("value4"));
    }

    #[test]
    fn expires_entries_past_ttl() {
        let cache = LruCache::new(10, Duration::from_millis(10));

        cache.insert("key1", "value1");
        assert_eq!(cache.get(&"key1"), Some("value1"));

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get(&"key1"), None);
    }
}
