use std::collections::HashMap;
use std::time::{Duration, Instant};

/// bounded key/value cache with a fixed time-to-live, owned by the caller
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: HashMap<String, Entry<V>>,
    capacity: usize,
    ttl: Duration,
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    inserted: Instant,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub fn get(&mut self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&mut self, key: &str, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get_at(&mut self, key: &str, now: Instant) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) => now.duration_since(entry.inserted) >= self.ttl,
            None => return None,
        };
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|e| e.value.clone())
    }

    fn insert_at(&mut self, key: &str, value: V, now: Instant) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, e| now.duration_since(e.inserted) < ttl);

        if !self.entries.contains_key(key) && self.entries.len() >= self.capacity {
            // evict the oldest entry
            if let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.inserted)
                .map(|(k, _)| k.clone())
            {
                self.entries.remove(&oldest);
            }
        }

        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                inserted: now,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_fresh_values() {
        let mut cache = TtlCache::new(4, Duration::from_secs(60));
        cache.insert("a", 1);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn expires_after_ttl() {
        let mut cache = TtlCache::new(4, Duration::from_secs(10));
        let t0 = Instant::now();
        cache.insert_at("a", 1, t0);
        assert_eq!(cache.get_at("a", t0 + Duration::from_secs(9)), Some(1));
        assert_eq!(cache.get_at("a", t0 + Duration::from_secs(10)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut cache = TtlCache::new(2, Duration::from_secs(60));
        let t0 = Instant::now();
        cache.insert_at("a", 1, t0);
        cache.insert_at("b", 2, t0 + Duration::from_secs(1));
        cache.insert_at("c", 3, t0 + Duration::from_secs(2));
        let now = t0 + Duration::from_secs(3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_at("a", now), None);
        assert_eq!(cache.get_at("c", now), Some(3));
    }

    #[test]
    fn overwriting_a_key_does_not_evict() {
        let mut cache = TtlCache::new(2, Duration::from_secs(60));
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("a", 3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.get("a"), Some(3));
    }
}
