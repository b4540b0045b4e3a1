//! In-process cache for single-entity reads.
//!
//! Keys are namespaced by a prefix (`contact_`, `deal_`) and entries expire
//! after the configured TTL. Writers invalidate by deleting the prefixed key.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

pub struct SimpleCache<V> {
    prefix: String,
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V: Clone> SimpleCache<V> {
    pub fn new(prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            prefix: prefix.into(),
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let cache_key = self.make_key(key);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(&cache_key) {
            Some(entry) if entry.stored_at.elapsed() <= self.ttl => {
                log::debug!("Cache hit: {cache_key}");
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(&cache_key);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, key: &str, value: V) {
        let cache_key = self.make_key(key);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.stored_at.elapsed() <= ttl);
        entries.insert(
            cache_key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn delete(&self, key: &str) {
        let cache_key = self.make_key(key);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&cache_key);
    }

    /// Deletes the single key `prefix + pattern`; no wildcard expansion.
    pub fn clear_pattern(&self, pattern: &str) {
        self.delete(pattern);
    }

    /// Returns the cached value or stores the result of `fetch`.
    ///
    /// `None` results and errors are not cached.
    pub fn get_or_fetch<E>(
        &self,
        key: &str,
        fetch: impl FnOnce() -> Result<Option<V>, E>,
    ) -> Result<Option<V>, E> {
        if let Some(hit) = self.get(key) {
            return Ok(Some(hit));
        }
        let fetched = fetch()?;
        if let Some(value) = &fetched {
            self.set(key, value.clone());
        }
        Ok(fetched)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Round-trips a probe value; used by the health check.
    pub fn probe(&self, value: V) -> bool
    where
        V: PartialEq,
    {
        let key = "__health_probe__";
        self.set(key, value.clone());
        let ok = self.get(key).is_some_and(|cached| cached == value);
        self.delete(key);
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_delete() {
        let cache = SimpleCache::new("contact_", Duration::from_secs(60));
        cache.set("1", "Ada".to_string());
        assert_eq!(cache.get("1").as_deref(), Some("Ada"));
        assert_eq!(cache.get("2"), None);
        cache.clear_pattern("1");
        assert_eq!(cache.get("1"), None);
    }

    #[test]
    fn entries_expire() {
        let cache = SimpleCache::new("deal_", Duration::from_millis(0));
        cache.set("1", 10);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("1"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn get_or_fetch_caches_hits_only() {
        let cache = SimpleCache::new("deal_", Duration::from_secs(60));
        let mut calls = 0;
        let first: Result<Option<i32>, ()> = cache.get_or_fetch("7", || {
            calls += 1;
            Ok(Some(7))
        });
        assert_eq!(first, Ok(Some(7)));
        let second: Result<Option<i32>, ()> = cache.get_or_fetch("7", || {
            calls += 1;
            Ok(Some(8))
        });
        assert_eq!(second, Ok(Some(7)));
        assert_eq!(calls, 1);

        let missing: Result<Option<i32>, ()> = cache.get_or_fetch("9", || Ok(None));
        assert_eq!(missing, Ok(None));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn probe_round_trips() {
        let cache = SimpleCache::new("health_", Duration::from_secs(1));
        assert!(cache.probe(1u8));
        assert!(cache.is_empty());
    }
}
