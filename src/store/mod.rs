//! In-memory session store.
//!
//! Chains and debate sessions are ephemeral: they live in a process-wide
//! map and are lost on process exit. Unlike the unbounded map this replaces,
//! the store carries an explicit TTL and capacity; expired entries are
//! pruned on insert and the least-recently-touched entry is evicted when the
//! store is full.
//!
//! There is deliberately no per-entry mutex: all mutation happens on the
//! single control-flow task between awaited model calls, so callers clone an
//! entry out, mutate it, and write it back with [`SessionStore::update`].
//! Concurrent callers mutating the same id race on the write-back.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::StoreConfig;

struct Entry<T> {
    value: T,
    touched: Instant,
}

/// TTL- and capacity-bounded map from session/chain id to session object.
pub struct SessionStore<T> {
    inner: RwLock<HashMap<String, Entry<T>>>,
    ttl: Option<Duration>,
    capacity: usize,
}

impl<T: Clone> SessionStore<T> {
    /// Create a store from configured limits.
    pub fn new(config: &StoreConfig) -> Self {
        let ttl = if config.ttl_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(config.ttl_secs))
        };
        Self {
            inner: RwLock::new(HashMap::new()),
            ttl,
            capacity: config.capacity.max(1),
        }
    }

    /// Insert a value, pruning expired entries and evicting the
    /// least-recently-touched entry if the store is full.
    pub fn insert(&self, id: impl Into<String>, value: T) {
        let id = id.into();
        let mut inner = self.inner.write().unwrap();

        if let Some(ttl) = self.ttl {
            let before = inner.len();
            inner.retain(|_, e| e.touched.elapsed() < ttl);
            let pruned = before - inner.len();
            if pruned > 0 {
                debug!(pruned, "Pruned expired sessions");
            }
        }

        if inner.len() >= self.capacity && !inner.contains_key(&id) {
            if let Some(oldest) = inner
                .iter()
                .min_by_key(|(_, e)| e.touched)
                .map(|(k, _)| k.clone())
            {
                warn!(evicted = %oldest, capacity = self.capacity, "Session store full, evicting");
                inner.remove(&oldest);
            }
        }

        inner.insert(
            id,
            Entry {
                value,
                touched: Instant::now(),
            },
        );
    }

    /// Clone out a value by id, refreshing its TTL clock.
    pub fn get(&self, id: &str) -> Option<T> {
        let mut inner = self.inner.write().unwrap();
        inner.get_mut(id).map(|e| {
            e.touched = Instant::now();
            e.value.clone()
        })
    }

    /// Mutate a value in place. Returns false if the id is absent.
    pub fn update<F>(&self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut T),
    {
        let mut inner = self.inner.write().unwrap();
        match inner.get_mut(id) {
            Some(e) => {
                f(&mut e.value);
                e.touched = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Remove a value by id.
    pub fn remove(&self, id: &str) -> Option<T> {
        self.inner.write().unwrap().remove(id).map(|e| e.value)
    }

    /// Snapshot of all stored values.
    pub fn values(&self) -> Vec<T> {
        self.inner
            .read()
            .unwrap()
            .values()
            .map(|e| e.value.clone())
            .collect()
    }

    /// All stored ids.
    pub fn ids(&self) -> Vec<String> {
        self.inner.read().unwrap().keys().cloned().collect()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().is_empty()
    }

    /// Drop every entry (explicit shutdown path).
    pub fn clear(&self) {
        self.inner.write().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unlimited() -> StoreConfig {
        StoreConfig {
            ttl_secs: 0,
            capacity: 256,
        }
    }

    #[test]
    fn test_insert_get_update_remove() {
        let store: SessionStore<String> = SessionStore::new(&unlimited());
        store.insert("a", "one".to_string());
        assert_eq!(store.get("a"), Some("one".to_string()));

        assert!(store.update("a", |v| v.push_str("-more")));
        assert_eq!(store.get("a"), Some("one-more".to_string()));

        assert!(!store.update("missing", |_| {}));
        assert_eq!(store.remove("a"), Some("one-more".to_string()));
        assert!(store.get("a").is_none());
    }

    #[test]
    fn test_capacity_evicts_least_recently_touched() {
        let store: SessionStore<u32> = SessionStore::new(&StoreConfig {
            ttl_secs: 0,
            capacity: 2,
        });
        store.insert("a", 1);
        store.insert("b", 2);
        // Touch "a" so "b" becomes the eviction candidate
        let _ = store.get("a");
        store.insert("c", 3);

        assert_eq!(store.len(), 2);
        assert!(store.get("a").is_some());
        assert!(store.get("b").is_none());
        assert!(store.get("c").is_some());
    }

    #[test]
    fn test_reinsert_same_id_does_not_evict() {
        let store: SessionStore<u32> = SessionStore::new(&StoreConfig {
            ttl_secs: 0,
            capacity: 2,
        });
        store.insert("a", 1);
        store.insert("b", 2);
        store.insert("a", 10);

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a"), Some(10));
        assert_eq!(store.get("b"), Some(2));
    }

    #[test]
    fn test_clear_and_ids() {
        let store: SessionStore<u32> = SessionStore::new(&unlimited());
        store.insert("x", 1);
        store.insert("y", 2);
        let mut ids = store.ids();
        ids.sort();
        assert_eq!(ids, vec!["x".to_string(), "y".to_string()]);

        store.clear();
        assert!(store.is_empty());
    }
}
