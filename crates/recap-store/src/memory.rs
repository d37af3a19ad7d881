//! In-process [`KeyValueStore`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::errors::Result;
use crate::kv::KeyValueStore;

/// Hash-map backed store.
///
/// Counts reads and writes so tests can assert how often a component
/// touched the store.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
    get_count: AtomicU64,
    set_count: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every entry.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.entries.read().clone()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Number of `get` calls served.
    pub fn get_count(&self) -> u64 {
        self.get_count.load(Ordering::Relaxed)
    }

    /// Number of `set` calls applied.
    pub fn set_count(&self) -> u64 {
        self.set_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, keys: &[String]) -> Result<Map<String, Value>> {
        let _ = self.get_count.fetch_add(1, Ordering::Relaxed);
        let entries = self.entries.read();
        Ok(keys
            .iter()
            .filter_map(|k| entries.get(k).map(|v| (k.clone(), v.clone())))
            .collect())
    }

    async fn set(&self, entries: Map<String, Value>) -> Result<()> {
        let _ = self.set_count.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.entries.write();
        for (k, v) in entries {
            let _ = guard.insert(k, v);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn get_returns_only_present_keys() {
        let store = MemoryStore::new();
        store.set(entries(&[("a", json!(1))])).await.unwrap();
        let got = store.get(&["a".into(), "b".into()]).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got["a"], 1);
    }

    #[tokio::test]
    async fn set_overwrites() {
        let store = MemoryStore::new();
        store.set(entries(&[("a", json!(1))])).await.unwrap();
        store.set(entries(&[("a", json!(2)), ("b", json!(3))])).await.unwrap();
        assert_eq!(store.snapshot()["a"], 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.set_count(), 2);
    }
}
