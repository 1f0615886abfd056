//! In-memory store backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{KeyValueStore, StoreResult};

/// A `KeyValueStore` backed by an ordered in-process map.
///
/// Suitable for unit tests and for caches that do not need to outlive the
/// process. Batch operations apply under one lock, so unlike most real
/// backends they never half-apply.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given pairs.
    #[must_use]
    pub fn with_data<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let data = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            data: RwLock::new(data),
        }
    }

    /// Copy of the full contents, for assertions.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.data.read().clone()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.data.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.data.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.data.write().remove(key);
        Ok(())
    }

    async fn multi_set(&self, pairs: &[(String, String)]) -> StoreResult<()> {
        let mut data = self.data.write();
        for (key, value) in pairs {
            data.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn multi_remove(&self, keys: &[String]) -> StoreResult<()> {
        let mut data = self.data.write();
        for key in keys {
            data.remove(key);
        }
        Ok(())
    }

    async fn list_keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.data.read().keys().cloned().collect())
    }
}
