use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt store data: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Async string key-value storage with per-key atomicity only.
///
/// Batch operations (`multi_*`) are a convenience: an implementation may
/// apply them key by key, so a failure can leave a batch half-applied.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a key, `None` when absent.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove a key. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> StoreResult<()>;

    /// Read several keys, preserving the order of `keys`.
    async fn multi_get(&self, keys: &[String]) -> StoreResult<Vec<(String, Option<String>)>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push((key.clone(), self.get(key).await?));
        }
        Ok(values)
    }

    async fn multi_set(&self, pairs: &[(String, String)]) -> StoreResult<()> {
        for (key, value) in pairs {
            self.set(key, value).await?;
        }
        Ok(())
    }

    async fn multi_remove(&self, keys: &[String]) -> StoreResult<()> {
        for key in keys {
            self.remove(key).await?;
        }
        Ok(())
    }

    /// List every key currently present.
    async fn list_keys(&self) -> StoreResult<Vec<String>>;
}
