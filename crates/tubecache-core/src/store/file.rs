//! File-per-key store backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::debug;

use super::{KeyValueStore, StoreError, StoreResult};

/// Extension for value files. Values are opaque strings; in practice they are JSON.
const VALUE_EXTENSION: &str = "json";

/// Extension for in-progress writes, renamed into place once fully written.
const TEMP_EXTENSION: &str = "tmp";

/// A `KeyValueStore` that keeps each key in its own file under `cache_dir`.
///
/// Keys are percent-encoded into file names so any key is representable and
/// `list_keys` can decode them back. Each `set` writes a temp file and renames
/// it over the destination, which makes single-key writes atomic on the
/// platforms we ship to.
pub struct FileStore {
    cache_dir: PathBuf,
}

impl FileStore {
    pub fn new(cache_dir: PathBuf) -> StoreResult<Self> {
        std::fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn value_path(&self, key: &str) -> StoreResult<PathBuf> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey("empty key".to_string()));
        }
        Ok(self
            .cache_dir
            .join(format!("{}.{}", encode_key(key), VALUE_EXTENSION)))
    }
}

/// Encode a key into a file-name-safe string.
fn encode_key(key: &str) -> String {
    urlencoding::encode(key).into_owned()
}

/// Reverse of `encode_key`.
fn decode_key(encoded: &str) -> StoreResult<String> {
    urlencoding::decode(encoded)
        .map(|key| key.into_owned())
        .map_err(|e| StoreError::Corrupt(format!("undecodable file name {}: {}", encoded, e)))
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.value_path(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let path = self.value_path(key)?;
        let temp_path = path.with_extension(TEMP_EXTENSION);
        tokio::fs::write(&temp_path, value).await?;
        tokio::fs::rename(&temp_path, &path).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        let path = self.value_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn multi_get(&self, keys: &[String]) -> StoreResult<Vec<(String, Option<String>)>> {
        let reads = keys.iter().map(|key| async move {
            let value = self.get(key).await?;
            Ok::<_, StoreError>((key.clone(), value))
        });
        try_join_all(reads).await
    }

    async fn list_keys(&self) -> StoreResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.cache_dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(VALUE_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                debug!(file = %path.display(), "Skipping non-UTF-8 file in cache dir");
                continue;
            };
            keys.push(decode_key(stem)?);
        }
        keys.sort();
        Ok(keys)
    }
}
