//! Persisted cache layout for a collection.
//!
//! A collection is two keys: the entry list and its `Metadata`. This module
//! owns their shapes, the checksum over the entry list, and helpers to read
//! them back and stage them into a transaction.
//!
//! Reads here go straight to the store (the coordinator's fast path); writes
//! always go through `crate::transaction`.

pub mod checksum;
pub mod entry;
pub mod keys;
pub mod metadata;

pub use checksum::{checksum, checksum_entries, checksum_values};
pub use entry::Entry;
pub use keys::{journal_prefix, CollectionKeys, DEFAULT_NAMESPACE};
pub use metadata::{Integrity, Metadata};

use serde::Serialize;
use thiserror::Error;

use crate::store::{KeyValueStore, StoreError};
use crate::transaction::{Transaction, TransactionError};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Corrupt cache data in {key}: {source}")]
    Corrupt {
        key: String,
        source: serde_json::Error,
    },
}

/// Raw persisted values of a collection, exactly as stored.
#[derive(Debug, Clone, Default)]
pub struct RawCollection {
    pub entries: Option<String>,
    pub metadata: Option<String>,
}

impl RawCollection {
    pub fn is_pristine(&self) -> bool {
        self.entries.is_none() && self.metadata.is_none()
    }
}

pub async fn load_raw(
    store: &dyn KeyValueStore,
    keys: &CollectionKeys,
) -> Result<RawCollection, StoreError> {
    let mut values = store.multi_get(&keys.cache_keys()).await?.into_iter();
    let entries = values.next().and_then(|(_, v)| v);
    let metadata = values.next().and_then(|(_, v)| v);
    Ok(RawCollection { entries, metadata })
}

/// Load and parse the entry list. Absent means empty.
pub async fn load_entries(
    store: &dyn KeyValueStore,
    keys: &CollectionKeys,
) -> Result<Vec<Entry>, CacheError> {
    match store.get(&keys.entries).await? {
        Some(raw) => serde_json::from_str(&raw).map_err(|source| CacheError::Corrupt {
            key: keys.entries.clone(),
            source,
        }),
        None => Ok(Vec::new()),
    }
}

/// Load and parse metadata, `None` if it was never written.
pub async fn load_metadata(
    store: &dyn KeyValueStore,
    keys: &CollectionKeys,
) -> Result<Option<Metadata>, CacheError> {
    match store.get(&keys.metadata).await? {
        Some(raw) => Metadata::from_json(&raw)
            .map(Some)
            .map_err(|source| CacheError::Corrupt {
                key: keys.metadata.clone(),
                source,
            }),
        None => Ok(None),
    }
}

/// Stage a full write of `entries` plus `metadata` with refreshed integrity.
///
/// Count and checksum are always derived from `entries` here, so every
/// writer keeps the metadata invariants without computing them itself.
/// `entries` may be typed `Entry`s or raw JSON values being repaired.
pub async fn stage_collection<T: Serialize + Sync>(
    txn: &mut Transaction,
    keys: &CollectionKeys,
    entries: &[T],
    mut metadata: Metadata,
    now_ms: i64,
) -> Result<Metadata, TransactionError> {
    let serialized = serde_json::to_string(entries)?;
    metadata.refresh_integrity(entries.len(), checksum_entries(entries)?, now_ms);
    txn.multi_set(vec![
        (keys.entries.clone(), serialized),
        (keys.metadata.clone(), metadata.to_json()?),
    ])
    .await?;
    Ok(metadata)
}
