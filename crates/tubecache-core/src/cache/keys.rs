//! Persisted key namespace.
//!
//! Key layout is stable across versions:
//! - `{ns}:{collection}:entries`
//! - `{ns}:{collection}:metadata`
//! - `{ns}:txn:{id}` (one journal entry per in-flight transaction)
//! - `{ns}:backup:{collection}:{timestamp_ms}`

/// Default key namespace.
pub const DEFAULT_NAMESPACE: &str = "tubecache";

/// Prefix under which transaction journal entries live.
pub fn journal_prefix(namespace: &str) -> String {
    format!("{}:txn:", namespace)
}

/// The keys belonging to one cached collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionKeys {
    pub collection: String,
    pub entries: String,
    pub metadata: String,
    pub backup_prefix: String,
}

impl CollectionKeys {
    pub fn new(namespace: &str, collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            entries: format!("{}:{}:entries", namespace, collection),
            metadata: format!("{}:{}:metadata", namespace, collection),
            backup_prefix: format!("{}:backup:{}:", namespace, collection),
        }
    }

    /// Keys that make up the collection's cached state (not backups).
    pub fn cache_keys(&self) -> Vec<String> {
        vec![self.entries.clone(), self.metadata.clone()]
    }

    pub fn backup_key(&self, timestamp_ms: i64) -> String {
        format!("{}{}", self.backup_prefix, timestamp_ms)
    }

    /// Parse the timestamp out of a backup key of this collection.
    pub fn backup_timestamp(&self, key: &str) -> Option<i64> {
        key.strip_prefix(&self.backup_prefix)?.parse().ok()
    }
}
