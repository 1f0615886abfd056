use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{Record, RecordError};

/// One cached record plus cache bookkeeping.
///
/// The payload is kept as JSON so the storage, validation and recovery layers
/// work on any collection without knowing its record type. `recency` is lifted
/// out of the payload so ordering and eviction never need to decode it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    #[serde(rename = "ownerId")]
    pub owner_id: String,
    /// Record recency, epoch milliseconds.
    pub recency: i64,
    pub payload: Value,
    /// When the entry was written, epoch milliseconds.
    #[serde(rename = "cachedAt")]
    pub cached_at: i64,
}

impl Entry {
    pub fn from_record<R: Record>(
        record: &R,
        owner_id: &str,
        cached_at: i64,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: record.id().to_string(),
            owner_id: owner_id.to_string(),
            recency: record.recency().timestamp_millis(),
            payload: serde_json::to_value(record)?,
            cached_at,
        })
    }

    pub fn decode<R: Record>(&self) -> Result<R, RecordError> {
        let record: R = serde_json::from_value(self.payload.clone())?;
        record.check()?;
        Ok(record)
    }

    /// Check that a raw JSON value is a structurally valid entry.
    ///
    /// Returns the parsed entry, or a human-readable reason it is invalid.
    pub fn from_raw(value: &Value) -> Result<Self, String> {
        let entry: Entry =
            serde_json::from_value(value.clone()).map_err(|e| format!("unreadable entry: {}", e))?;
        if entry.id.trim().is_empty() {
            return Err("empty id".to_string());
        }
        if !entry.payload.is_object() {
            return Err(format!("payload of {} is not an object", entry.id));
        }
        if entry.cached_at <= 0 {
            return Err(format!("entry {} has no cache timestamp", entry.id));
        }
        Ok(entry)
    }
}
