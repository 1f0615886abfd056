use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Malformed record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid record {id:?}: {reason}")]
    Invalid { id: String, reason: String },
}

/// A server-owned record that can be cached.
///
/// Remote APIs hand back loosely-typed JSON; `from_remote` is the single
/// place where it is turned into a typed record, so nothing malformed reaches
/// the merge step.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Stable id, unique within the collection.
    fn id(&self) -> &str;

    /// Id of the collection that owns this record on the server (e.g. the channel).
    fn parent_id(&self) -> &str;

    /// Recency used for merge precedence and eviction order.
    fn recency(&self) -> DateTime<Utc>;

    /// Semantic checks beyond what deserialization enforces.
    fn check(&self) -> Result<(), RecordError> {
        if self.id().trim().is_empty() {
            return Err(RecordError::Invalid {
                id: self.id().to_string(),
                reason: "empty id".to_string(),
            });
        }
        if self.parent_id().trim().is_empty() {
            return Err(RecordError::Invalid {
                id: self.id().to_string(),
                reason: "empty parent id".to_string(),
            });
        }
        Ok(())
    }

    fn from_remote(raw: Value) -> Result<Self, RecordError> {
        let record: Self = serde_json::from_value(raw)?;
        record.check()?;
        Ok(record)
    }
}
