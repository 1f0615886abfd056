use serde::{Deserialize, Serialize};

/// Integrity bookkeeping for a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Integrity {
    /// Checksum of the persisted entry list, `None` until first computed.
    pub checksum: Option<String>,
    /// When the checksum was last (re)computed, epoch milliseconds.
    #[serde(rename = "lastValidated")]
    pub last_validated: i64,
}

/// Per-collection bookkeeping record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Last successful sync, epoch milliseconds. `0` means never synced.
    #[serde(rename = "lastSyncTimestamp")]
    pub last_sync_timestamp: i64,
    #[serde(rename = "totalCount")]
    pub total_count: usize,
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    #[serde(rename = "ownerId")]
    pub owner_id: Option<String>,
    pub integrity: Integrity,
    /// Server cursor for the next "load more" page.
    #[serde(rename = "nextCursor", default)]
    pub next_cursor: Option<String>,
    /// False once the server reported there are no further pages.
    #[serde(rename = "hasMore", default = "default_has_more")]
    pub has_more: bool,
}

fn default_has_more() -> bool {
    true
}

impl Metadata {
    /// Defaults for a collection that has never been written.
    pub fn new(schema_version: u32) -> Self {
        Self {
            last_sync_timestamp: 0,
            total_count: 0,
            schema_version,
            owner_id: None,
            integrity: Integrity::default(),
            next_cursor: None,
            has_more: true,
        }
    }

    pub fn with_owner(mut self, owner_id: Option<String>) -> Self {
        self.owner_id = owner_id;
        self
    }

    /// Record a freshly written entry list: count, checksum and validation time.
    pub fn refresh_integrity(&mut self, total_count: usize, checksum: String, now_ms: i64) {
        self.total_count = total_count;
        self.integrity.checksum = Some(checksum);
        self.integrity.last_validated = now_ms;
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_defaults() {
        let meta = Metadata::new(3);
        assert_eq!(meta.last_sync_timestamp, 0);
        assert_eq!(meta.total_count, 0);
        assert_eq!(meta.schema_version, 3);
        assert!(meta.has_more);
        assert_eq!(meta.integrity.checksum, None);
    }

    #[test]
    fn test_metadata_json_field_names() {
        let mut meta = Metadata::new(1).with_owner(Some("user-1".into()));
        meta.refresh_integrity(2, "abc".into(), 99);
        let json = meta.to_json().unwrap();
        assert!(json.contains("\"lastSyncTimestamp\":0"));
        assert!(json.contains("\"ownerId\":\"user-1\""));
        assert!(json.contains("\"lastValidated\":99"));
        assert_eq!(Metadata::from_json(&json).unwrap(), meta);
    }

    #[test]
    fn test_metadata_pagination_fields_default_when_absent() {
        let raw = r#"{"lastSyncTimestamp":5,"totalCount":0,"schemaVersion":1,"ownerId":null,
            "integrity":{"checksum":null,"lastValidated":0}}"#;
        let meta = Metadata::from_json(raw).unwrap();
        assert_eq!(meta.next_cursor, None);
        assert!(meta.has_more);
    }
}
