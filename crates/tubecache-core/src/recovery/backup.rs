use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::RecoveryError;
use crate::cache::{checksum, RawCollection};

/// A point-in-time copy of a collection's cache keys.
///
/// `None` values record that the key was absent, so restoring reproduces
/// absence too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backup {
    pub timestamp: i64,
    pub collection: String,
    pub snapshot: BTreeMap<String, Option<String>>,
    pub checksum: String,
}

impl Backup {
    pub fn capture(
        timestamp: i64,
        collection: &str,
        entries_key: &str,
        metadata_key: &str,
        raw: RawCollection,
    ) -> Result<Self, serde_json::Error> {
        let mut snapshot = BTreeMap::new();
        snapshot.insert(entries_key.to_string(), raw.entries);
        snapshot.insert(metadata_key.to_string(), raw.metadata);
        let checksum = snapshot_checksum(&snapshot)?;
        Ok(Self {
            timestamp,
            collection: collection.to_string(),
            snapshot,
            checksum,
        })
    }

    /// Fail unless the snapshot still hashes to the recorded checksum.
    pub fn verify(&self) -> Result<(), RecoveryError> {
        let actual = snapshot_checksum(&self.snapshot)?;
        if actual == self.checksum {
            Ok(())
        } else {
            Err(RecoveryError::BackupChecksumMismatch {
                timestamp: self.timestamp,
                expected: self.checksum.clone(),
                actual,
            })
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

fn snapshot_checksum(snapshot: &BTreeMap<String, Option<String>>) -> Result<String, serde_json::Error> {
    Ok(checksum(&serde_json::to_string(snapshot)?))
}

/// A retained backup as listed in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupInfo {
    pub timestamp: i64,
    pub key: String,
}
