use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{IssueKind, Severity, ValidationIssue, ValidationReport};
use crate::cache::{checksum_values, load_raw, CollectionKeys, Entry, Metadata};
use crate::clock::Clock;
use crate::config::{CollectionConfig, EngineConfig};
use crate::store::{KeyValueStore, StoreError};

/// Read-only inspector for one collection.
pub struct CacheValidator {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    keys: CollectionKeys,
    schema_version: u32,
    future_tolerance: Duration,
    stale_after: Duration,
}

impl CacheValidator {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        collection: &CollectionConfig,
        engine: &EngineConfig,
    ) -> Self {
        Self {
            store,
            clock,
            keys: collection.keys(&engine.namespace),
            schema_version: collection.schema_version,
            future_tolerance: engine.future_tolerance,
            stale_after: engine.stale_after,
        }
    }

    pub fn keys(&self) -> &CollectionKeys {
        &self.keys
    }

    /// Cheap pre-flight check, run on cold start and before trusting a read.
    ///
    /// Only looks at metadata: present, parseable, right schema version, and a
    /// sync timestamp that is not implausibly far in the future. A collection
    /// that has never been written is healthy.
    pub async fn quick_health_check(&self) -> bool {
        let raw = match load_raw(self.store.as_ref(), &self.keys).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(collection = %self.keys.collection, error = %e, "Health check could not read cache");
                return false;
            }
        };
        if raw.is_pristine() {
            return true;
        }

        let Some(metadata) = raw.metadata.as_deref().and_then(|m| Metadata::from_json(m).ok()) else {
            debug!(collection = %self.keys.collection, "Health check: metadata missing or unreadable");
            return false;
        };

        let latest_plausible = self.clock.now_millis() + self.future_tolerance.num_milliseconds();
        let healthy = metadata.schema_version == self.schema_version
            && metadata.last_sync_timestamp >= 0
            && metadata.last_sync_timestamp <= latest_plausible;
        if !healthy {
            debug!(collection = %self.keys.collection, "Health check failed");
        }
        healthy
    }

    /// Full validation pass over metadata and every entry.
    pub async fn validate_cache(&self) -> Result<ValidationReport, StoreError> {
        let raw = load_raw(self.store.as_ref(), &self.keys).await?;
        let now = self.clock.now_millis();
        let mut issues = Vec::new();

        let metadata = self.check_metadata(&raw.metadata, raw.entries.is_some(), now, &mut issues);

        let mut entries_checked = 0;
        let mut corrupted = 0;
        let mut duplicates = 0;

        let values: Option<Vec<Value>> = match raw.entries.as_deref() {
            None => Some(Vec::new()),
            Some(text) => match serde_json::from_str::<Vec<Value>>(text) {
                Ok(values) => Some(values),
                Err(e) => {
                    entries_checked += 1;
                    corrupted += 1;
                    issues.push(
                        ValidationIssue::new(
                            IssueKind::CorruptedData,
                            Severity::Critical,
                            "Entry list is unreadable",
                        )
                        .with_details(json!({ "scope": "collection", "error": e.to_string() })),
                    );
                    None
                }
            },
        };

        if let Some(values) = &values {
            let mut seen = HashSet::new();
            let mut duplicate_ids = Vec::new();
            for (index, value) in values.iter().enumerate() {
                entries_checked += 1;
                match Entry::from_raw(value) {
                    Ok(entry) => {
                        if !seen.insert(entry.id.clone()) {
                            duplicates += 1;
                            duplicate_ids.push(entry.id);
                        }
                    }
                    Err(reason) => {
                        corrupted += 1;
                        issues.push(
                            ValidationIssue::new(
                                IssueKind::CorruptedData,
                                Severity::Critical,
                                format!("Entry at index {} is invalid: {}", index, reason),
                            )
                            .with_details(json!({ "index": index, "reason": reason })),
                        );
                    }
                }
            }

            if duplicates > 0 {
                issues.push(
                    ValidationIssue::new(
                        IssueKind::DuplicateEntry,
                        Severity::Warning,
                        format!("{} duplicate entries", duplicates),
                    )
                    .with_details(json!({ "ids": duplicate_ids })),
                );
            }

            if let Some(metadata) = &metadata {
                self.check_count(metadata, raw.entries.is_none(), values.len(), &mut issues);
                self.check_checksum(metadata, values, &mut issues)?;
            }
        }

        let report = ValidationReport::new(issues, entries_checked, corrupted, duplicates);
        debug!(
            collection = %self.keys.collection,
            valid = report.is_valid,
            issues = report.issues.len(),
            entries = entries_checked,
            "Validation complete"
        );
        Ok(report)
    }

    fn check_metadata(
        &self,
        raw: &Option<String>,
        has_entries: bool,
        now: i64,
        issues: &mut Vec<ValidationIssue>,
    ) -> Option<Metadata> {
        let metadata = match raw.as_deref() {
            None => {
                if has_entries {
                    issues.push(ValidationIssue::new(
                        IssueKind::MetadataMismatch,
                        Severity::Critical,
                        "Metadata missing for persisted entries",
                    ));
                }
                return None;
            }
            Some(text) => match Metadata::from_json(text) {
                Ok(metadata) => metadata,
                Err(e) => {
                    issues.push(
                        ValidationIssue::new(
                            IssueKind::MetadataMismatch,
                            Severity::Critical,
                            "Metadata is unreadable",
                        )
                        .with_details(json!({ "error": e.to_string() })),
                    );
                    return None;
                }
            },
        };

        if metadata.schema_version != self.schema_version {
            issues.push(
                ValidationIssue::new(
                    IssueKind::VersionMismatch,
                    Severity::Critical,
                    format!(
                        "Schema version {} does not match expected {}",
                        metadata.schema_version, self.schema_version
                    ),
                )
                .with_details(json!({
                    "found": metadata.schema_version,
                    "expected": self.schema_version,
                })),
            );
        }

        let last_sync = metadata.last_sync_timestamp;
        if last_sync < 0 || last_sync > now + self.future_tolerance.num_milliseconds() {
            issues.push(
                ValidationIssue::new(
                    IssueKind::MetadataMismatch,
                    Severity::Warning,
                    "Last sync timestamp is implausible",
                )
                .with_details(json!({ "lastSyncTimestamp": last_sync, "now": now })),
            );
        } else if last_sync > 0 && now - last_sync > self.stale_after.num_milliseconds() {
            issues.push(
                ValidationIssue::new(
                    IssueKind::MetadataMismatch,
                    Severity::Info,
                    "Cache has not synced in a long time",
                )
                .with_details(json!({ "lastSyncTimestamp": last_sync })),
            );
        }

        Some(metadata)
    }

    fn check_count(
        &self,
        metadata: &Metadata,
        entries_absent: bool,
        actual: usize,
        issues: &mut Vec<ValidationIssue>,
    ) {
        if entries_absent && metadata.total_count > 0 {
            issues.push(
                ValidationIssue::new(
                    IssueKind::MissingEntry,
                    Severity::Critical,
                    format!("Metadata records {} entries but none are stored", metadata.total_count),
                )
                .with_details(json!({ "expected": metadata.total_count })),
            );
        } else if metadata.total_count != actual {
            issues.push(
                ValidationIssue::new(
                    IssueKind::MetadataMismatch,
                    Severity::Critical,
                    format!(
                        "Metadata count {} does not match {} stored entries",
                        metadata.total_count, actual
                    ),
                )
                .with_details(json!({ "expected": metadata.total_count, "actual": actual })),
            );
        }
    }

    fn check_checksum(
        &self,
        metadata: &Metadata,
        values: &[Value],
        issues: &mut Vec<ValidationIssue>,
    ) -> Result<(), StoreError> {
        match &metadata.integrity.checksum {
            None => issues.push(ValidationIssue::new(
                IssueKind::ChecksumMismatch,
                Severity::Info,
                "No checksum recorded",
            )),
            Some(stored) => {
                let actual = checksum_values(values)?;
                if *stored != actual {
                    issues.push(
                        ValidationIssue::new(
                            IssueKind::ChecksumMismatch,
                            Severity::Critical,
                            "Checksum does not match stored entries",
                        )
                        .with_details(json!({ "expected": stored, "actual": actual })),
                    );
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::checksum_entries;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use chrono::DateTime;

    const NOW: i64 = 1_700_000_000_000;

    fn entry(id: &str, recency: i64) -> Entry {
        Entry {
            id: id.to_string(),
            owner_id: "user-1".to_string(),
            recency,
            payload: json!({ "id": id }),
            cached_at: NOW,
        }
    }

    fn metadata_for(entries: &[Entry]) -> Metadata {
        let mut meta = Metadata::new(1).with_owner(Some("user-1".into()));
        meta.last_sync_timestamp = NOW - 1000;
        meta.refresh_integrity(entries.len(), checksum_entries(entries).unwrap(), NOW);
        meta
    }

    async fn setup(entries: Option<&str>, metadata: Option<String>) -> CacheValidator {
        let store = Arc::new(MemoryStore::new());
        if let Some(raw) = entries {
            store.set("t:videos:entries", raw).await.unwrap();
        }
        if let Some(raw) = metadata {
            store.set("t:videos:metadata", &raw).await.unwrap();
        }
        let clock = Arc::new(ManualClock::new(DateTime::from_timestamp_millis(NOW).unwrap()));
        CacheValidator::new(
            store,
            clock,
            &CollectionConfig::videos(),
            &EngineConfig::new("t"),
        )
    }

    #[tokio::test]
    async fn test_pristine_cache_is_healthy_and_valid() {
        let validator = setup(None, None).await;
        assert!(validator.quick_health_check().await);
        let report = validator.validate_cache().await.unwrap();
        assert!(report.is_valid);
        assert!(report.issues.is_empty());
        assert_eq!(report.metrics.metadata_accuracy, 1.0);
    }

    #[tokio::test]
    async fn test_consistent_cache_has_no_issues() {
        let entries = vec![entry("a", 2), entry("b", 1)];
        let raw = serde_json::to_string(&entries).unwrap();
        let validator = setup(Some(&raw), Some(metadata_for(&entries).to_json().unwrap())).await;

        assert!(validator.quick_health_check().await);
        let report = validator.validate_cache().await.unwrap();
        assert!(report.issues.is_empty(), "{:?}", report.issues);
        assert_eq!(report.metrics.entries_checked, 2);
    }

    #[tokio::test]
    async fn test_duplicates_are_a_warning() {
        let entries = vec![entry("a", 2), entry("a", 3), entry("b", 1)];
        let raw = serde_json::to_string(&entries).unwrap();
        let validator = setup(Some(&raw), Some(metadata_for(&entries).to_json().unwrap())).await;

        let report = validator.validate_cache().await.unwrap();
        assert!(report.is_valid);
        assert_eq!(report.metrics.duplicate_entries, 1);
        let dup = report.issues_of(IssueKind::DuplicateEntry).next().unwrap();
        assert_eq!(dup.severity, Severity::Warning);
        assert_eq!(dup.details["ids"], json!(["a"]));
    }

    #[tokio::test]
    async fn test_count_and_checksum_mismatch_are_critical() {
        let entries = vec![entry("a", 2), entry("b", 1)];
        let mut meta = metadata_for(&entries);
        meta.total_count = 5;
        meta.integrity.checksum = Some("0000000000000000".into());
        let raw = serde_json::to_string(&entries).unwrap();
        let validator = setup(Some(&raw), Some(meta.to_json().unwrap())).await;

        let report = validator.validate_cache().await.unwrap();
        assert!(!report.is_valid);
        assert_eq!(report.critical_count(), 2);
        assert_eq!(report.issues_of(IssueKind::MetadataMismatch).count(), 1);
        assert_eq!(report.issues_of(IssueKind::ChecksumMismatch).count(), 1);
    }

    #[tokio::test]
    async fn test_version_mismatch_fails_health_check() {
        let mut meta = metadata_for(&[]);
        meta.schema_version = 99;
        let validator = setup(Some("[]"), Some(meta.to_json().unwrap())).await;

        assert!(!validator.quick_health_check().await);
        let report = validator.validate_cache().await.unwrap();
        let issue = report.issues_of(IssueKind::VersionMismatch).next().unwrap();
        assert!(issue.is_critical());
    }

    #[tokio::test]
    async fn test_future_and_stale_timestamps() {
        let mut meta = metadata_for(&[]);
        meta.last_sync_timestamp = NOW + Duration::hours(1).num_milliseconds();
        let validator = setup(Some("[]"), Some(meta.to_json().unwrap())).await;
        assert!(!validator.quick_health_check().await);
        let report = validator.validate_cache().await.unwrap();
        assert!(report.is_valid);
        assert_eq!(report.issues[0].severity, Severity::Warning);

        let mut meta = metadata_for(&[]);
        meta.last_sync_timestamp = NOW - Duration::days(45).num_milliseconds();
        let validator = setup(Some("[]"), Some(meta.to_json().unwrap())).await;
        assert!(validator.quick_health_check().await);
        let report = validator.validate_cache().await.unwrap();
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].severity, Severity::Info);
    }

    #[tokio::test]
    async fn test_unreadable_entry_list_and_missing_metadata() {
        let validator = setup(Some("{not json"), None).await;
        assert!(!validator.quick_health_check().await);

        let report = validator.validate_cache().await.unwrap();
        assert_eq!(report.metrics.corrupted_entries, 1);
        assert_eq!(report.metrics.corrupted_ratio(), 1.0);
        assert_eq!(report.issues_of(IssueKind::CorruptedData).count(), 1);
        assert_eq!(report.issues_of(IssueKind::MetadataMismatch).count(), 1);
    }

    #[tokio::test]
    async fn test_missing_entries_with_nonzero_count() {
        let entries = vec![entry("a", 1)];
        let validator = setup(None, Some(metadata_for(&entries).to_json().unwrap())).await;
        let report = validator.validate_cache().await.unwrap();
        let issue = report.issues_of(IssueKind::MissingEntry).next().unwrap();
        assert!(issue.is_critical());
        assert_eq!(report.issues_of(IssueKind::MetadataMismatch).count(), 0);
    }
}
