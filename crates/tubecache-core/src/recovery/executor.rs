use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::backup::{Backup, BackupInfo};
use super::plan::{build_plan, ActionKind, RecoveryAction, RecoveryPlan, RiskLevel};
use super::RecoveryError;
use crate::cache::{checksum_values, load_raw, stage_collection, CollectionKeys, Entry, Metadata};
use crate::clock::Clock;
use crate::config::{CollectionConfig, EngineConfig};
use crate::store::KeyValueStore;
use crate::transaction::{Transaction, TransactionError, TransactionManager};
use crate::validation::CacheValidator;

/// Outcome of executing a recovery plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecoveryResult {
    pub success: bool,
    /// Entries left in the collection afterwards.
    #[serde(rename = "recoveredEntries")]
    pub recovered_entries: usize,
    /// Entries dropped by the plan. An unreadable entry list counts as one.
    #[serde(rename = "removedEntries")]
    pub removed_entries: usize,
    #[serde(rename = "actionsApplied")]
    pub actions_applied: Vec<ActionKind>,
    pub errors: Vec<String>,
    /// Backup taken before execution, if any.
    #[serde(rename = "backupTimestamp")]
    pub backup_timestamp: Option<i64>,
}

impl RecoveryResult {
    fn failed(error: String) -> Self {
        Self {
            success: false,
            errors: vec![error],
            ..Default::default()
        }
    }
}

/// What `auto_recover` ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum AutoRecoverOutcome {
    /// Health check passed; nothing was touched.
    Healthy,
    /// The plan was safe to run unattended and it succeeded.
    Repaired(RecoveryResult),
    /// Repair was unsafe or failed; the collection was cleared.
    Wiped { reason: String },
    /// Even the wipe failed. The cache is in an unknown state.
    Degraded { error: String },
}

impl AutoRecoverOutcome {
    /// Whether the cache can be trusted afterwards.
    pub fn is_usable(&self) -> bool {
        !matches!(self, AutoRecoverOutcome::Degraded { .. })
    }
}

/// In-memory view of the collection that plan actions mutate.
#[derive(Clone)]
struct WorkingSet {
    values: Vec<Value>,
    /// False while the persisted entry list could not be parsed.
    readable: bool,
    metadata: Option<Metadata>,
    initial_count: usize,
}

/// Plans and runs repairs for one collection.
pub struct RecoveryManager {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    transactions: Arc<TransactionManager>,
    validator: CacheValidator,
    keys: CollectionKeys,
    schema_version: u32,
    max_backups: usize,
}

impl RecoveryManager {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        transactions: Arc<TransactionManager>,
        collection: &CollectionConfig,
        engine: &EngineConfig,
    ) -> Self {
        Self {
            validator: CacheValidator::new(Arc::clone(&store), Arc::clone(&clock), collection, engine),
            store,
            clock,
            transactions,
            keys: collection.keys(&engine.namespace),
            schema_version: collection.schema_version,
            max_backups: engine.max_backups,
        }
    }

    pub fn validator(&self) -> &CacheValidator {
        &self.validator
    }

    pub fn keys(&self) -> &CollectionKeys {
        &self.keys
    }

    /// Validate the collection and derive a plan from the findings.
    pub async fn create_recovery_plan(&self) -> Result<RecoveryPlan, RecoveryError> {
        let report = self.validator.validate_cache().await?;
        let plan = build_plan(report);
        debug!(
            collection = %self.keys.collection,
            strategy = %plan.strategy,
            risk = %plan.risk,
            actions = plan.actions.len(),
            "Recovery plan created"
        );
        Ok(plan)
    }

    /// Run every action of `plan` inside one transaction.
    ///
    /// Never returns an error: failures are reported through
    /// `RecoveryResult::success` and `errors`, with the store left as it was.
    pub async fn execute_recovery(&self, plan: &RecoveryPlan) -> RecoveryResult {
        if plan.is_empty() {
            return self.noop_result().await;
        }

        let mut backup_timestamp = None;
        if plan.risk != RiskLevel::Low {
            match self.create_backup().await {
                Ok(info) => backup_timestamp = Some(info.timestamp),
                Err(e) => {
                    warn!(collection = %self.keys.collection, error = %e, "Backup failed, not executing recovery");
                    return RecoveryResult::failed(format!("backup failed: {}", e));
                }
            }
        }

        let mut result = match self.run_actions(&plan.actions).await {
            Ok(result) => result,
            Err(e) => RecoveryResult::failed(e.to_string()),
        };
        result.backup_timestamp = backup_timestamp;

        if result.success {
            info!(
                collection = %self.keys.collection,
                recovered = result.recovered_entries,
                removed = result.removed_entries,
                "Recovery complete"
            );
        } else {
            warn!(collection = %self.keys.collection, errors = ?result.errors, "Recovery failed");
        }
        result
    }

    async fn noop_result(&self) -> RecoveryResult {
        let recovered = match self.load_working_set().await {
            Ok(working) => working.values.len(),
            Err(_) => 0,
        };
        RecoveryResult {
            success: true,
            recovered_entries: recovered,
            ..Default::default()
        }
    }

    async fn run_actions(&self, actions: &[RecoveryAction]) -> Result<RecoveryResult, RecoveryError> {
        let mut working = self.load_working_set().await?;
        let mut txn = self.transactions.begin().await?;
        let mut applied = Vec::new();
        let mut errors = Vec::new();

        for action in actions {
            // A skipped action must not leave its edits for later actions to stage.
            let checkpoint = working.clone();
            match self.apply(action.kind, &mut txn, &mut working).await {
                Ok(()) => applied.push(action.kind),
                Err(e) if action.is_critical() => {
                    warn!(
                        collection = %self.keys.collection,
                        action = %action.kind,
                        error = %e,
                        "Critical recovery action failed, aborting"
                    );
                    errors.push(format!("{}: {}", action.kind, e));
                    if let Err(rollback_err) = txn.rollback().await {
                        errors.push(rollback_err.to_string());
                    }
                    return Ok(RecoveryResult {
                        success: false,
                        actions_applied: Vec::new(),
                        errors,
                        ..Default::default()
                    });
                }
                Err(e) => {
                    debug!(action = %action.kind, error = %e, "Recovery action skipped");
                    errors.push(format!("{}: {}", action.kind, e));
                    working = checkpoint;
                }
            }
        }

        if let Err(e) = txn.commit().await {
            errors.push(e.to_string());
            return Ok(RecoveryResult {
                success: false,
                errors,
                ..Default::default()
            });
        }

        let recovered = working.values.len();
        Ok(RecoveryResult {
            success: true,
            recovered_entries: recovered,
            removed_entries: working.initial_count.saturating_sub(recovered),
            actions_applied: applied,
            errors,
            backup_timestamp: None,
        })
    }

    async fn load_working_set(&self) -> Result<WorkingSet, RecoveryError> {
        let raw = load_raw(self.store.as_ref(), &self.keys).await?;
        let (values, readable, initial_count) = match raw.entries.as_deref() {
            None => (Vec::new(), true, 0),
            Some(text) => match serde_json::from_str::<Vec<Value>>(text) {
                Ok(values) => {
                    let count = values.len();
                    (values, true, count)
                }
                Err(_) => (Vec::new(), false, 1),
            },
        };
        let metadata = raw.metadata.as_deref().and_then(|m| Metadata::from_json(m).ok());
        Ok(WorkingSet {
            values,
            readable,
            metadata,
            initial_count,
        })
    }

    async fn apply(
        &self,
        kind: ActionKind,
        txn: &mut Transaction,
        working: &mut WorkingSet,
    ) -> Result<(), RecoveryError> {
        let now = self.clock.now_millis();
        match kind {
            ActionKind::RebuildCache => {
                let owner = working.metadata.as_ref().and_then(|m| m.owner_id.clone());
                txn.multi_remove(self.keys.cache_keys()).await?;
                working.values.clear();
                working.readable = true;
                let fresh = Metadata::new(self.schema_version).with_owner(owner);
                working.metadata =
                    Some(stage_collection(txn, &self.keys, &working.values, fresh, now).await?);
            }
            ActionKind::ClearCorrupted => {
                if working.readable {
                    working.values.retain(|value| Entry::from_raw(value).is_ok());
                } else {
                    working.values.clear();
                    working.readable = true;
                }
                self.stage(txn, working, now).await?;
            }
            ActionKind::RemoveDuplicates => {
                self.ensure_readable(working)?;
                let mut seen = HashSet::new();
                working.values.retain(|value| match Entry::from_raw(value) {
                    Ok(entry) => seen.insert(entry.id),
                    Err(_) => true,
                });
                self.stage(txn, working, now).await?;
            }
            ActionKind::RepairMetadata => {
                self.ensure_readable(working)?;
                self.stage(txn, working, now).await?;
            }
            ActionKind::UpdateChecksums => {
                self.ensure_readable(working)?;
                let Some(metadata) = working.metadata.as_mut() else {
                    return Err(RecoveryError::Action("no metadata to update".to_string()));
                };
                metadata.integrity.checksum = Some(checksum_values(&working.values)?);
                metadata.integrity.last_validated = now;
                txn.set(self.keys.metadata.clone(), metadata.to_json()?).await?;
            }
        }
        Ok(())
    }

    fn ensure_readable(&self, working: &WorkingSet) -> Result<(), RecoveryError> {
        if working.readable {
            Ok(())
        } else {
            Err(RecoveryError::Action("entry list is unreadable".to_string()))
        }
    }

    /// Write the working entries with metadata rebuilt from them.
    ///
    /// Missing metadata is recreated, adopting the owner of the stored
    /// entries; the sync timestamp is clamped into `[0, now]`.
    async fn stage(
        &self,
        txn: &mut Transaction,
        working: &mut WorkingSet,
        now: i64,
    ) -> Result<(), RecoveryError> {
        let mut metadata = match working.metadata.clone() {
            Some(metadata) => metadata,
            None => {
                let owner = working
                    .values
                    .iter()
                    .find_map(|value| Entry::from_raw(value).ok())
                    .map(|entry| entry.owner_id);
                Metadata::new(self.schema_version).with_owner(owner)
            }
        };
        metadata.last_sync_timestamp = metadata.last_sync_timestamp.clamp(0, now);
        working.metadata =
            Some(stage_collection(txn, &self.keys, &working.values, metadata, now).await?);
        Ok(())
    }

    /// Bring the collection to a usable state without operator input.
    ///
    /// Healthy caches are left alone. Otherwise a plan is built and run if it
    /// is safe to run unattended, retrying once. Anything else, including an
    /// error along the way, ends in a full wipe of the collection.
    pub async fn auto_recover(&self) -> AutoRecoverOutcome {
        if self.validator.quick_health_check().await {
            return AutoRecoverOutcome::Healthy;
        }
        self.repair_or_wipe().await
    }

    /// The auto-recovery path without the health-check shortcut, for when a
    /// read has already shown the cache to be broken.
    pub async fn repair_or_wipe(&self) -> AutoRecoverOutcome {
        let reason = match self.try_auto_repair().await {
            Ok(result) => return AutoRecoverOutcome::Repaired(result),
            Err(reason) => reason,
        };

        warn!(collection = %self.keys.collection, reason = %reason, "Auto-recovery wiping cache");
        match self.wipe().await {
            Ok(()) => AutoRecoverOutcome::Wiped { reason },
            Err(e) => {
                error!(collection = %self.keys.collection, error = %e, "Failed to wipe cache");
                AutoRecoverOutcome::Degraded {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn try_auto_repair(&self) -> Result<RecoveryResult, String> {
        let plan = self
            .create_recovery_plan()
            .await
            .map_err(|e| format!("validation failed: {}", e))?;
        if !plan.is_auto_executable() {
            return Err(format!(
                "{} plan with {} risk needs manual recovery",
                plan.strategy, plan.risk
            ));
        }

        let mut result = self.execute_recovery(&plan).await;
        if !result.success {
            debug!(collection = %self.keys.collection, "Retrying recovery once");
            result = self.execute_recovery(&plan).await;
        }
        if !result.success {
            return Err(format!("recovery failed: {}", result.errors.join("; ")));
        }
        if !self.validator.quick_health_check().await {
            return Err("cache still unhealthy after recovery".to_string());
        }
        Ok(result)
    }

    /// Remove the collection's cache keys, leaving it as if never written.
    pub async fn wipe(&self) -> Result<(), RecoveryError> {
        self.remove_keys(self.keys.cache_keys()).await?;
        info!(collection = %self.keys.collection, "Cache wiped");
        Ok(())
    }

    /// Wipe the collection together with every retained backup of it.
    ///
    /// Used when the cache changes hands, so a restore can never bring back
    /// the previous owner's entries.
    pub async fn purge(&self) -> Result<(), RecoveryError> {
        let backups: Vec<String> = self.list_backups().await?.into_iter().map(|b| b.key).collect();
        let backup_count = backups.len();
        let mut keys = self.keys.cache_keys();
        keys.extend(backups);
        self.remove_keys(keys).await?;
        info!(collection = %self.keys.collection, backups = backup_count, "Cache and backups purged");
        Ok(())
    }

    async fn remove_keys(&self, keys: Vec<String>) -> Result<(), RecoveryError> {
        let mut txn = self.transactions.begin().await?;
        if let Err(e) = txn.multi_remove(keys).await {
            txn.abandon().await;
            return Err(e.into());
        }
        txn.commit().await?;
        Ok(())
    }

    /// Snapshot the collection's cache keys and evict backups beyond the
    /// retention limit.
    pub async fn create_backup(&self) -> Result<BackupInfo, RecoveryError> {
        let raw = load_raw(self.store.as_ref(), &self.keys).await?;
        let timestamp = self.clock.now_millis();
        let backup = Backup::capture(
            timestamp,
            &self.keys.collection,
            &self.keys.entries,
            &self.keys.metadata,
            raw,
        )?;
        let key = self.keys.backup_key(timestamp);
        self.store.set(&key, &backup.to_json()?).await?;
        info!(collection = %self.keys.collection, timestamp, "Backup created");

        let retained = self.list_backups().await?;
        if retained.len() > self.max_backups {
            let evicted: Vec<String> = retained[self.max_backups..]
                .iter()
                .map(|info| info.key.clone())
                .collect();
            debug!(count = evicted.len(), "Evicting old backups");
            self.store.multi_remove(&evicted).await?;
        }

        Ok(BackupInfo { timestamp, key })
    }

    /// Retained backups, newest first.
    pub async fn list_backups(&self) -> Result<Vec<BackupInfo>, RecoveryError> {
        let mut backups: Vec<BackupInfo> = self
            .store
            .list_keys()
            .await?
            .into_iter()
            .filter_map(|key| {
                self.keys
                    .backup_timestamp(&key)
                    .map(|timestamp| BackupInfo { timestamp, key })
            })
            .collect();
        backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(backups)
    }

    /// Restore the backup taken at `timestamp`, or the newest one.
    ///
    /// The backup's checksum is verified before anything is written.
    pub async fn restore_from_backup(&self, timestamp: Option<i64>) -> Result<BackupInfo, RecoveryError> {
        let key = match timestamp {
            Some(ts) => self.keys.backup_key(ts),
            None => self
                .list_backups()
                .await?
                .into_iter()
                .next()
                .map(|info| info.key)
                .ok_or(RecoveryError::BackupNotFound)?,
        };
        let raw = self
            .store
            .get(&key)
            .await?
            .ok_or(RecoveryError::BackupNotFound)?;
        let backup = Backup::from_json(&raw)?;
        backup.verify()?;

        let mut txn = self.transactions.begin().await?;
        if let Err(e) = self.stage_restore(&mut txn, &backup).await {
            txn.abandon().await;
            return Err(e.into());
        }
        txn.commit().await?;

        info!(collection = %self.keys.collection, timestamp = backup.timestamp, "Backup restored");
        Ok(BackupInfo {
            timestamp: backup.timestamp,
            key,
        })
    }

    async fn stage_restore(&self, txn: &mut Transaction, backup: &Backup) -> Result<(), TransactionError> {
        let cache_keys = self.keys.cache_keys();
        for (key, value) in &backup.snapshot {
            if !cache_keys.contains(key) {
                warn!(key = %key, "Ignoring foreign key in backup");
                continue;
            }
            match value {
                Some(value) => txn.set(key.clone(), value.clone()).await?,
                None => txn.remove(key.clone()).await?,
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
    use crate::recovery::RecoveryStrategy;
    use crate::store::MemoryStore;
    use chrono::{DateTime, Duration};
    use serde_json::json;

    const NOW: i64 = 1_700_000_000_000;

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        manager: RecoveryManager,
    }

    fn fixture(store: MemoryStore) -> Fixture {
        let store = Arc::new(store);
        let clock = Arc::new(ManualClock::new(DateTime::from_timestamp_millis(NOW).unwrap()));
        let engine = EngineConfig::new("t");
        let transactions = Arc::new(TransactionManager::new(store.clone(), clock.clone(), "t"));
        let manager = RecoveryManager::new(
            store.clone(),
            clock.clone(),
            transactions,
            &CollectionConfig::videos(),
            &engine,
        );
        Fixture {
            store,
            clock,
            manager,
        }
    }

    fn entry(id: &str) -> Value {
        json!({"id": id, "ownerId": "user-1", "recency": 1, "payload": {"id": id}, "cachedAt": NOW})
    }

    fn consistent_metadata(values: &[Value]) -> String {
        let mut meta = Metadata::new(1).with_owner(Some("user-1".into()));
        meta.last_sync_timestamp = NOW - 1000;
        meta.refresh_integrity(values.len(), checksum_entries(values).unwrap(), NOW);
        meta.to_json().unwrap()
    }

    fn store_with(values: &[Value], metadata: Option<String>) -> MemoryStore {
        let mut pairs = vec![(
            "t:videos:entries".to_string(),
            serde_json::to_string(values).unwrap(),
        )];
        if let Some(metadata) = metadata {
            pairs.push(("t:videos:metadata".to_string(), metadata));
        }
        MemoryStore::with_data(pairs)
    }

    #[tokio::test]
    async fn test_healthy_cache_is_left_alone() {
        let values = vec![entry("a"), entry("b")];
        let f = fixture(store_with(&values, Some(consistent_metadata(&values))));
        let before = f.store.snapshot();

        assert_eq!(f.manager.auto_recover().await, AutoRecoverOutcome::Healthy);
        assert_eq!(f.store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_duplicates_removed_and_recovery_is_idempotent() {
        let values = vec![entry("a"), entry("b"), entry("a")];
        let f = fixture(store_with(&values, Some(consistent_metadata(&values))));

        let plan = f.manager.create_recovery_plan().await.unwrap();
        assert_eq!(plan.risk, RiskLevel::Low);
        let result = f.manager.execute_recovery(&plan).await;
        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.recovered_entries, 2);
        assert_eq!(result.removed_entries, 1);
        assert_eq!(result.backup_timestamp, None);

        let report = f.manager.validator().validate_cache().await.unwrap();
        assert!(report.issues.is_empty(), "{:?}", report.issues);

        let again = f.manager.create_recovery_plan().await.unwrap();
        assert!(again.is_empty());
        let snapshot = f.store.snapshot();
        assert!(f.manager.execute_recovery(&again).await.success);
        assert_eq!(f.store.snapshot(), snapshot);
    }

    #[tokio::test]
    async fn test_missing_metadata_is_rebuilt_with_entry_owner() {
        let values = vec![entry("a")];
        let f = fixture(store_with(&values, None));
        assert!(!f.manager.validator().quick_health_check().await);

        let outcome = f.manager.auto_recover().await;
        assert!(matches!(outcome, AutoRecoverOutcome::Repaired(_)), "{:?}", outcome);

        let raw = f.store.get("t:videos:metadata").await.unwrap().unwrap();
        let meta = Metadata::from_json(&raw).unwrap();
        assert_eq!(meta.owner_id.as_deref(), Some("user-1"));
        assert_eq!(meta.total_count, 1);
        assert_eq!(meta.last_sync_timestamp, 0);
    }

    #[tokio::test]
    async fn test_future_timestamp_is_clamped() {
        let values = vec![entry("a")];
        let mut meta = Metadata::from_json(&consistent_metadata(&values)).unwrap();
        meta.last_sync_timestamp = NOW + Duration::days(1).num_milliseconds();
        let f = fixture(store_with(&values, Some(meta.to_json().unwrap())));

        let outcome = f.manager.auto_recover().await;
        assert!(matches!(outcome, AutoRecoverOutcome::Repaired(_)));
        let meta = Metadata::from_json(&f.store.get("t:videos:metadata").await.unwrap().unwrap()).unwrap();
        assert_eq!(meta.last_sync_timestamp, NOW);
    }

    #[tokio::test]
    async fn test_heavy_corruption_is_wiped() {
        let values = vec![entry("a"), json!({"id": ""}), json!(7), json!({"broken": true})];
        let f = fixture(store_with(&values, None));

        let plan = f.manager.create_recovery_plan().await.unwrap();
        assert_eq!(plan.strategy, RecoveryStrategy::Rebuild);

        let outcome = f.manager.auto_recover().await;
        assert!(matches!(outcome, AutoRecoverOutcome::Wiped { .. }));
        assert!(outcome.is_usable());
        assert_eq!(f.store.get("t:videos:entries").await.unwrap(), None);
        assert_eq!(f.store.get("t:videos:metadata").await.unwrap(), None);
        assert!(f.manager.validator().quick_health_check().await);
    }

    #[tokio::test]
    async fn test_partial_clear_takes_backup_and_restore_reverts() {
        let values = vec![entry("a"), entry("b"), entry("c"), json!({"id": "bad"})];
        let f = fixture(store_with(&values, Some(consistent_metadata(&values))));
        let original = f.store.snapshot();

        let plan = f.manager.create_recovery_plan().await.unwrap();
        assert_eq!(plan.strategy, RecoveryStrategy::PartialClear);
        let result = f.manager.execute_recovery(&plan).await;
        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.recovered_entries, 3);
        assert_eq!(result.removed_entries, 1);
        let ts = result.backup_timestamp.unwrap();

        let report = f.manager.validator().validate_cache().await.unwrap();
        assert!(report.is_valid, "{:?}", report.issues);

        let restored = f.manager.restore_from_backup(None).await.unwrap();
        assert_eq!(restored.timestamp, ts);
        assert_eq!(
            f.store.get("t:videos:entries").await.unwrap(),
            original.get("t:videos:entries").cloned()
        );
    }

    #[tokio::test]
    async fn test_unreadable_entry_list_cleared_manually() {
        let store = MemoryStore::with_data([("t:videos:entries", "{garbage")]);
        let f = fixture(store);

        let plan = f.manager.create_recovery_plan().await.unwrap();
        assert_eq!(plan.risk, RiskLevel::High);
        let result = f.manager.execute_recovery(&plan).await;
        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.recovered_entries, 0);
        assert_eq!(result.removed_entries, 1);
        assert_eq!(
            f.store.get("t:videos:entries").await.unwrap().as_deref(),
            Some("[]")
        );
        assert!(f.manager.validator().validate_cache().await.unwrap().is_valid);
    }

    #[tokio::test]
    async fn test_backups_are_pruned_and_listed_newest_first() {
        let f = fixture(MemoryStore::new());
        for _ in 0..5 {
            f.manager.create_backup().await.unwrap();
            f.clock.advance(Duration::seconds(1));
        }

        let backups = f.manager.list_backups().await.unwrap();
        let stamps: Vec<i64> = backups.iter().map(|b| b.timestamp).collect();
        assert_eq!(stamps, vec![NOW + 4000, NOW + 3000, NOW + 2000]);
    }

    #[tokio::test]
    async fn test_restore_rejects_tampered_backup() {
        let f = fixture(MemoryStore::new());
        let info = f.manager.create_backup().await.unwrap();

        let mut backup = Backup::from_json(&f.store.get(&info.key).await.unwrap().unwrap()).unwrap();
        backup
            .snapshot
            .insert("t:videos:entries".into(), Some("[]".into()));
        f.store.set(&info.key, &backup.to_json().unwrap()).await.unwrap();

        let err = f.manager.restore_from_backup(Some(info.timestamp)).await.unwrap_err();
        assert!(matches!(err, RecoveryError::BackupChecksumMismatch { .. }));
        assert_eq!(f.store.get("t:videos:entries").await.unwrap(), None);

        assert!(matches!(
            f.manager.restore_from_backup(Some(1)).await,
            Err(RecoveryError::BackupNotFound)
        ));
    }
}
