use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::merge::{cap_entries, merge_entries};
use super::{RemoteApi, SyncError};
use crate::auth::IdentityProvider;
use crate::cache::{load_entries, load_metadata, stage_collection, CacheError, CollectionKeys, Entry, Metadata};
use crate::clock::Clock;
use crate::config::{CollectionConfig, EngineConfig};
use crate::models::Record;
use crate::recovery::{AutoRecoverOutcome, RecoveryManager};
use crate::store::KeyValueStore;
use crate::transaction::TransactionManager;

/// Which path a call took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTier {
    /// Never synced: full fetch.
    Cold,
    /// Older than the collection's full-sync threshold: full fetch.
    Stale,
    /// Recent enough for an incremental fetch.
    Fresh,
    /// No active identity: cache served as-is, nothing fetched or written.
    CacheOnly,
    /// Next page appended via the server cursor.
    LoadMore,
}

impl fmt::Display for SyncTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncTier::Cold => "cold",
            SyncTier::Stale => "stale",
            SyncTier::Fresh => "fresh",
            SyncTier::CacheOnly => "cache_only",
            SyncTier::LoadMore => "load_more",
        };
        write!(f, "{}", name)
    }
}

/// Result of a coordinator call. Always carries the best records available.
#[derive(Debug)]
pub struct SyncOutcome<R> {
    /// Newest first after a sync; page order is kept after load-more.
    pub records: Vec<R>,
    pub tier: SyncTier,
    /// Valid remote records received.
    pub fetched: usize,
    /// Entries evicted by the size cap.
    pub evicted: usize,
    pub has_more: bool,
    /// Why the records are stale, if they are.
    pub error: Option<SyncError>,
}

impl<R> SyncOutcome<R> {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Cached state as read on the fast path.
struct CachedState {
    entries: Vec<Entry>,
    metadata: Option<Metadata>,
}

impl CachedState {
    fn empty() -> Self {
        Self {
            entries: Vec::new(),
            metadata: None,
        }
    }

    fn has_more(&self) -> bool {
        self.metadata.as_ref().map_or(true, |m| m.has_more)
    }
}

/// Serves one collection of `R` records, syncing with the server as needed.
///
/// Calls on one coordinator are expected to be serialized by the caller.
pub struct SyncCoordinator<R: Record> {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    transactions: Arc<TransactionManager>,
    remote: Arc<dyn RemoteApi>,
    identity: Arc<dyn IdentityProvider>,
    recovery: RecoveryManager,
    collection: CollectionConfig,
    keys: CollectionKeys,
    validation_interval: Duration,
    /// When the last validation pass ran, epoch milliseconds.
    last_validation: Mutex<Option<i64>>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> SyncCoordinator<R> {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        transactions: Arc<TransactionManager>,
        remote: Arc<dyn RemoteApi>,
        identity: Arc<dyn IdentityProvider>,
        collection: CollectionConfig,
        engine: &EngineConfig,
    ) -> Self {
        let recovery = RecoveryManager::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            Arc::clone(&transactions),
            &collection,
            engine,
        );
        Self {
            keys: collection.keys(&engine.namespace),
            store,
            clock,
            transactions,
            remote,
            identity,
            recovery,
            collection,
            validation_interval: engine.validation_interval,
            last_validation: Mutex::new(None),
            _record: PhantomData,
        }
    }

    pub fn collection(&self) -> &CollectionConfig {
        &self.collection
    }

    pub fn recovery(&self) -> &RecoveryManager {
        &self.recovery
    }

    /// Return the collection, refreshing it from the server first.
    ///
    /// Cold and stale caches are replaced by a full fetch; fresh ones get the
    /// changes since the last sync merged in. On any failure the cached
    /// records are returned unchanged together with the error.
    pub async fn get_collection(&self) -> SyncOutcome<R> {
        self.ensure_validated().await;

        let Some(owner) = self.identity.current_owner_id().await else {
            return self.cache_only().await;
        };

        let cached = match self.prepare(&owner).await {
            Ok(cached) => cached,
            Err(e) => return self.outcome(&[], SyncTier::Cold, false, Some(e)),
        };

        let now = self.clock.now();
        let tier = self.tier(cached.metadata.as_ref(), now);
        debug!(collection = %self.keys.collection, tier = %tier, "Syncing");

        let fetched = match tier {
            SyncTier::Fresh => {
                let since = cached
                    .metadata
                    .as_ref()
                    .and_then(|m| DateTime::from_timestamp_millis(m.last_sync_timestamp))
                    .unwrap_or(now);
                self.remote
                    .list_changed_since(&self.keys.collection, &owner, since)
                    .await
            }
            _ => self.remote.list_all(&self.keys.collection, &owner).await,
        };
        let raw = match fetched {
            Ok(raw) => raw,
            Err(e) => {
                warn!(collection = %self.keys.collection, tier = %tier, error = %e, "Remote fetch failed, serving cache");
                return self.outcome(&cached.entries, tier, cached.has_more(), Some(e.into()));
            }
        };

        let incoming = self.to_entries(raw, &owner);
        let fetched_count = incoming.len();
        let base = if tier == SyncTier::Fresh {
            cached.entries.clone()
        } else {
            Vec::new()
        };
        let (mut merged, stats) = merge_entries(base, incoming);
        let evicted = cap_entries(&mut merged, self.collection.max_entries);

        let mut metadata = cached
            .metadata
            .clone()
            .unwrap_or_else(|| Metadata::new(self.collection.schema_version));
        metadata.owner_id = Some(owner);
        metadata.last_sync_timestamp = metadata.last_sync_timestamp.max(now.timestamp_millis());
        if tier != SyncTier::Fresh {
            metadata.next_cursor = None;
            metadata.has_more = true;
        }
        let has_more = metadata.has_more;

        if let Err(e) = self.persist(&merged, metadata).await {
            warn!(collection = %self.keys.collection, error = %e, "Failed to persist sync, serving cache");
            return self.outcome(&cached.entries, tier, cached.has_more(), Some(e));
        }

        info!(
            collection = %self.keys.collection,
            tier = %tier,
            fetched = fetched_count,
            inserted = stats.inserted,
            replaced = stats.replaced,
            collapsed = stats.collapsed,
            evicted,
            "Sync complete"
        );
        let mut outcome = self.outcome(&merged, tier, has_more, None);
        outcome.fetched = fetched_count;
        outcome.evicted = evicted;
        outcome
    }

    /// Fetch the next page after the stored cursor and append it.
    ///
    /// Pages are merged with the same id/recency rule as syncs but never
    /// truncated.
    pub async fn load_more(&self) -> SyncOutcome<R> {
        self.ensure_validated().await;

        let Some(owner) = self.identity.current_owner_id().await else {
            return self.cache_only().await;
        };

        let cached = match self.prepare(&owner).await {
            Ok(cached) => cached,
            Err(e) => return self.outcome(&[], SyncTier::LoadMore, false, Some(e)),
        };
        if !cached.has_more() {
            return self.outcome(&cached.entries, SyncTier::LoadMore, false, None);
        }

        let cursor = cached.metadata.as_ref().and_then(|m| m.next_cursor.clone());
        let page = match self
            .remote
            .list_page(&self.keys.collection, &owner, cursor.as_deref(), self.collection.page_size)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                warn!(collection = %self.keys.collection, error = %e, "Failed to load more, serving cache");
                return self.outcome(&cached.entries, SyncTier::LoadMore, true, Some(e.into()));
            }
        };

        let incoming = self.to_entries(page.records, &owner);
        let fetched_count = incoming.len();
        let (merged, stats) = merge_entries(cached.entries.clone(), incoming);

        let mut metadata = cached
            .metadata
            .clone()
            .unwrap_or_else(|| Metadata::new(self.collection.schema_version));
        metadata.owner_id = Some(owner);
        metadata.has_more = page.next_cursor.is_some();
        metadata.next_cursor = page.next_cursor;
        let has_more = metadata.has_more;

        if let Err(e) = self.persist(&merged, metadata).await {
            warn!(collection = %self.keys.collection, error = %e, "Failed to persist page, serving cache");
            return self.outcome(&cached.entries, SyncTier::LoadMore, cached.has_more(), Some(e));
        }

        debug!(
            collection = %self.keys.collection,
            fetched = fetched_count,
            inserted = stats.inserted,
            collapsed = stats.collapsed,
            has_more,
            "Loaded next page"
        );
        let mut outcome = self.outcome(&merged, SyncTier::LoadMore, has_more, None);
        outcome.fetched = fetched_count;
        outcome
    }

    /// Delete one entry (e.g. after an unsubscribe). Returns whether it existed.
    pub async fn remove_entry(&self, id: &str) -> Result<bool, SyncError> {
        let cached = self.read_cache().await?;
        let before = cached.entries.len();
        let remaining: Vec<Entry> = cached.entries.into_iter().filter(|e| e.id != id).collect();
        if remaining.len() == before {
            return Ok(false);
        }

        let metadata = cached
            .metadata
            .unwrap_or_else(|| Metadata::new(self.collection.schema_version));
        self.persist(&remaining, metadata).await?;
        debug!(collection = %self.keys.collection, id = id, "Entry removed");
        Ok(true)
    }

    /// Drop every cached entry and the collection's metadata.
    pub async fn clear(&self) -> Result<(), SyncError> {
        self.recovery.wipe().await?;
        Ok(())
    }

    /// Cached records without touching the network.
    pub async fn cached_records(&self) -> Result<Vec<R>, SyncError> {
        let cached = self.read_cache().await?;
        Ok(self.decode(&cached.entries))
    }

    fn tier(&self, metadata: Option<&Metadata>, now: DateTime<Utc>) -> SyncTier {
        let last_sync = metadata.map_or(0, |m| m.last_sync_timestamp);
        if last_sync == 0 {
            return SyncTier::Cold;
        }
        let age = now.timestamp_millis() - last_sync;
        if age >= self.collection.full_sync_threshold.num_milliseconds() {
            SyncTier::Stale
        } else {
            SyncTier::Fresh
        }
    }

    /// Run the validation/recovery pass on the first call and then at most
    /// once per validation interval.
    async fn ensure_validated(&self) {
        let now = self.clock.now_millis();
        let due = match *self.last_validation.lock() {
            None => true,
            Some(last) => now - last >= self.validation_interval.num_milliseconds(),
        };
        if due {
            self.validate_now().await;
        }
    }

    async fn validate_now(&self) -> AutoRecoverOutcome {
        let outcome = self.recovery.auto_recover().await;
        self.record_validation(outcome)
    }

    fn record_validation(&self, outcome: AutoRecoverOutcome) -> AutoRecoverOutcome {
        *self.last_validation.lock() = Some(self.clock.now_millis());
        match &outcome {
            AutoRecoverOutcome::Healthy => {}
            AutoRecoverOutcome::Repaired(result) => {
                info!(collection = %self.keys.collection, removed = result.removed_entries, "Cache repaired")
            }
            AutoRecoverOutcome::Wiped { reason } => {
                warn!(collection = %self.keys.collection, reason = %reason, "Cache was wiped")
            }
            AutoRecoverOutcome::Degraded { error } => {
                warn!(collection = %self.keys.collection, error = %error, "Cache is degraded")
            }
        }
        outcome
    }

    /// Read the cache; on failure validate/repair once and retry.
    async fn read_cache(&self) -> Result<CachedState, SyncError> {
        match self.read_cache_once().await {
            Ok(state) => Ok(state),
            Err(e) => {
                warn!(collection = %self.keys.collection, error = %e, "Cached read failed, recovering");
                let outcome = self.recovery.repair_or_wipe().await;
                if let AutoRecoverOutcome::Degraded { error } = self.record_validation(outcome) {
                    return Err(SyncError::Degraded(error));
                }
                Ok(self.read_cache_once().await?)
            }
        }
    }

    async fn read_cache_once(&self) -> Result<CachedState, CacheError> {
        let entries = load_entries(self.store.as_ref(), &self.keys).await?;
        let metadata = load_metadata(self.store.as_ref(), &self.keys).await?;
        Ok(CachedState { entries, metadata })
    }

    /// Read the cache for `owner`, wiping it first if it belongs to someone else.
    async fn prepare(&self, owner: &str) -> Result<CachedState, SyncError> {
        let cached = self.read_cache().await?;
        let foreign_metadata = cached
            .metadata
            .as_ref()
            .and_then(|m| m.owner_id.as_deref())
            .is_some_and(|id| id != owner);
        let foreign_entries = cached.entries.iter().any(|e| e.owner_id != owner);
        if !foreign_metadata && !foreign_entries {
            return Ok(cached);
        }

        info!(collection = %self.keys.collection, "Owner changed, purging cache and backups");
        self.recovery.purge().await?;
        Ok(CachedState::empty())
    }

    async fn cache_only(&self) -> SyncOutcome<R> {
        match self.read_cache().await {
            Ok(cached) => self.outcome(&cached.entries, SyncTier::CacheOnly, cached.has_more(), None),
            Err(e) => self.outcome(&[], SyncTier::CacheOnly, false, Some(e)),
        }
    }

    /// Validate raw remote records, dropping malformed ones.
    fn to_entries(&self, raw: Vec<Value>, owner: &str) -> Vec<Entry> {
        let cached_at = self.clock.now_millis();
        raw.into_iter()
            .filter_map(|value| match R::from_remote(value) {
                Ok(record) => match Entry::from_record(&record, owner, cached_at) {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!(collection = %self.keys.collection, error = %e, "Failed to encode record");
                        None
                    }
                },
                Err(e) => {
                    warn!(collection = %self.keys.collection, error = %e, "Dropping malformed remote record");
                    None
                }
            })
            .collect()
    }

    async fn persist(&self, entries: &[Entry], metadata: Metadata) -> Result<(), SyncError> {
        let mut txn = self.transactions.begin().await?;
        if let Err(e) =
            stage_collection(&mut txn, &self.keys, entries, metadata, self.clock.now_millis()).await
        {
            txn.abandon().await;
            return Err(e.into());
        }
        txn.commit().await?;
        Ok(())
    }

    fn decode(&self, entries: &[Entry]) -> Vec<R> {
        entries
            .iter()
            .filter_map(|entry| match entry.decode::<R>() {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(collection = %self.keys.collection, id = %entry.id, error = %e, "Skipping undecodable entry");
                    None
                }
            })
            .collect()
    }

    fn outcome(
        &self,
        entries: &[Entry],
        tier: SyncTier,
        has_more: bool,
        error: Option<SyncError>,
    ) -> SyncOutcome<R> {
        SyncOutcome {
            records: self.decode(entries),
            tier,
            fetched: 0,
            evicted: 0,
            has_more,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::auth::StaticIdentity;
    use crate::clock::ManualClock;
    use crate::models::ChannelSubscription;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000_000;

    /// Remote that returns a fixed set, or fails when `fail` is set.
    struct FixedRemote {
        records: Vec<Value>,
        fail: Mutex<bool>,
        calls: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl RemoteApi for FixedRemote {
        async fn list_all(&self, _collection: &str, _owner: &str) -> Result<Vec<Value>, ApiError> {
            self.calls.lock().push("all");
            if *self.fail.lock() {
                return Err(ApiError::ServerError("down".into()));
            }
            Ok(self.records.clone())
        }

        async fn list_changed_since(
            &self,
            _collection: &str,
            _owner: &str,
            _since: DateTime<Utc>,
        ) -> Result<Vec<Value>, ApiError> {
            self.calls.lock().push("changes");
            if *self.fail.lock() {
                return Err(ApiError::ServerError("down".into()));
            }
            Ok(Vec::new())
        }
    }

    fn subscription(id: &str, day: u32) -> Value {
        json!({
            "id": id,
            "channelId": format!("UC{}", id),
            "title": format!("Channel {}", id),
            "subscribedAt": format!("2023-01-{:02}T00:00:00Z", day),
        })
    }

    struct Fixture {
        clock: Arc<ManualClock>,
        remote: Arc<FixedRemote>,
        identity: Arc<StaticIdentity>,
        coordinator: SyncCoordinator<ChannelSubscription>,
    }

    fn fixture(records: Vec<Value>) -> Fixture {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(DateTime::from_timestamp_millis(NOW).unwrap()));
        let remote = Arc::new(FixedRemote {
            records,
            fail: Mutex::new(false),
            calls: Mutex::new(Vec::new()),
        });
        let identity = Arc::new(StaticIdentity::new("user-1"));
        let engine = EngineConfig::new("t");
        let transactions = Arc::new(TransactionManager::new(store.clone(), clock.clone(), "t"));
        let coordinator = SyncCoordinator::new(
            store,
            clock.clone(),
            transactions,
            remote.clone(),
            identity.clone(),
            CollectionConfig::subscriptions(),
            &engine,
        );
        Fixture {
            clock,
            remote,
            identity,
            coordinator,
        }
    }

    #[tokio::test]
    async fn test_tiers_follow_cache_age() {
        let f = fixture(vec![subscription("a", 1)]);

        let outcome = f.coordinator.get_collection().await;
        assert_eq!(outcome.tier, SyncTier::Cold);
        assert!(outcome.is_ok());

        f.clock.advance(Duration::hours(1));
        assert_eq!(f.coordinator.get_collection().await.tier, SyncTier::Fresh);

        f.clock.advance(Duration::days(3));
        assert_eq!(f.coordinator.get_collection().await.tier, SyncTier::Stale);

        assert_eq!(*f.remote.calls.lock(), vec!["all", "changes", "all"]);
    }

    #[tokio::test]
    async fn test_malformed_records_are_dropped() {
        let f = fixture(vec![
            subscription("a", 1),
            json!({"id": "b", "title": "no channel"}),
            json!({"id": "", "channelId": "UC", "title": "t", "subscribedAt": "2023-01-01T00:00:00Z"}),
        ]);
        let outcome = f.coordinator.get_collection().await;
        assert_eq!(outcome.fetched, 1);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].id, "a");
    }

    #[tokio::test]
    async fn test_anonymous_serves_cache_without_fetching() {
        let f = fixture(vec![subscription("a", 1)]);
        f.coordinator.get_collection().await;
        f.identity.set(None);

        let outcome = f.coordinator.get_collection().await;
        assert_eq!(outcome.tier, SyncTier::CacheOnly);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(f.remote.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_remote_failure_serves_cache() {
        let f = fixture(vec![subscription("a", 1), subscription("b", 2)]);
        f.coordinator.get_collection().await;

        *f.remote.fail.lock() = true;
        f.clock.advance(Duration::minutes(1));
        let outcome = f.coordinator.get_collection().await;
        assert!(matches!(outcome.error, Some(SyncError::Remote(_))));
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].id, "b");
    }

    #[tokio::test]
    async fn test_load_more_unsupported_keeps_cache() {
        let f = fixture(vec![subscription("a", 1)]);
        f.coordinator.get_collection().await;

        let outcome = f.coordinator.load_more().await;
        assert_eq!(outcome.tier, SyncTier::LoadMore);
        assert!(matches!(outcome.error, Some(SyncError::Remote(ApiError::Unsupported(_)))));
        assert_eq!(outcome.records.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_entry_and_clear() {
        let f = fixture(vec![subscription("a", 1), subscription("b", 2)]);
        f.coordinator.get_collection().await;

        assert!(f.coordinator.remove_entry("a").await.unwrap());
        assert!(!f.coordinator.remove_entry("a").await.unwrap());
        let remaining = f.coordinator.cached_records().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(f.coordinator.recovery().validator().validate_cache().await.unwrap().is_valid);

        f.coordinator.clear().await.unwrap();
        assert!(f.coordinator.cached_records().await.unwrap().is_empty());
    }
}
