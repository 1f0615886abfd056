//! Wiring for the engine's components.

use std::sync::Arc;

use crate::auth::IdentityProvider;
use crate::clock::{Clock, SystemClock};
use crate::config::{CollectionConfig, EngineConfig};
use crate::models::Record;
use crate::recovery::RecoveryManager;
use crate::store::{KeyValueStore, StoreResult};
use crate::sync::{RemoteApi, SyncCoordinator};
use crate::transaction::TransactionManager;
use crate::validation::CacheValidator;

/// Shared store, clock and transaction manager, handing out per-collection
/// validators, recovery managers and coordinators.
pub struct CacheEngine {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    transactions: Arc<TransactionManager>,
    config: EngineConfig,
}

impl CacheEngine {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        let transactions = Arc::new(TransactionManager::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            &config.namespace,
        ));
        Self {
            store,
            clock,
            transactions,
            config,
        }
    }

    pub fn with_system_clock(store: Arc<dyn KeyValueStore>, config: EngineConfig) -> Self {
        Self::new(store, Arc::new(SystemClock), config)
    }

    /// Clean up after a previous process lifetime. Call once, before any
    /// other use of the engine.
    pub async fn start(&self) -> StoreResult<usize> {
        self.transactions.sweep_interrupted().await
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn transactions(&self) -> &Arc<TransactionManager> {
        &self.transactions
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn validator(&self, collection: &CollectionConfig) -> CacheValidator {
        CacheValidator::new(
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            collection,
            &self.config,
        )
    }

    pub fn recovery(&self, collection: &CollectionConfig) -> RecoveryManager {
        RecoveryManager::new(
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            Arc::clone(&self.transactions),
            collection,
            &self.config,
        )
    }

    pub fn coordinator<R: Record>(
        &self,
        collection: CollectionConfig,
        remote: Arc<dyn RemoteApi>,
        identity: Arc<dyn IdentityProvider>,
    ) -> SyncCoordinator<R> {
        SyncCoordinator::new(
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            Arc::clone(&self.transactions),
            remote,
            identity,
            collection,
            &self.config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_start_sweeps_stale_journals() {
        let store = Arc::new(MemoryStore::with_data([
            ("tubecache:txn:old", r#"{"id":"old","status":"pending","startedAt":1}"#),
            ("tubecache:videos:entries", "[]"),
        ]));
        let engine = CacheEngine::with_system_clock(store.clone(), EngineConfig::default());

        assert_eq!(engine.start().await.unwrap(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(engine.recovery(&CollectionConfig::videos()).keys().entries, "tubecache:videos:entries");
    }
}
