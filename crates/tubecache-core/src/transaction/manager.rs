//! Transaction manager.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{JournalRecord, Transaction, TransactionError, TransactionStatus};
use crate::cache::journal_prefix;
use crate::clock::Clock;
use crate::store::{KeyValueStore, StoreResult};

/// Hands out transactions over one store and cleans up after crashed ones.
///
/// There is no nesting and no coordination between concurrent transactions:
/// callers serialize writes per collection.
pub struct TransactionManager {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    journal_prefix: String,
}

impl TransactionManager {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, namespace: &str) -> Self {
        Self {
            store,
            clock,
            journal_prefix: journal_prefix(namespace),
        }
    }

    /// Start a transaction and journal it as pending.
    pub async fn begin(&self) -> Result<Transaction, TransactionError> {
        let started_at = self.clock.now_millis();
        let id = format!("{:x}-{:08x}", started_at, rand::random::<u32>());
        let journal_key = format!("{}{}", self.journal_prefix, id);

        let record = JournalRecord {
            id: id.clone(),
            status: TransactionStatus::Pending,
            started_at,
        };
        self.store
            .set(&journal_key, &serde_json::to_string(&record)?)
            .await?;

        debug!(txn = %id, "Transaction started");
        Ok(Transaction::new(id, journal_key, Arc::clone(&self.store)))
    }

    /// Journal entries currently in the store.
    pub async fn journaled(&self) -> StoreResult<Vec<String>> {
        Ok(self
            .store
            .list_keys()
            .await?
            .into_iter()
            .filter(|key| key.starts_with(&self.journal_prefix))
            .collect())
    }

    /// Delete journal entries left by a previous process lifetime.
    ///
    /// Must run at startup, before this process begins any transaction, or it
    /// would discard live journals. Nothing is replayed. Returns the number of
    /// entries swept.
    pub async fn sweep_interrupted(&self) -> StoreResult<usize> {
        let stale = self.journaled().await?;
        if stale.is_empty() {
            return Ok(0);
        }

        for key in &stale {
            match self.store.get(key).await? {
                Some(raw) => match serde_json::from_str::<JournalRecord>(&raw) {
                    Ok(record) => warn!(
                        txn = %record.id,
                        started_at = record.started_at,
                        "Discarding interrupted transaction"
                    ),
                    Err(e) => warn!(key = %key, error = %e, "Discarding unreadable journal entry"),
                },
                None => continue,
            }
        }
        self.store.multi_remove(&stale).await?;

        info!(count = stale.len(), "Swept interrupted transactions");
        Ok(stale.len())
    }
}
