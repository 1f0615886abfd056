use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::TransactionError;
use crate::store::{KeyValueStore, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Committed,
    RolledBack,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Committed => write!(f, "committed"),
            TransactionStatus::RolledBack => write!(f, "rolled_back"),
        }
    }
}

/// What gets persisted under the journal key while a transaction is pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    pub id: String,
    pub status: TransactionStatus,
    #[serde(rename = "startedAt")]
    pub started_at: i64,
}

/// A recorded store operation, executed on commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Set { key: String, value: String },
    Remove { key: String },
    MultiSet { pairs: Vec<(String, String)> },
    MultiRemove { keys: Vec<String> },
}

impl Operation {
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Set { .. } => "set",
            Operation::Remove { .. } => "remove",
            Operation::MultiSet { .. } => "multiSet",
            Operation::MultiRemove { .. } => "multiRemove",
        }
    }

    async fn apply(&self, store: &dyn KeyValueStore) -> StoreResult<()> {
        match self {
            Operation::Set { key, value } => store.set(key, value).await,
            Operation::Remove { key } => store.remove(key).await,
            Operation::MultiSet { pairs } => store.multi_set(pairs).await,
            Operation::MultiRemove { keys } => store.multi_remove(keys).await,
        }
    }
}

/// An all-or-nothing group of store writes.
///
/// Created by `TransactionManager::begin`. Mutators only record operations
/// (after snapshotting each newly touched key); nothing reaches the store
/// until `commit`.
pub struct Transaction {
    id: String,
    journal_key: String,
    store: Arc<dyn KeyValueStore>,
    operations: Vec<Operation>,
    /// Prior values in first-touch order; `None` means the key was absent.
    backups: Vec<(String, Option<String>)>,
    touched: HashSet<String>,
    status: TransactionStatus,
}

impl Transaction {
    pub(crate) fn new(id: String, journal_key: String, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            id,
            journal_key,
            store,
            operations: Vec::new(),
            backups: Vec::new(),
            touched: HashSet::new(),
            status: TransactionStatus::Pending,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Keys touched so far, in first-touch order.
    pub fn touched_keys(&self) -> impl Iterator<Item = &str> {
        self.backups.iter().map(|(key, _)| key.as_str())
    }

    fn ensure_pending(&self) -> Result<(), TransactionError> {
        if self.status == TransactionStatus::Pending {
            Ok(())
        } else {
            Err(TransactionError::InvalidState {
                id: self.id.clone(),
                status: self.status,
            })
        }
    }

    async fn snapshot(&mut self, key: &str) -> Result<(), TransactionError> {
        if self.touched.contains(key) {
            return Ok(());
        }
        let prior = self.store.get(key).await?;
        self.touched.insert(key.to_string());
        self.backups.push((key.to_string(), prior));
        Ok(())
    }

    pub async fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), TransactionError> {
        self.ensure_pending()?;
        let key = key.into();
        self.snapshot(&key).await?;
        self.operations.push(Operation::Set {
            key,
            value: value.into(),
        });
        Ok(())
    }

    pub async fn remove(&mut self, key: impl Into<String>) -> Result<(), TransactionError> {
        self.ensure_pending()?;
        let key = key.into();
        self.snapshot(&key).await?;
        self.operations.push(Operation::Remove { key });
        Ok(())
    }

    pub async fn multi_set(&mut self, pairs: Vec<(String, String)>) -> Result<(), TransactionError> {
        self.ensure_pending()?;
        for (key, _) in &pairs {
            self.snapshot(key).await?;
        }
        self.operations.push(Operation::MultiSet { pairs });
        Ok(())
    }

    pub async fn multi_remove(&mut self, keys: Vec<String>) -> Result<(), TransactionError> {
        self.ensure_pending()?;
        for key in &keys {
            self.snapshot(key).await?;
        }
        self.operations.push(Operation::MultiRemove { keys });
        Ok(())
    }

    /// Execute all recorded operations in order.
    ///
    /// On the first failing write the transaction is rolled back and the
    /// write error is returned as `CommitFailed`.
    pub async fn commit(&mut self) -> Result<(), TransactionError> {
        self.ensure_pending()?;
        let store = Arc::clone(&self.store);

        let mut failure = None;
        for (index, operation) in self.operations.iter().enumerate() {
            if let Err(e) = operation.apply(store.as_ref()).await {
                failure = Some((index, operation.kind(), e));
                break;
            }
        }

        if let Some((index, kind, source)) = failure {
            warn!(
                txn = %self.id,
                operation = index,
                kind = kind,
                error = %source,
                "Commit failed, rolling back"
            );
            if let Err(rollback_err) = self.rollback().await {
                error!(txn = %self.id, error = %rollback_err, "Rollback after failed commit was incomplete");
            }
            return Err(TransactionError::CommitFailed {
                id: self.id.clone(),
                source,
            });
        }

        self.status = TransactionStatus::Committed;
        debug!(txn = %self.id, operations = self.operations.len(), "Transaction committed");
        self.clear_journal().await;
        Ok(())
    }

    /// Restore every touched key to its value from before the transaction.
    pub async fn rollback(&mut self) -> Result<(), TransactionError> {
        self.ensure_pending()?;

        let mut failed_keys = Vec::new();
        for (key, prior) in self.backups.iter().rev() {
            let restored = match prior {
                Some(value) => self.store.set(key, value).await,
                None => self.store.remove(key).await,
            };
            if let Err(e) = restored {
                warn!(txn = %self.id, key = %key, error = %e, "Failed to restore key during rollback");
                failed_keys.push(key.clone());
            }
        }

        self.status = TransactionStatus::RolledBack;
        self.clear_journal().await;

        if failed_keys.is_empty() {
            debug!(txn = %self.id, keys = self.backups.len(), "Transaction rolled back");
            Ok(())
        } else {
            Err(TransactionError::RollbackIncomplete {
                id: self.id.clone(),
                failed_keys,
            })
        }
    }

    /// Roll back after a failed staging call so the journal does not outlive
    /// the caller. The staging error stays the one the caller reports; a
    /// rollback failure here is only logged.
    pub async fn abandon(&mut self) {
        if let Err(e) = self.rollback().await {
            warn!(txn = %self.id, error = %e, "Rollback after staging error failed");
        }
    }

    /// A leftover journal entry is harmless: the next startup sweep removes it.
    async fn clear_journal(&self) {
        if let Err(e) = self.store.remove(&self.journal_key).await {
            warn!(txn = %self.id, error = %e, "Failed to delete journal entry");
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.status == TransactionStatus::Pending && !self.operations.is_empty() {
            warn!(
                txn = %self.id,
                operations = self.operations.len(),
                "Transaction dropped without commit or rollback"
            );
        }
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("operations", &self.operations.len())
            .field("touched", &self.backups.len())
            .finish()
    }
}
