use thiserror::Error;

use crate::store::StoreError;
use crate::transaction::TransactionError;

#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No backup found")]
    BackupNotFound,

    #[error("Backup {timestamp} failed checksum verification (expected {expected}, got {actual})")]
    BackupChecksumMismatch {
        timestamp: i64,
        expected: String,
        actual: String,
    },

    #[error("Recovery action failed: {0}")]
    Action(String),
}
