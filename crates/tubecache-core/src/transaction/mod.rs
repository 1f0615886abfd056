//! Multi-key transactions over a single-key-atomic store.
//!
//! A `Transaction` records operations and only executes them on `commit()`.
//! The first time a key is touched its prior value (or absence) is captured
//! in memory; if any write fails during commit, every captured key is put
//! back and the error is re-raised.
//!
//! While pending, a transaction has a journal entry in the store. Journal
//! entries left behind by a crashed process are swept at startup by
//! `TransactionManager::sweep_interrupted` without replay: the backups that
//! would be needed to roll them back only ever lived in memory.

pub mod error;
pub mod manager;
pub mod state;

pub use error::TransactionError;
pub use manager::TransactionManager;
pub use state::{JournalRecord, Operation, Transaction, TransactionStatus};
