//! Risk-classified cache repair.
//!
//! `RecoveryManager` turns a `ValidationReport` into an ordered
//! `RecoveryPlan`, executes it inside a single transaction, and keeps
//! timestamped backups as a manual escape hatch.
//!
//! `auto_recover` is what the sync coordinator calls before trusting the
//! cache: it repairs what is safe to repair unattended and otherwise wipes the
//! collection, trading data loss for an empty-but-consistent cache.

pub mod backup;
pub mod error;
pub mod executor;
pub mod plan;

pub use backup::{Backup, BackupInfo};
pub use error::RecoveryError;
pub use executor::{AutoRecoverOutcome, RecoveryManager, RecoveryResult};
pub use plan::{
    build_plan, ActionKind, RecoveryAction, RecoveryPlan, RecoveryStrategy, RiskLevel,
    ABORT_PRIORITY_THRESHOLD,
};
