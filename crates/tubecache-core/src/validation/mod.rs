//! Read-only cache integrity checks.
//!
//! The validator never writes. Everything it finds is returned as data
//! (`ValidationIssue`s ranked by severity); deciding what to do about it is
//! `crate::recovery`'s job.

pub mod issue;
pub mod validator;

pub use issue::{IssueKind, Severity, ValidationIssue, ValidationMetrics, ValidationReport};
pub use validator::CacheValidator;
