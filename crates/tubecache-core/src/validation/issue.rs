use std::fmt;

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MetadataMismatch,
    CorruptedData,
    MissingEntry,
    DuplicateEntry,
    VersionMismatch,
    ChecksumMismatch,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IssueKind::MetadataMismatch => "metadata_mismatch",
            IssueKind::CorruptedData => "corrupted_data",
            IssueKind::MissingEntry => "missing_entry",
            IssueKind::DuplicateEntry => "duplicate_entry",
            IssueKind::VersionMismatch => "version_mismatch",
            IssueKind::ChecksumMismatch => "checksum_mismatch",
        };
        write!(f, "{}", name)
    }
}

/// Ordered so that `Critical` compares greatest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
    pub details: Value,
}

impl ValidationIssue {
    pub fn new(kind: IssueKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            details: Value::Null,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationMetrics {
    #[serde(rename = "entriesChecked")]
    pub entries_checked: usize,
    #[serde(rename = "corruptedEntries")]
    pub corrupted_entries: usize,
    #[serde(rename = "duplicateEntries")]
    pub duplicate_entries: usize,
    /// In `[0, 1]`; 1 means no critical or warning findings.
    #[serde(rename = "metadataAccuracy")]
    pub metadata_accuracy: f64,
}

impl ValidationMetrics {
    /// Share of checked entries that were structurally invalid.
    pub fn corrupted_ratio(&self) -> f64 {
        if self.entries_checked == 0 {
            0.0
        } else {
            self.corrupted_entries as f64 / self.entries_checked as f64
        }
    }
}

/// `max(0, 1 - (3*critical + warning) / max(entries_checked, 1))`.
pub fn metadata_accuracy(critical: usize, warnings: usize, entries_checked: usize) -> f64 {
    let baseline = entries_checked.max(1) as f64;
    let penalty = (3 * critical + warnings) as f64;
    (1.0 - penalty / baseline).max(0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    #[serde(rename = "isValid")]
    pub is_valid: bool,
    pub issues: Vec<ValidationIssue>,
    pub metrics: ValidationMetrics,
}

impl ValidationReport {
    pub fn new(issues: Vec<ValidationIssue>, entries_checked: usize, corrupted: usize, duplicates: usize) -> Self {
        let critical = issues.iter().filter(|i| i.severity == Severity::Critical).count();
        let warnings = issues.iter().filter(|i| i.severity == Severity::Warning).count();
        Self {
            is_valid: critical == 0,
            metrics: ValidationMetrics {
                entries_checked,
                corrupted_entries: corrupted,
                duplicate_entries: duplicates,
                metadata_accuracy: metadata_accuracy(critical, warnings, entries_checked),
            },
            issues,
        }
    }

    pub fn critical_count(&self) -> usize {
        self.issues.iter().filter(|i| i.is_critical()).count()
    }

    pub fn issues_of(&self, kind: IssueKind) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }
}
