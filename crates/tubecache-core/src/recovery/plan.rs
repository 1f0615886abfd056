use std::fmt;

use serde::Serialize;

use crate::validation::{IssueKind, Severity, ValidationIssue, ValidationReport};

/// Actions at or below this priority abort the whole plan when they fail.
pub const ABORT_PRIORITY_THRESHOLD: u8 = 2;

/// Per-action overhead used in duration estimates.
const ACTION_COST_MS: u64 = 50;

/// Per-entry overhead used in duration estimates, capped at `ENTRY_COST_CAP_MS`.
const ENTRY_COST_MS: u64 = 2;
const ENTRY_COST_CAP_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    Repair,
    PartialClear,
    Rebuild,
}

impl RecoveryStrategy {
    fn base_duration_ms(&self) -> u64 {
        match self {
            RecoveryStrategy::Repair => 100,
            RecoveryStrategy::PartialClear => 250,
            RecoveryStrategy::Rebuild => 500,
        }
    }
}

impl fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryStrategy::Repair => write!(f, "repair"),
            RecoveryStrategy::PartialClear => write!(f, "partial_clear"),
            RecoveryStrategy::Rebuild => write!(f, "rebuild"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    RebuildCache,
    ClearCorrupted,
    RemoveDuplicates,
    RepairMetadata,
    UpdateChecksums,
}

impl ActionKind {
    /// Execution order; lower runs first.
    pub fn priority(&self) -> u8 {
        match self {
            ActionKind::RebuildCache => 1,
            ActionKind::ClearCorrupted => 2,
            ActionKind::RemoveDuplicates => 3,
            ActionKind::RepairMetadata => 4,
            ActionKind::UpdateChecksums => 5,
        }
    }

    /// Whether the action only rewrites bookkeeping and loses no entries.
    pub fn reversible(&self) -> bool {
        matches!(self, ActionKind::RepairMetadata | ActionKind::UpdateChecksums)
    }

    /// The action that addresses an issue, if any.
    ///
    /// Informational findings are left alone, except a missing checksum,
    /// which is cheap to fill in.
    pub fn for_issue(issue: &ValidationIssue) -> Option<ActionKind> {
        match (issue.kind, issue.severity) {
            (IssueKind::ChecksumMismatch, _) => Some(ActionKind::UpdateChecksums),
            (_, Severity::Info) => None,
            (IssueKind::MetadataMismatch, _) | (IssueKind::MissingEntry, _) => {
                Some(ActionKind::RepairMetadata)
            }
            (IssueKind::DuplicateEntry, _) => Some(ActionKind::RemoveDuplicates),
            (IssueKind::CorruptedData, Severity::Critical) => Some(ActionKind::ClearCorrupted),
            (IssueKind::CorruptedData, _) => None,
            (IssueKind::VersionMismatch, _) => Some(ActionKind::RebuildCache),
        }
    }

    fn description(&self) -> &'static str {
        match self {
            ActionKind::RebuildCache => "Clear all cache keys and reinitialize metadata",
            ActionKind::ClearCorrupted => "Drop structurally invalid entries",
            ActionKind::RemoveDuplicates => "Keep the first entry for each duplicated id",
            ActionKind::RepairMetadata => "Recompute metadata from stored entries",
            ActionKind::UpdateChecksums => "Recompute the stored checksum",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::RebuildCache => "rebuild_cache",
            ActionKind::ClearCorrupted => "clear_corrupted",
            ActionKind::RemoveDuplicates => "remove_duplicates",
            ActionKind::RepairMetadata => "repair_metadata",
            ActionKind::UpdateChecksums => "update_checksums",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryAction {
    pub kind: ActionKind,
    pub priority: u8,
    pub reversible: bool,
    pub description: String,
}

impl RecoveryAction {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            priority: kind.priority(),
            reversible: kind.reversible(),
            description: kind.description().to_string(),
        }
    }

    /// A failure of this action aborts the plan.
    pub fn is_critical(&self) -> bool {
        self.priority <= ABORT_PRIORITY_THRESHOLD
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryPlan {
    pub strategy: RecoveryStrategy,
    pub risk: RiskLevel,
    #[serde(rename = "dataLossRisk")]
    pub data_loss_risk: bool,
    /// Sorted ascending by priority.
    pub actions: Vec<RecoveryAction>,
    #[serde(rename = "estimatedDurationMs")]
    pub estimated_duration_ms: u64,
    pub report: ValidationReport,
}

impl RecoveryPlan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Safe to run unattended: low risk, or medium risk without data loss.
    pub fn is_auto_executable(&self) -> bool {
        match self.risk {
            RiskLevel::Low => true,
            RiskLevel::Medium => !self.data_loss_risk,
            RiskLevel::High => false,
        }
    }
}

/// Classify a validation report and derive the ordered action list.
pub fn build_plan(report: ValidationReport) -> RecoveryPlan {
    let critical = report.critical_count();
    let ratio = report.metrics.corrupted_ratio();

    let (strategy, risk, data_loss_risk) = if critical == 0 {
        (RecoveryStrategy::Repair, RiskLevel::Low, false)
    } else if critical <= 2 && ratio < 0.10 {
        (RecoveryStrategy::Repair, RiskLevel::Medium, false)
    } else if ratio > 0.50 {
        (RecoveryStrategy::Rebuild, RiskLevel::High, true)
    } else {
        (RecoveryStrategy::PartialClear, RiskLevel::Medium, true)
    };

    let mut kinds: Vec<ActionKind> = Vec::new();
    if strategy == RecoveryStrategy::Rebuild {
        kinds.push(ActionKind::RebuildCache);
    }
    for kind in report.issues.iter().filter_map(ActionKind::for_issue) {
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }

    let mut actions: Vec<RecoveryAction> = kinds.into_iter().map(RecoveryAction::new).collect();
    actions.sort_by_key(|a| a.priority);

    let entry_cost =
        (ENTRY_COST_MS * report.metrics.entries_checked as u64).min(ENTRY_COST_CAP_MS);
    let estimated_duration_ms =
        strategy.base_duration_ms() + ACTION_COST_MS * actions.len() as u64 + entry_cost;

    RecoveryPlan {
        strategy,
        risk,
        data_loss_risk,
        actions,
        estimated_duration_ms,
        report,
    }
}
