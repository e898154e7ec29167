//! Shared value types: system-of-record records and validation report DTOs.
//!
//! Everything here is ephemeral — computed per validation run, serialized
//! for ops/CI consumption, never persisted by this crate.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// System-of-record records
// ---------------------------------------------------------------------------

/// Pipeline stage of a deal. `Won` and `Lost` are terminal; everything else
/// counts as open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealStatus {
    Lead,
    Qualified,
    Proposal,
    Negotiation,
    Won,
    Lost,
}

impl DealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealStatus::Lead => "lead",
            DealStatus::Qualified => "qualified",
            DealStatus::Proposal => "proposal",
            DealStatus::Negotiation => "negotiation",
            DealStatus::Won => "won",
            DealStatus::Lost => "lost",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DealStatus::Won | DealStatus::Lost)
    }
}

/// Workflow state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

/// A row from the `deals` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealRecord {
    pub id: String,
    pub tenant_id: String,
    pub assignee_id: Option<String>,
    pub name: String,
    pub status: DealStatus,
    pub amount: Option<f64>,
    pub expected_close_date: Option<NaiveDateTime>,
    /// Not every closed deal recorded a close timestamp; the won/lost
    /// filters fall back to `updated_at` when this is absent.
    pub actual_close_date: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A row from the `tasks` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub tenant_id: String,
    pub assignee_id: Option<String>,
    pub title: String,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ---------------------------------------------------------------------------
// Validation report DTOs
// ---------------------------------------------------------------------------

/// The two counts of one check and their absolute difference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationStats {
    pub dashboard_count: i64,
    pub backend_count: i64,
    pub difference: i64,
}

/// Outcome of one (category, period) consistency check. Created fresh per
/// check and never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Check identifier, e.g. `"deals/created/month"`.
    pub check: String,
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub stats: ValidationStats,
}

/// Roll-up over a result list. Derived, never authoritative — always
/// recomputable from the results it summarizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub total_checks: usize,
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
}

impl ValidationSummary {
    pub fn from_results(results: &[ValidationResult]) -> ValidationSummary {
        ValidationSummary {
            total_checks: results.len(),
            passed: results.iter().filter(|r| r.is_valid).count(),
            failed: results.iter().filter(|r| !r.is_valid).count(),
            warnings: results.iter().map(|r| r.warnings.len()).sum(),
        }
    }
}

/// Full report for one tenant run: every check result plus the roll-up.
/// `is_valid` is true exactly when `summary.failed == 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub run_id: uuid::Uuid,
    pub tenant_id: String,
    /// Reference instant the whole run was resolved against, in the tenant
    /// timezone. Re-running with the same instant reproduces the same
    /// predicates; a drift that disappears on re-run was a timing artifact.
    pub generated_at: NaiveDateTime,
    pub is_valid: bool,
    pub results: Vec<ValidationResult>,
    pub summary: ValidationSummary,
}
