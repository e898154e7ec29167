//! Full-report aggregation.
//!
//! Runs the validator across the cartesian product of report categories and
//! periods, concurrently under a bounded worker pool, and merges everything
//! into one [`ValidationReport`]. Exhaustive by design: a failing check is
//! collected, never short-circuited, so an operator sees the full scope of
//! drift in one pass.

use std::sync::Arc;

use chrono::NaiveDateTime;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::filters::{DealCategory, TaskCategory};
use crate::periods::TimePeriod;
use crate::store::StoreError;
use crate::types::{ValidationReport, ValidationResult, ValidationSummary};
use crate::validator::ConsistencyValidator;

/// Deal categories covered by the standing report.
pub const REPORT_DEAL_CATEGORIES: [DealCategory; 3] = [
    DealCategory::Created,
    DealCategory::Won,
    DealCategory::Closing,
];

/// Periods each deal category is checked against.
pub const REPORT_DEAL_PERIODS: [TimePeriod; 3] = [
    TimePeriod::Month,
    TimePeriod::Quarter,
    TimePeriod::FinancialYear,
];

/// Task categories covered by the standing report, each against the default
/// month period.
pub const REPORT_TASK_CATEGORIES: [TaskCategory; 3] = [
    TaskCategory::Overdue,
    TaskCategory::Completed,
    TaskCategory::All,
];

/// Default worker-pool bound for concurrent checks.
pub const DEFAULT_MAX_CONCURRENT_CHECKS: usize = 4;

/// Failures that abort a report run. Drift never lands here — drift is a
/// successful finding, reported inside the results.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A check task panicked or the pool was torn down mid-run. A
    /// programming defect, surfaced to the caller instead of being disguised
    /// as a data-quality finding.
    #[error("Validation worker failed: {0}")]
    Worker(String),
}

/// One cell of the report's cartesian product.
#[derive(Debug, Clone, Copy)]
enum CheckSpec {
    Deal(DealCategory, TimePeriod),
    Task(TaskCategory),
}

/// Runs full consistency reports for a tenant.
pub struct ReportRunner {
    validator: Arc<ConsistencyValidator>,
    max_concurrent_checks: usize,
}

impl ReportRunner {
    pub fn new(validator: ConsistencyValidator) -> ReportRunner {
        ReportRunner {
            validator: Arc::new(validator),
            max_concurrent_checks: DEFAULT_MAX_CONCURRENT_CHECKS,
        }
    }

    pub fn with_max_concurrent_checks(mut self, limit: usize) -> ReportRunner {
        self.max_concurrent_checks = limit.max(1);
        self
    }

    /// Run every standing check for the tenant and merge the results.
    ///
    /// Checks share no mutable state and run concurrently under the bounded
    /// pool; a transport failure in one is folded into its own result and
    /// never cancels the rest. Results come back in the fixed report order
    /// regardless of completion order.
    pub async fn run_full_report(
        &self,
        tenant_id: &str,
        now: NaiveDateTime,
    ) -> Result<ValidationReport, ReportError> {
        let mut specs = Vec::new();
        for category in REPORT_DEAL_CATEGORIES {
            for period in REPORT_DEAL_PERIODS {
                specs.push(CheckSpec::Deal(category, period));
            }
        }
        for category in REPORT_TASK_CATEGORIES {
            specs.push(CheckSpec::Task(category));
        }
        let total = specs.len();

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_checks));
        let mut join_set = JoinSet::new();
        for (index, spec) in specs.into_iter().enumerate() {
            let validator = Arc::clone(&self.validator);
            let semaphore = Arc::clone(&semaphore);
            let tenant = tenant_id.to_string();
            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| ReportError::Worker(e.to_string()))?;
                let result = match spec {
                    CheckSpec::Deal(category, period) => {
                        validator.validate_deal(&tenant, category, period, now).await?
                    }
                    CheckSpec::Task(category) => {
                        validator.validate_task(&tenant, category, None, now).await?
                    }
                };
                Ok::<(usize, ValidationResult), ReportError>((index, result))
            });
        }

        let mut slots: Vec<Option<ValidationResult>> = vec![None; total];
        while let Some(joined) = join_set.join_next().await {
            let (index, result) = joined.map_err(|e| ReportError::Worker(e.to_string()))??;
            slots[index] = Some(result);
        }

        let results: Vec<ValidationResult> = slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.ok_or_else(|| ReportError::Worker(format!("check {i} never completed")))
            })
            .collect::<Result<_, _>>()?;

        let summary = ValidationSummary::from_results(&results);
        let is_valid = summary.failed == 0;
        log::info!(
            "report for {tenant_id}: {}/{} checks passed, {} warnings",
            summary.passed,
            summary.total_checks,
            summary.warnings
        );

        Ok(ValidationReport {
            run_id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            generated_at: now,
            is_valid,
            results,
            summary,
        })
    }
}
