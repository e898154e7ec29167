//! driftwatch — dashboard/backend metric consistency validation.
//!
//! A multi-tenant CRM serves the same business metrics through two
//! independent code paths: a pre-aggregated dashboard summary and the
//! backend list pages a user drills into. When the two disagree, users stop
//! trusting the numbers. This crate holds the canonical time-period
//! resolver, the canonical category-to-predicate filter builders for deals
//! and tasks, and the validator/report machinery that cross-checks the two
//! paths and reports drift.
//!
//! Detection only: the report names every disagreement, it never repairs
//! one. The two reads per check are sequential with no shared transaction,
//! so a small isolated drift can be a timing artifact — re-run before
//! escalating.

pub mod config;
pub mod dashboard;
pub mod db;
pub mod filters;
pub mod periods;
pub mod predicate;
pub mod report;
pub mod store;
pub mod types;
pub mod validator;

pub use config::Config;
pub use dashboard::{DashboardProvider, DashboardSummary, HttpDashboardClient};
pub use filters::{build_deal_filter, build_task_filter, DealCategory, TaskCategory};
pub use periods::{resolve_period, PeriodBounds, TimePeriod};
pub use predicate::Predicate;
pub use report::{ReportRunner, DEFAULT_MAX_CONCURRENT_CHECKS};
pub use store::{Collection, MemoryStore, RecordCounter};
pub use types::{ValidationReport, ValidationResult, ValidationSummary};
pub use validator::{ConsistencyValidator, DEFAULT_DRIFT_THRESHOLD};
