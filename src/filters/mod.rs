//! Canonical category-to-predicate filter builders.
//!
//! The dashboard aggregator and the backend list pages must count the same
//! records for the same semantic category and window. These builders are the
//! single definition of each category; both the validator and any backend
//! page that wants the canonical semantics build their filters here.
//!
//! Builders are pure: tenant, category, period, an explicit reference
//! instant, and an optional assignee in — predicate out. Same inputs, same
//! tree, always.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod deals;
mod tasks;

pub use deals::build_deal_filter;
pub use tasks::build_task_filter;

/// Semantic bucket for deal metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealCategory {
    All,
    Created,
    /// Open deals whose *expected* close falls in the window. Distinct from
    /// deals that actually closed there.
    Closing,
    Won,
    Lost,
    Active,
}

impl DealCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealCategory::All => "all",
            DealCategory::Created => "created",
            DealCategory::Closing => "closing",
            DealCategory::Won => "won",
            DealCategory::Lost => "lost",
            DealCategory::Active => "active",
        }
    }
}

impl fmt::Display for DealCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic bucket for task metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    All,
    Overdue,
    Upcoming,
    Completed,
}

impl TaskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::All => "all",
            TaskCategory::Overdue => "overdue",
            TaskCategory::Upcoming => "upcoming",
            TaskCategory::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown category strings fail loudly at the parse edge. There is no
/// silent fallback to `all` past this boundary.
#[derive(Debug, Error)]
#[error("Unknown {kind} category '{input}'. Expected one of: {expected}")]
pub struct ParseCategoryError {
    pub kind: &'static str,
    pub input: String,
    pub expected: &'static str,
}

impl FromStr for DealCategory {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(DealCategory::All),
            "created" => Ok(DealCategory::Created),
            "closing" => Ok(DealCategory::Closing),
            "won" => Ok(DealCategory::Won),
            "lost" => Ok(DealCategory::Lost),
            "active" => Ok(DealCategory::Active),
            other => Err(ParseCategoryError {
                kind: "deal",
                input: other.to_string(),
                expected: "all, created, closing, won, lost, active",
            }),
        }
    }
}

impl FromStr for TaskCategory {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(TaskCategory::All),
            "overdue" => Ok(TaskCategory::Overdue),
            "upcoming" => Ok(TaskCategory::Upcoming),
            "completed" => Ok(TaskCategory::Completed),
            other => Err(ParseCategoryError {
                kind: "task",
                input: other.to_string(),
                expected: "all, overdue, upcoming, completed",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parsing() {
        assert_eq!("closing".parse::<DealCategory>().unwrap(), DealCategory::Closing);
        assert_eq!("overdue".parse::<TaskCategory>().unwrap(), TaskCategory::Overdue);
        assert!("pending".parse::<DealCategory>().is_err());
        assert!("snoozed".parse::<TaskCategory>().is_err());
    }
}
