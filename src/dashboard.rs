//! Dashboard aggregate endpoint client.
//!
//! The dashboard serves pre-aggregated counters per tenant and period; the
//! validator compares them against true backend counts. The endpoint sits
//! behind [`DashboardProvider`] so checks run against a stub in tests, with
//! [`HttpDashboardClient`] as the production implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::filters::{DealCategory, TaskCategory};
use crate::periods::TimePeriod;

/// Errors from the dashboard read path. Transport and schema failures are
/// folded into the per-check validation result at the validator boundary —
/// one unreachable endpoint never aborts a report run.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Invalid dashboard base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Dashboard request failed: {0}")]
    Transport(String),

    #[error("Dashboard request timed out after {0}s")]
    Timeout(u64),

    #[error("Dashboard returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Malformed dashboard response: {0}")]
    Malformed(String),

    #[error("Dashboard response missing field '{0}'")]
    MissingField(&'static str),
}

impl DashboardError {
    /// True for failures of the call itself (unreachable, timed out,
    /// non-success status). Re-running may succeed.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            DashboardError::Transport(_) | DashboardError::Timeout(_) | DashboardError::Http { .. }
        )
    }

    /// True when the endpoint answered but the body did not match the
    /// contract. Re-running will not help until the contract is fixed.
    pub fn is_schema(&self) -> bool {
        matches!(
            self,
            DashboardError::Malformed(_) | DashboardError::MissingField(_)
        )
    }
}

/// Aggregate counters for one (tenant, period). Counter names keep the
/// legacy `ThisMonth` suffix even though they are scoped by the requested
/// period. Every field is optional: a missing counter is a schema error for
/// the category that needs it, not for the whole response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardSummary {
    pub total_deals: Option<i64>,
    pub deals_created_this_month: Option<i64>,
    pub deals_closing_this_month: Option<i64>,
    /// Dedicated won counter. Earlier dashboard revisions reused the closing
    /// counter for won checks; that substitution compared two populations
    /// that differ by definition and is not supported here.
    pub deals_won_this_month: Option<i64>,
    pub deals_lost_this_month: Option<i64>,
    pub active_deals: Option<i64>,
    pub overdue_tasks: Option<i64>,
    pub upcoming_tasks: Option<i64>,
    pub completed_tasks: Option<i64>,
    pub total_tasks: Option<i64>,
}

impl DashboardSummary {
    /// Fixed lookup table: deal category → counter field name.
    pub fn deal_field(category: DealCategory) -> &'static str {
        match category {
            DealCategory::All => "totalDeals",
            DealCategory::Created => "dealsCreatedThisMonth",
            DealCategory::Closing => "dealsClosingThisMonth",
            DealCategory::Won => "dealsWonThisMonth",
            DealCategory::Lost => "dealsLostThisMonth",
            DealCategory::Active => "activeDeals",
        }
    }

    /// Fixed lookup table: task category → counter field name.
    pub fn task_field(category: TaskCategory) -> &'static str {
        match category {
            TaskCategory::All => "totalTasks",
            TaskCategory::Overdue => "overdueTasks",
            TaskCategory::Upcoming => "upcomingTasks",
            TaskCategory::Completed => "completedTasks",
        }
    }

    /// The reported count for a deal category, or a schema error naming the
    /// missing counter.
    pub fn deal_count(&self, category: DealCategory) -> Result<i64, DashboardError> {
        let value = match category {
            DealCategory::All => self.total_deals,
            DealCategory::Created => self.deals_created_this_month,
            DealCategory::Closing => self.deals_closing_this_month,
            DealCategory::Won => self.deals_won_this_month,
            DealCategory::Lost => self.deals_lost_this_month,
            DealCategory::Active => self.active_deals,
        };
        value.ok_or(DashboardError::MissingField(Self::deal_field(category)))
    }

    /// The reported count for a task category, or a schema error.
    pub fn task_count(&self, category: TaskCategory) -> Result<i64, DashboardError> {
        let value = match category {
            TaskCategory::All => self.total_tasks,
            TaskCategory::Overdue => self.overdue_tasks,
            TaskCategory::Upcoming => self.upcoming_tasks,
            TaskCategory::Completed => self.completed_tasks,
        };
        value.ok_or(DashboardError::MissingField(Self::task_field(category)))
    }
}

/// Read access to the dashboard aggregate endpoint.
#[async_trait]
pub trait DashboardProvider: Send + Sync {
    async fn fetch_summary(
        &self,
        tenant_id: &str,
        period: TimePeriod,
    ) -> Result<DashboardSummary, DashboardError>;
}

/// HTTP implementation with a bounded per-call timeout, so one unresponsive
/// endpoint cannot hang an entire report.
pub struct HttpDashboardClient {
    client: reqwest::Client,
    base_url: Url,
    api_token: Option<String>,
    timeout_secs: u64,
}

impl HttpDashboardClient {
    pub fn new(
        base_url: &str,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<HttpDashboardClient, DashboardError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DashboardError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DashboardError::Transport(e.to_string()))?;
        Ok(HttpDashboardClient {
            client,
            base_url,
            api_token,
            timeout_secs: timeout.as_secs(),
        })
    }

    fn summary_url(&self, tenant_id: &str) -> Result<Url, DashboardError> {
        let mut url = self.base_url.clone();
        // Push the tenant id as a single percent-encoded segment; an id
        // containing '/', '?', or '#' must not rewrite the request path.
        url.path_segments_mut()
            .map_err(|_| {
                DashboardError::InvalidBaseUrl("base URL does not support path segments".to_string())
            })?
            .pop_if_empty()
            .extend(["api", "tenants", tenant_id, "dashboard", "summary"]);
        Ok(url)
    }
}

/// First 200 characters of a trimmed error body. Character-based so a cut
/// mid-way through a multibyte sequence cannot panic.
fn truncate_body(body: &str) -> String {
    body.trim().chars().take(200).collect()
}

#[async_trait]
impl DashboardProvider for HttpDashboardClient {
    async fn fetch_summary(
        &self,
        tenant_id: &str,
        period: TimePeriod,
    ) -> Result<DashboardSummary, DashboardError> {
        let url = self.summary_url(tenant_id)?;

        let mut request = self
            .client
            .get(url)
            .query(&[("period", period.as_str())]);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DashboardError::Timeout(self.timeout_secs)
            } else {
                DashboardError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DashboardError::Http {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        response
            .json::<DashboardSummary>()
            .await
            .map_err(|e| DashboardError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deal_count_lookup() {
        let summary = DashboardSummary {
            deals_created_this_month: Some(12),
            ..Default::default()
        };
        assert_eq!(summary.deal_count(DealCategory::Created).unwrap(), 12);

        let err = summary.deal_count(DealCategory::Won).unwrap_err();
        assert!(matches!(
            err,
            DashboardError::MissingField("dealsWonThisMonth")
        ));
        assert!(err.is_schema());
        assert!(!err.is_transport());
    }

    #[test]
    fn test_task_count_lookup() {
        let summary = DashboardSummary {
            overdue_tasks: Some(3),
            total_tasks: Some(9),
            ..Default::default()
        };
        assert_eq!(summary.task_count(TaskCategory::Overdue).unwrap(), 3);
        assert_eq!(summary.task_count(TaskCategory::All).unwrap(), 9);
        assert!(summary.task_count(TaskCategory::Completed).is_err());
    }

    #[test]
    fn test_summary_parses_camel_case_and_tolerates_extras() {
        let summary: DashboardSummary = serde_json::from_str(
            r#"{
                "dealsCreatedThisMonth": 4,
                "dealsClosingThisMonth": 2,
                "overdueTasks": 1,
                "someFutureCounter": 99
            }"#,
        )
        .unwrap();
        assert_eq!(summary.deals_created_this_month, Some(4));
        assert_eq!(summary.deals_closing_this_month, Some(2));
        assert_eq!(summary.overdue_tasks, Some(1));
        assert_eq!(summary.deals_won_this_month, None);
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let err = HttpDashboardClient::new("not a url", None, Duration::from_secs(10));
        assert!(matches!(err, Err(DashboardError::InvalidBaseUrl(_))));
    }

    #[test]
    fn test_summary_url_joins_tenant_path() {
        let client =
            HttpDashboardClient::new("https://crm.example.com/", None, Duration::from_secs(10))
                .unwrap();
        let url = client.summary_url("t1").unwrap();
        assert_eq!(
            url.as_str(),
            "https://crm.example.com/api/tenants/t1/dashboard/summary"
        );
    }

    #[test]
    fn test_summary_url_encodes_tenant_segment() {
        let client =
            HttpDashboardClient::new("https://crm.example.com/", None, Duration::from_secs(10))
                .unwrap();
        let url = client.summary_url("acme/../admin#frag").unwrap();
        assert_eq!(
            url.path(),
            "/api/tenants/acme%2F..%2Fadmin%23frag/dashboard/summary"
        );
        assert!(url.fragment().is_none());
        assert!(url.query().is_none());
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        // Byte 200 lands mid-way through a two-byte character.
        let body = format!("a{}", "é".repeat(150));
        let truncated = truncate_body(&body);
        assert_eq!(truncated, body);

        let long = "é".repeat(300);
        let truncated = truncate_body(&long);
        assert_eq!(truncated.chars().count(), 200);
    }

    #[test]
    fn test_error_body_is_trimmed_and_bounded() {
        let truncated = truncate_body("  internal server error  ");
        assert_eq!(truncated, "internal server error");
        assert!(truncate_body(&"x".repeat(1000)).len() <= 200);
    }

    #[test]
    fn test_transport_classification() {
        assert!(DashboardError::Timeout(10).is_transport());
        assert!(DashboardError::Http {
            status: 503,
            body: String::new()
        }
        .is_transport());
        assert!(!DashboardError::Malformed("nope".to_string()).is_transport());
    }
}
