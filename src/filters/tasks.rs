//! Task category filters.

use chrono::NaiveDateTime;

use crate::periods::{resolve_period, TimePeriod};
use crate::predicate::{Field, Predicate};

use super::TaskCategory;

/// Build the canonical predicate for a task category.
///
/// `period` is optional: `overdue` and `all` never use it, and the window
/// categories default to `month` when it is omitted — the one documented
/// defaulting rule that survives past the parse boundary.
pub fn build_task_filter(
    tenant_id: &str,
    category: TaskCategory,
    period: Option<TimePeriod>,
    now: NaiveDateTime,
    assignee_id: Option<&str>,
) -> Predicate {
    let mut clauses = vec![Predicate::eq(Field::TenantId, tenant_id)];
    if let Some(assignee) = assignee_id {
        clauses.push(Predicate::eq(Field::AssigneeId, assignee));
    }

    match category {
        TaskCategory::All => {}
        TaskCategory::Overdue => {
            // Strictly before `now`, not before today's midnight: a task due
            // earlier this morning is already overdue.
            clauses.push(Predicate::ne(Field::Status, "completed"));
            clauses.push(Predicate::lt(Field::DueDate, now));
        }
        TaskCategory::Upcoming => {
            let bounds = resolve_period(period.unwrap_or(TimePeriod::Month), now);
            clauses.push(Predicate::ne(Field::Status, "completed"));
            clauses.push(Predicate::ge(Field::DueDate, now));
            clauses.push(Predicate::le(Field::DueDate, bounds.end));
        }
        TaskCategory::Completed => {
            let bounds = resolve_period(period.unwrap_or(TimePeriod::Month), now);
            clauses.push(Predicate::eq(Field::Status, "completed"));
            clauses.push(Predicate::between(Field::CompletedAt, bounds.start, bounds.end));
        }
    }

    Predicate::And(clauses)
}
