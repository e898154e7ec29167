//! Deal category filters.

use chrono::NaiveDateTime;

use crate::periods::{resolve_period, TimePeriod};
use crate::predicate::{Field, Predicate};

use super::DealCategory;

const TERMINAL_STATUSES: [&str; 2] = ["won", "lost"];

/// Build the canonical predicate for a deal category.
///
/// The tenant match is always present; the assignee match is appended when
/// given. `now` is the explicit reference instant the period resolves
/// against — identical inputs always yield a structurally identical tree.
pub fn build_deal_filter(
    tenant_id: &str,
    category: DealCategory,
    period: TimePeriod,
    now: NaiveDateTime,
    assignee_id: Option<&str>,
) -> Predicate {
    let mut clauses = vec![Predicate::eq(Field::TenantId, tenant_id)];
    if let Some(assignee) = assignee_id {
        clauses.push(Predicate::eq(Field::AssigneeId, assignee));
    }

    match category {
        // No time constraint for `all` and `active`.
        DealCategory::All => {}
        DealCategory::Active => {
            clauses.push(Predicate::not_in(Field::Status, TERMINAL_STATUSES.to_vec()));
        }
        DealCategory::Created => {
            let bounds = resolve_period(period, now);
            clauses.push(Predicate::between(Field::CreatedAt, bounds.start, bounds.end));
        }
        DealCategory::Closing => {
            // Open deals expected to close in the window. A deal that already
            // closed (won or lost) no longer counts as "closing".
            let bounds = resolve_period(period, now);
            clauses.push(Predicate::between(
                Field::ExpectedCloseDate,
                bounds.start,
                bounds.end,
            ));
            clauses.push(Predicate::not_in(Field::Status, TERMINAL_STATUSES.to_vec()));
        }
        DealCategory::Won | DealCategory::Lost => {
            let status = if category == DealCategory::Won {
                "won"
            } else {
                "lost"
            };
            let bounds = resolve_period(period, now);
            clauses.push(Predicate::eq(Field::Status, status));
            // Some records never had a close timestamp recorded; fall back to
            // `updated_at` for those. A deliberate approximation — it can
            // misclassify a deal updated for unrelated reasons in the window.
            clauses.push(Predicate::or(vec![
                Predicate::between(Field::ActualCloseDate, bounds.start, bounds.end),
                Predicate::and(vec![
                    Predicate::is_null(Field::ActualCloseDate),
                    Predicate::between(Field::UpdatedAt, bounds.start, bounds.end),
                ]),
            ]));
        }
    }

    Predicate::And(clauses)
}
