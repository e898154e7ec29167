//! System-of-record abstraction: the count surface the validator reads, plus
//! the in-memory backend.
//!
//! The validator only ever needs "count records matching predicate" over the
//! two collections. [`RecordCounter`] is that seam; [`crate::db::SqliteStore`]
//! is the production implementation and [`MemoryStore`] evaluates predicates
//! directly over record structs — the test double that lets filter semantics
//! be exercised without a database, and the reference implementation the SQL
//! translation is cross-checked against.

use chrono::NaiveDateTime;
use parking_lot::RwLock;
use thiserror::Error;

use crate::predicate::{CmpOp, Field, Predicate, Value};
use crate::types::{DealRecord, TaskRecord};

/// The two collections of the system of record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Deals,
    Tasks,
}

impl Collection {
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Deals => "deals",
            Collection::Tasks => "tasks",
        }
    }
}

/// Errors from the system-of-record read path. These indicate a broken
/// environment or a malformed predicate (a programming defect), never a
/// data-quality finding — the validator propagates them instead of folding
/// them into a check result.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Malformed predicate: {0}")]
    InvalidPredicate(String),

    #[error("Count task failed: {0}")]
    Task(String),
}

/// Count surface over the system of record.
pub trait RecordCounter: Send + Sync {
    fn count(&self, collection: Collection, predicate: &Predicate) -> Result<i64, StoreError>;
}

// ---------------------------------------------------------------------------
// In-memory evaluation
// ---------------------------------------------------------------------------

/// A record's value for one field, when present.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Instant(NaiveDateTime),
}

/// Field access for in-memory predicate evaluation. `None` means the record
/// has no value there — either a nullable column that is null, or a field
/// the collection does not carry at all.
pub trait FieldLookup {
    fn field(&self, field: Field) -> Option<FieldValue>;
}

impl FieldLookup for DealRecord {
    fn field(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::TenantId => Some(FieldValue::Text(self.tenant_id.clone())),
            Field::AssigneeId => self.assignee_id.clone().map(FieldValue::Text),
            Field::Status => Some(FieldValue::Text(self.status.as_str().to_string())),
            Field::CreatedAt => Some(FieldValue::Instant(self.created_at)),
            Field::UpdatedAt => Some(FieldValue::Instant(self.updated_at)),
            Field::ExpectedCloseDate => self.expected_close_date.map(FieldValue::Instant),
            Field::ActualCloseDate => self.actual_close_date.map(FieldValue::Instant),
            Field::DueDate | Field::CompletedAt => None,
        }
    }
}

impl FieldLookup for TaskRecord {
    fn field(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::TenantId => Some(FieldValue::Text(self.tenant_id.clone())),
            Field::AssigneeId => self.assignee_id.clone().map(FieldValue::Text),
            Field::Status => Some(FieldValue::Text(self.status.as_str().to_string())),
            Field::CreatedAt => Some(FieldValue::Instant(self.created_at)),
            Field::UpdatedAt => Some(FieldValue::Instant(self.updated_at)),
            Field::DueDate => self.due_date.map(FieldValue::Instant),
            Field::CompletedAt => self.completed_at.map(FieldValue::Instant),
            Field::ExpectedCloseDate | Field::ActualCloseDate => None,
        }
    }
}

/// Evaluate a predicate against one record.
///
/// Null handling matches SQL three-valued logic as the SQLite backend sees
/// it: any comparison against a missing value is false — including `Ne` and
/// `NotIn` — and only `IsNull` matches the absence itself.
pub fn eval<R: FieldLookup>(predicate: &Predicate, record: &R) -> bool {
    match predicate {
        Predicate::And(children) => children.iter().all(|c| eval(c, record)),
        Predicate::Or(children) => children.iter().any(|c| eval(c, record)),
        Predicate::Not(inner) => !eval(inner, record),
        Predicate::Cmp { field, op, value } => {
            let actual = record.field(*field);
            match op {
                CmpOp::IsNull => actual.is_none(),
                _ => match actual {
                    None => false,
                    Some(actual) => compare(&actual, *op, value),
                },
            }
        }
    }
}

fn compare(actual: &FieldValue, op: CmpOp, value: &Value) -> bool {
    match (actual, value) {
        (FieldValue::Text(a), Value::Text(v)) => match op {
            CmpOp::Eq => a == v,
            CmpOp::Ne => a != v,
            CmpOp::Lt => a.as_str() < v.as_str(),
            CmpOp::Le => a.as_str() <= v.as_str(),
            CmpOp::Ge => a.as_str() >= v.as_str(),
            CmpOp::In | CmpOp::NotIn | CmpOp::IsNull => false,
        },
        (FieldValue::Instant(a), Value::Instant(v)) => match op {
            CmpOp::Eq => a == v,
            CmpOp::Ne => a != v,
            CmpOp::Lt => a < v,
            CmpOp::Le => a <= v,
            CmpOp::Ge => a >= v,
            CmpOp::In | CmpOp::NotIn | CmpOp::IsNull => false,
        },
        (FieldValue::Text(a), Value::List(items)) => match op {
            CmpOp::In => items.iter().any(|i| i == a),
            CmpOp::NotIn => !items.iter().any(|i| i == a),
            _ => false,
        },
        // Type mismatch between field and operand never matches.
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory system of record. Interior mutability so fixtures can be
/// inserted through a shared reference, same as the SQLite store.
#[derive(Default)]
pub struct MemoryStore {
    deals: RwLock<Vec<DealRecord>>,
    tasks: RwLock<Vec<TaskRecord>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn insert_deal(&self, deal: DealRecord) {
        self.deals.write().push(deal);
    }

    pub fn insert_task(&self, task: TaskRecord) {
        self.tasks.write().push(task);
    }

    pub fn deal_count(&self) -> usize {
        self.deals.read().len()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.read().len()
    }
}

impl RecordCounter for MemoryStore {
    fn count(&self, collection: Collection, predicate: &Predicate) -> Result<i64, StoreError> {
        let n = match collection {
            Collection::Deals => self
                .deals
                .read()
                .iter()
                .filter(|d| eval(predicate, *d))
                .count(),
            Collection::Tasks => self
                .tasks
                .read()
                .iter()
                .filter(|t| eval(predicate, *t))
                .count(),
        };
        Ok(n as i64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::types::{DealStatus, TaskStatus};

    use super::*;

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn deal(status: DealStatus, actual_close: Option<NaiveDateTime>) -> DealRecord {
        DealRecord {
            id: "d1".to_string(),
            tenant_id: "t1".to_string(),
            assignee_id: None,
            name: "Deal".to_string(),
            status,
            amount: None,
            expected_close_date: None,
            actual_close_date: actual_close,
            created_at: ts(2025, 1, 1),
            updated_at: ts(2025, 1, 2),
        }
    }

    #[test]
    fn test_eval_basic_comparisons() {
        let d = deal(DealStatus::Qualified, None);
        assert!(eval(&Predicate::eq(Field::TenantId, "t1"), &d));
        assert!(!eval(&Predicate::eq(Field::TenantId, "t2"), &d));
        assert!(eval(&Predicate::ge(Field::CreatedAt, ts(2025, 1, 1)), &d));
        assert!(!eval(&Predicate::lt(Field::CreatedAt, ts(2025, 1, 1)), &d));
    }

    #[test]
    fn test_eval_null_semantics_match_sql() {
        let d = deal(DealStatus::Qualified, None);
        // Comparisons against a missing value are false, even negative ones.
        assert!(!eval(&Predicate::eq(Field::ActualCloseDate, ts(2025, 1, 1)), &d));
        assert!(!eval(&Predicate::ne(Field::AssigneeId, "u1"), &d));
        assert!(!eval(&Predicate::not_in(Field::AssigneeId, vec!["u1"]), &d));
        // Only IsNull matches the absence.
        assert!(eval(&Predicate::is_null(Field::ActualCloseDate), &d));
        assert!(!eval(&Predicate::is_null(Field::CreatedAt), &d));
    }

    #[test]
    fn test_eval_list_membership() {
        let d = deal(DealStatus::Won, None);
        assert!(eval(&Predicate::in_list(Field::Status, vec!["won", "lost"]), &d));
        assert!(!eval(&Predicate::not_in(Field::Status, vec!["won", "lost"]), &d));
    }

    #[test]
    fn test_eval_boolean_combinators() {
        let d = deal(DealStatus::Won, Some(ts(2025, 1, 10)));
        let p = Predicate::and(vec![
            Predicate::eq(Field::Status, "won"),
            Predicate::or(vec![
                Predicate::between(Field::ActualCloseDate, ts(2025, 1, 1), ts(2025, 1, 31)),
                Predicate::is_null(Field::ActualCloseDate),
            ]),
        ]);
        assert!(eval(&p, &d));
        assert!(!eval(&Predicate::negate(p), &d));
    }

    #[test]
    fn test_memory_store_counts_per_collection() {
        let store = MemoryStore::new();
        store.insert_deal(deal(DealStatus::Lead, None));
        store.insert_task(TaskRecord {
            id: "t1".to_string(),
            tenant_id: "t1".to_string(),
            assignee_id: None,
            title: "Task".to_string(),
            status: TaskStatus::Pending,
            due_date: None,
            completed_at: None,
            created_at: ts(2025, 1, 1),
            updated_at: ts(2025, 1, 1),
        });

        let tenant = Predicate::eq(Field::TenantId, "t1");
        assert_eq!(store.count(Collection::Deals, &tenant).unwrap(), 1);
        assert_eq!(store.count(Collection::Tasks, &tenant).unwrap(), 1);
    }
}
