//! Backend-agnostic filter predicates.
//!
//! The category filter builders emit a small AST of field comparisons
//! combined with AND/OR/NOT instead of backend-specific query objects. Each
//! backend translates the tree itself: `db` renders parameterized SQL, the
//! in-memory store in `store` evaluates it directly. That keeps the builder
//! logic unit-testable without a live database, and makes "structurally
//! identical predicate" a plain `==` check.
//!
//! Predicates are pure values. No clock, no connection, no hidden state.

use chrono::NaiveDateTime;
use serde::Serialize;

/// A queryable field of the system of record. Closed set; a field that one
/// collection does not carry simply never matches for its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    TenantId,
    AssigneeId,
    CreatedAt,
    UpdatedAt,
    Status,
    ExpectedCloseDate,
    ActualCloseDate,
    DueDate,
    CompletedAt,
}

impl Field {
    /// Column name in the SQLite system of record.
    pub fn column(&self) -> &'static str {
        match self {
            Field::TenantId => "tenant_id",
            Field::AssigneeId => "assignee_id",
            Field::CreatedAt => "created_at",
            Field::UpdatedAt => "updated_at",
            Field::Status => "status",
            Field::ExpectedCloseDate => "expected_close_date",
            Field::ActualCloseDate => "actual_close_date",
            Field::DueDate => "due_date",
            Field::CompletedAt => "completed_at",
        }
    }
}

/// Comparison operator for a single field test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Ge,
    In,
    NotIn,
    IsNull,
}

/// Comparison operand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Instant(NaiveDateTime),
    List(Vec<String>),
    /// Placeholder operand for `IsNull`; carries nothing.
    Null,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(t: NaiveDateTime) -> Self {
        Value::Instant(t)
    }
}

/// A composable filter over one collection of the system of record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Predicate {
    Cmp {
        field: Field,
        op: CmpOp,
        value: Value,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn eq(field: Field, value: impl Into<Value>) -> Predicate {
        Predicate::Cmp {
            field,
            op: CmpOp::Eq,
            value: value.into(),
        }
    }

    pub fn ne(field: Field, value: impl Into<Value>) -> Predicate {
        Predicate::Cmp {
            field,
            op: CmpOp::Ne,
            value: value.into(),
        }
    }

    pub fn lt(field: Field, value: impl Into<Value>) -> Predicate {
        Predicate::Cmp {
            field,
            op: CmpOp::Lt,
            value: value.into(),
        }
    }

    pub fn le(field: Field, value: impl Into<Value>) -> Predicate {
        Predicate::Cmp {
            field,
            op: CmpOp::Le,
            value: value.into(),
        }
    }

    pub fn ge(field: Field, value: impl Into<Value>) -> Predicate {
        Predicate::Cmp {
            field,
            op: CmpOp::Ge,
            value: value.into(),
        }
    }

    pub fn is_null(field: Field) -> Predicate {
        Predicate::Cmp {
            field,
            op: CmpOp::IsNull,
            value: Value::Null,
        }
    }

    pub fn in_list<S: Into<String>>(field: Field, items: Vec<S>) -> Predicate {
        Predicate::Cmp {
            field,
            op: CmpOp::In,
            value: Value::List(items.into_iter().map(Into::into).collect()),
        }
    }

    pub fn not_in<S: Into<String>>(field: Field, items: Vec<S>) -> Predicate {
        Predicate::Cmp {
            field,
            op: CmpOp::NotIn,
            value: Value::List(items.into_iter().map(Into::into).collect()),
        }
    }

    /// Closed-inclusive range test: `start <= field <= end`.
    pub fn between(field: Field, start: NaiveDateTime, end: NaiveDateTime) -> Predicate {
        Predicate::And(vec![
            Predicate::ge(field, start),
            Predicate::le(field, end),
        ])
    }

    pub fn and(children: Vec<Predicate>) -> Predicate {
        Predicate::And(children)
    }

    pub fn or(children: Vec<Predicate>) -> Predicate {
        Predicate::Or(children)
    }

    pub fn negate(inner: Predicate) -> Predicate {
        Predicate::Not(Box::new(inner))
    }
}
