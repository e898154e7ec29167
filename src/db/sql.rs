//! Predicate AST → parameterized SQL translation.
//!
//! Renders a `WHERE` clause with `?` placeholders and the matching parameter
//! list. Instants become ISO-8601 text in the same format the store writes,
//! so text comparison in SQLite orders chronologically.

use rusqlite::types::Value as SqlValue;

use crate::predicate::{CmpOp, Predicate, Value};
use crate::store::StoreError;

use super::format_ts;

/// Translate a predicate into `(where_clause, params)`.
///
/// Returns `InvalidPredicate` for trees the builders never emit (empty
/// conjunctions, list operands on scalar operators); reaching one of those
/// is a programming defect, and the error propagates rather than folding
/// into a validation result.
pub fn predicate_to_sql(predicate: &Predicate) -> Result<(String, Vec<SqlValue>), StoreError> {
    let mut clause = String::new();
    let mut params = Vec::new();
    walk(predicate, &mut clause, &mut params)?;
    Ok((clause, params))
}

fn walk(
    predicate: &Predicate,
    clause: &mut String,
    params: &mut Vec<SqlValue>,
) -> Result<(), StoreError> {
    match predicate {
        Predicate::And(children) => walk_group(children, " AND ", clause, params),
        Predicate::Or(children) => walk_group(children, " OR ", clause, params),
        Predicate::Not(inner) => {
            clause.push_str("NOT (");
            walk(inner, clause, params)?;
            clause.push(')');
            Ok(())
        }
        Predicate::Cmp { field, op, value } => {
            let column = field.column();
            match op {
                CmpOp::IsNull => {
                    clause.push_str(column);
                    clause.push_str(" IS NULL");
                    Ok(())
                }
                CmpOp::In | CmpOp::NotIn => {
                    let Value::List(items) = value else {
                        return Err(StoreError::InvalidPredicate(format!(
                            "{op:?} on {column} requires a list operand"
                        )));
                    };
                    if items.is_empty() {
                        return Err(StoreError::InvalidPredicate(format!(
                            "empty list for {op:?} on {column}"
                        )));
                    }
                    clause.push_str(column);
                    clause.push_str(if *op == CmpOp::In { " IN (" } else { " NOT IN (" });
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            clause.push_str(", ");
                        }
                        clause.push('?');
                        params.push(SqlValue::Text(item.clone()));
                    }
                    clause.push(')');
                    Ok(())
                }
                CmpOp::Eq | CmpOp::Ne | CmpOp::Lt | CmpOp::Le | CmpOp::Ge => {
                    let operand = match value {
                        Value::Text(s) => SqlValue::Text(s.clone()),
                        Value::Instant(t) => SqlValue::Text(format_ts(*t)),
                        Value::List(_) | Value::Null => {
                            return Err(StoreError::InvalidPredicate(format!(
                                "{op:?} on {column} requires a scalar operand"
                            )));
                        }
                    };
                    clause.push_str(column);
                    clause.push_str(match op {
                        CmpOp::Eq => " = ?",
                        CmpOp::Ne => " != ?",
                        CmpOp::Lt => " < ?",
                        CmpOp::Le => " <= ?",
                        CmpOp::Ge => " >= ?",
                        _ => unreachable!(),
                    });
                    params.push(operand);
                    Ok(())
                }
            }
        }
    }
}

fn walk_group(
    children: &[Predicate],
    joiner: &str,
    clause: &mut String,
    params: &mut Vec<SqlValue>,
) -> Result<(), StoreError> {
    if children.is_empty() {
        return Err(StoreError::InvalidPredicate(
            "empty AND/OR group".to_string(),
        ));
    }
    clause.push('(');
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            clause.push_str(joiner);
        }
        walk(child, clause, params)?;
    }
    clause.push(')');
    Ok(())
}
