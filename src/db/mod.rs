//! SQLite-backed system of record.
//!
//! Production deployments point driftwatch at the CRM's SQLite replica; the
//! validator only ever reads from it. The schema here covers the two
//! collections the consistency checks touch (`deals`, `tasks`) with ISO-8601
//! text timestamps, and the write helpers exist for fixture seeding — the
//! `--seed-demo` path and tests — not for serving the CRM itself.

use std::path::Path;

use chrono::NaiveDateTime;
use parking_lot::Mutex;
use rusqlite::{params, Connection};

use crate::predicate::Predicate;
use crate::store::{Collection, RecordCounter, StoreError};
use crate::types::{DealRecord, TaskRecord};

mod sql;

pub use sql::predicate_to_sql;

/// Timestamp wire format for the database: ISO-8601, fractional seconds only
/// when nonzero. Keeps text comparison and chronological order aligned.
const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub(crate) fn format_ts(ts: NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS deals (
    id                  TEXT PRIMARY KEY,
    tenant_id           TEXT NOT NULL,
    assignee_id         TEXT,
    name                TEXT NOT NULL,
    status              TEXT NOT NULL,
    amount              REAL,
    expected_close_date TEXT,
    actual_close_date   TEXT,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_deals_tenant ON deals(tenant_id);
CREATE INDEX IF NOT EXISTS idx_deals_tenant_status ON deals(tenant_id, status);

CREATE TABLE IF NOT EXISTS tasks (
    id           TEXT PRIMARY KEY,
    tenant_id    TEXT NOT NULL,
    assignee_id  TEXT,
    title        TEXT NOT NULL,
    status       TEXT NOT NULL,
    due_date     TEXT,
    completed_at TEXT,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tasks_tenant ON tasks(tenant_id);
CREATE INDEX IF NOT EXISTS idx_tasks_tenant_status ON tasks(tenant_id, status);
";

/// SQLite implementation of [`RecordCounter`].
///
/// The connection sits behind a `Mutex` so one store can be shared across
/// the report's concurrent checks; each count holds the lock only for its
/// single prepared query.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open_at(path: &Path) -> Result<SqliteStore, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(StoreError::CreateDir)?;
            }
        }

        let conn = Connection::open(path)?;
        // WAL for concurrent readers while the CRM side writes.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database. Test fixtures only.
    pub fn open_in_memory() -> Result<SqliteStore, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    pub fn insert_deal(&self, deal: &DealRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO deals
                 (id, tenant_id, assignee_id, name, status, amount,
                  expected_close_date, actual_close_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                deal.id,
                deal.tenant_id,
                deal.assignee_id,
                deal.name,
                deal.status.as_str(),
                deal.amount,
                deal.expected_close_date.map(format_ts),
                deal.actual_close_date.map(format_ts),
                format_ts(deal.created_at),
                format_ts(deal.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn insert_task(&self, task: &TaskRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO tasks
                 (id, tenant_id, assignee_id, title, status,
                  due_date, completed_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                task.id,
                task.tenant_id,
                task.assignee_id,
                task.title,
                task.status.as_str(),
                task.due_date.map(format_ts),
                task.completed_at.map(format_ts),
                format_ts(task.created_at),
                format_ts(task.updated_at),
            ],
        )?;
        Ok(())
    }

}

impl RecordCounter for SqliteStore {
    fn count(&self, collection: Collection, predicate: &Predicate) -> Result<i64, StoreError> {
        let (where_clause, query_params) = predicate_to_sql(predicate)?;
        let query = format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            collection.table(),
            where_clause
        );

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&query)?;
        let n: i64 = stmt.query_row(rusqlite::params_from_iter(query_params), |row| row.get(0))?;
        Ok(n)
    }
}

/// Seed a small deterministic fixture set for one tenant so the binary can be
/// exercised end-to-end without a live CRM. Relative to `now`: three deals
/// created this month (one already won with no close timestamp), one older
/// active deal expected to close this quarter, plus a spread of tasks.
pub fn seed_demo(store: &SqliteStore, tenant_id: &str, now: NaiveDateTime) -> Result<(), StoreError> {
    use crate::types::{DealStatus, TaskStatus};
    use chrono::Duration;

    let deals = [
        DealRecord {
            id: format!("{tenant_id}-deal-1"),
            tenant_id: tenant_id.to_string(),
            assignee_id: Some("u1".to_string()),
            name: "Starter plan renewal".to_string(),
            status: DealStatus::Qualified,
            amount: Some(4_500.0),
            expected_close_date: Some(now + Duration::days(20)),
            actual_close_date: None,
            created_at: now - Duration::days(2),
            updated_at: now - Duration::days(1),
        },
        DealRecord {
            id: format!("{tenant_id}-deal-2"),
            tenant_id: tenant_id.to_string(),
            assignee_id: Some("u2".to_string()),
            name: "Enterprise rollout".to_string(),
            status: DealStatus::Won,
            amount: Some(82_000.0),
            expected_close_date: Some(now - Duration::days(3)),
            // No close timestamp on purpose: exercises the updated_at fallback.
            actual_close_date: None,
            created_at: now - Duration::days(6),
            updated_at: now - Duration::days(1),
        },
        DealRecord {
            id: format!("{tenant_id}-deal-3"),
            tenant_id: tenant_id.to_string(),
            assignee_id: None,
            name: "Pilot expansion".to_string(),
            status: DealStatus::Proposal,
            amount: Some(12_000.0),
            expected_close_date: Some(now + Duration::days(45)),
            actual_close_date: None,
            created_at: now - Duration::days(4),
            updated_at: now - Duration::days(4),
        },
        DealRecord {
            id: format!("{tenant_id}-deal-4"),
            tenant_id: tenant_id.to_string(),
            assignee_id: Some("u1".to_string()),
            name: "Legacy migration".to_string(),
            status: DealStatus::Negotiation,
            amount: Some(30_000.0),
            expected_close_date: Some(now + Duration::days(10)),
            actual_close_date: None,
            created_at: now - Duration::days(80),
            updated_at: now - Duration::days(9),
        },
    ];
    for deal in &deals {
        store.insert_deal(deal)?;
    }

    let tasks = [
        TaskRecord {
            id: format!("{tenant_id}-task-1"),
            tenant_id: tenant_id.to_string(),
            assignee_id: Some("u1".to_string()),
            title: "Send revised quote".to_string(),
            status: TaskStatus::Pending,
            due_date: Some(now - Duration::days(2)),
            completed_at: None,
            created_at: now - Duration::days(5),
            updated_at: now - Duration::days(5),
        },
        TaskRecord {
            id: format!("{tenant_id}-task-2"),
            tenant_id: tenant_id.to_string(),
            assignee_id: Some("u2".to_string()),
            title: "Schedule onboarding call".to_string(),
            status: TaskStatus::InProgress,
            due_date: Some(now + Duration::days(3)),
            completed_at: None,
            created_at: now - Duration::days(1),
            updated_at: now - Duration::days(1),
        },
        TaskRecord {
            id: format!("{tenant_id}-task-3"),
            tenant_id: tenant_id.to_string(),
            assignee_id: None,
            title: "Close out security review".to_string(),
            status: TaskStatus::Completed,
            due_date: Some(now - Duration::days(4)),
            completed_at: Some(now - Duration::days(3)),
            created_at: now - Duration::days(10),
            updated_at: now - Duration::days(3),
        },
    ];
    for task in &tasks {
        store.insert_task(task)?;
    }

    log::info!(
        "Seeded demo fixtures for tenant {}: {} deals, {} tasks",
        tenant_id,
        deals.len(),
        tasks.len()
    );
    Ok(())
}
