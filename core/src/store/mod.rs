//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Lifecycle, escalation and rollup code call store methods; they never execute SQL directly.
//! Status and escalation-level writes are crate-private: the lifecycle and
//! escalation modules are their only callers, and both append an audit entry
//! in the same transaction.

mod complaint;
mod political;
mod reference;

use crate::{
    complaint::{ComplaintStatus, Priority},
    config::ReferenceData,
    error::{GrievanceResult, UnknownVariant},
    reference::{ConstituencyKind, SeatType},
    types::{from_millis, Timestamp},
};
use rusqlite::{
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
    Connection, Row, Transaction, TransactionBehavior,
};

pub struct GrievanceStore {
    conn: Connection,
}

impl GrievanceStore {
    pub fn open(path: &str) -> GrievanceResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> GrievanceResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> GrievanceResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_reference.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_complaints.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_political.sql"))?;
        Ok(())
    }

    /// Run `f` inside an IMMEDIATE transaction: the write lock is taken before
    /// the first read, so check-then-write sequences cannot interleave.
    /// Any error rolls back everything `f` wrote.
    pub fn atomically<T>(
        &self,
        f: impl FnOnce(&Self) -> GrievanceResult<T>,
    ) -> GrievanceResult<T> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let out = f(self)?;
        tx.commit()?;
        Ok(out)
    }

    /// Write every reference catalog in one transaction. Re-seeding updates
    /// descriptive fields in place and never duplicates escalation rules; a rung
    /// whose delay changed gets a new rule and the old one is deactivated.
    pub fn seed_reference(&self, data: &ReferenceData) -> GrievanceResult<()> {
        self.atomically(|store| {
            for department in &data.departments {
                store.upsert_department(department)?;
            }
            for rule in &data.escalation_rules {
                let rung: Vec<_> = store
                    .active_rules_for_department(&rule.department_id)?
                    .into_iter()
                    .filter(|r| r.from_level == rule.from_level && r.to_level == rule.to_level)
                    .collect();
                if rung.iter().any(|r| r.days_to_escalate == rule.days_to_escalate) {
                    continue;
                }
                // Retired by an administrator: stays retired.
                if rung.is_empty() && store.escalation_rule_exists(rule)? {
                    continue;
                }
                // Rules are immutable, so a changed delay retires the old rung.
                for stale_id in rung.iter().filter_map(|r| r.id) {
                    store.deactivate_escalation_rule(stale_id)?;
                    log::info!(
                        "rule {stale_id} superseded: {} level {} -> {} now {} days",
                        rule.department_id,
                        rule.from_level,
                        rule.to_level,
                        rule.days_to_escalate
                    );
                }
                store.insert_escalation_rule(rule)?;
            }
            for authority in &data.authorities {
                store.upsert_authority(authority)?;
            }
            for party in &data.parties {
                store.upsert_party(party)?;
            }
            for constituency in &data.constituencies {
                store.upsert_constituency(constituency)?;
            }
            for politician in &data.politicians {
                store.upsert_politician(politician)?;
            }
            Ok(())
        })?;
        log::info!(
            "seeded reference data: {} departments, {} rules, {} authorities, {} parties, {} constituencies, {} politicians",
            data.departments.len(),
            data.escalation_rules.len(),
            data.authorities.len(),
            data.parties.len(),
            data.constituencies.len(),
            data.politicians.len(),
        );
        Ok(())
    }
}

// ── Column helpers ─────────────────────────────────────────────────

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Timestamp> {
    let ms: i64 = row.get(idx)?;
    from_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, ms))
}

fn opt_timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Timestamp>> {
    match row.get::<_, Option<i64>>(idx)? {
        Some(ms) => from_millis(ms)
            .map(Some)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, ms)),
        None => Ok(None),
    }
}

fn flag_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<bool> {
    Ok(row.get::<_, i32>(idx)? != 0)
}

/// Enums persist as their canonical uppercase names.
macro_rules! text_enum_sql {
    ($($ty:ty),* $(,)?) => {$(
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: UnknownVariant| FromSqlError::Other(Box::new(e)))
            }
        }
    )*};
}

text_enum_sql!(ComplaintStatus, Priority, ConstituencyKind, SeatType);
