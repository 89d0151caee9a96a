use super::{opt_timestamp_at, timestamp_at, GrievanceStore};
use crate::{
    complaint::{Complaint, ComplaintStatus, StatusLogEntry},
    error::{GrievanceError, GrievanceResult},
    reference::ConstituencyKind,
    types::{to_millis, Timestamp},
};
use rusqlite::{params, OptionalExtension};

const COMPLAINT_COLUMNS: &str = "complaint_id, ticket_number, citizen_id, title, description,
    department_id, priority, status, created_at, viewed_at, resolved_at, closed_at,
    escalation_due_at, current_escalation_level, level_entered_at, assigned_authority_id,
    city_id, ward_id, assembly_constituency_id, parliamentary_constituency_id";

// Helper function for mapping complaint rows
fn complaint_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<Complaint> {
    Ok(Complaint {
        id: row.get(0)?,
        ticket_number: row.get(1)?,
        citizen_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        department_id: row.get(5)?,
        priority: row.get(6)?,
        status: row.get(7)?,
        created_at: timestamp_at(row, 8)?,
        viewed_at: opt_timestamp_at(row, 9)?,
        resolved_at: opt_timestamp_at(row, 10)?,
        closed_at: opt_timestamp_at(row, 11)?,
        escalation_due_at: opt_timestamp_at(row, 12)?,
        current_escalation_level: row.get(13)?,
        level_entered_at: timestamp_at(row, 14)?,
        assigned_authority_id: row.get(15)?,
        city_id: row.get(16)?,
        ward_id: row.get(17)?,
        assembly_constituency_id: row.get(18)?,
        parliamentary_constituency_id: row.get(19)?,
    })
}

fn status_log_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<StatusLogEntry> {
    Ok(StatusLogEntry {
        id: Some(row.get(0)?),
        complaint_id: row.get(1)?,
        status: row.get(2)?,
        notes: row.get(3)?,
        authority_id: row.get(4)?,
        created_at: timestamp_at(row, 5)?,
    })
}

impl GrievanceStore {
    // ── Complaint ──────────────────────────────────────────────────

    pub(crate) fn insert_complaint(&self, c: &Complaint) -> GrievanceResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO complaint ({COMPLAINT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                         ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)"
            ),
            params![
                &c.id,
                &c.ticket_number,
                &c.citizen_id,
                &c.title,
                &c.description,
                &c.department_id,
                c.priority,
                c.status,
                to_millis(c.created_at),
                c.viewed_at.map(to_millis),
                c.resolved_at.map(to_millis),
                c.closed_at.map(to_millis),
                c.escalation_due_at.map(to_millis),
                c.current_escalation_level,
                to_millis(c.level_entered_at),
                c.assigned_authority_id.as_deref(),
                &c.city_id,
                c.ward_id.as_deref(),
                c.assembly_constituency_id.as_deref(),
                c.parliamentary_constituency_id.as_deref(),
            ],
        )?;
        Ok(())
    }

    pub fn get_complaint(&self, complaint_id: &str) -> GrievanceResult<Complaint> {
        self.conn
            .query_row(
                &format!("SELECT {COMPLAINT_COLUMNS} FROM complaint WHERE complaint_id = ?1"),
                params![complaint_id],
                complaint_row_mapper,
            )
            .optional()?
            .ok_or_else(|| GrievanceError::not_found("complaint", complaint_id))
    }

    pub fn find_by_ticket(&self, ticket_number: &str) -> GrievanceResult<Complaint> {
        self.conn
            .query_row(
                &format!("SELECT {COMPLAINT_COLUMNS} FROM complaint WHERE ticket_number = ?1"),
                params![ticket_number],
                complaint_row_mapper,
            )
            .optional()?
            .ok_or_else(|| GrievanceError::not_found("ticket", ticket_number))
    }

    pub fn ticket_exists(&self, ticket_number: &str) -> GrievanceResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM complaint WHERE ticket_number = ?1",
            params![ticket_number],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Ids of every complaint the escalation engine may still act on, oldest first.
    pub fn open_complaint_ids(&self) -> GrievanceResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT complaint_id FROM complaint
             WHERE status NOT IN ('RESOLVED', 'CLOSED', 'REJECTED')
             ORDER BY created_at ASC, complaint_id ASC",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn complaints_for_authority(&self, authority_id: &str) -> GrievanceResult<Vec<Complaint>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaint
             WHERE assigned_authority_id = ?1
             ORDER BY created_at ASC, complaint_id ASC"
        ))?;
        let rows = stmt.query_map(params![authority_id], complaint_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Complaints mapped to a constituency. Selection follows the kind only:
    /// an assembly id never matches the parliamentary column and vice versa.
    pub fn complaints_for_constituency(
        &self,
        kind: ConstituencyKind,
        constituency_id: &str,
    ) -> GrievanceResult<Vec<Complaint>> {
        let column = match kind {
            ConstituencyKind::Assembly => "assembly_constituency_id",
            ConstituencyKind::Parliamentary => "parliamentary_constituency_id",
        };
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaint
             WHERE {column} = ?1
             ORDER BY created_at ASC, complaint_id ASC"
        ))?;
        let rows = stmt.query_map(params![constituency_id], complaint_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn complaint_count(&self) -> GrievanceResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM complaint", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Persist status and the lifecycle timestamps. Lifecycle module only.
    pub(crate) fn write_status(&self, c: &Complaint) -> GrievanceResult<()> {
        self.conn.execute(
            "UPDATE complaint SET status = ?1, viewed_at = ?2, resolved_at = ?3, closed_at = ?4
             WHERE complaint_id = ?5",
            params![
                c.status,
                c.viewed_at.map(to_millis),
                c.resolved_at.map(to_millis),
                c.closed_at.map(to_millis),
                &c.id,
            ],
        )?;
        Ok(())
    }

    /// Persist an escalation event. Escalation module only.
    pub(crate) fn write_escalation(&self, c: &Complaint) -> GrievanceResult<()> {
        self.conn.execute(
            "UPDATE complaint SET status = ?1, current_escalation_level = ?2,
                    level_entered_at = ?3, escalation_due_at = ?4
             WHERE complaint_id = ?5",
            params![
                c.status,
                c.current_escalation_level,
                to_millis(c.level_entered_at),
                c.escalation_due_at.map(to_millis),
                &c.id,
            ],
        )?;
        Ok(())
    }

    pub(crate) fn write_escalation_due(
        &self,
        complaint_id: &str,
        due_at: Option<Timestamp>,
    ) -> GrievanceResult<()> {
        self.conn.execute(
            "UPDATE complaint SET escalation_due_at = ?1 WHERE complaint_id = ?2",
            params![due_at.map(to_millis), complaint_id],
        )?;
        Ok(())
    }

    pub(crate) fn write_assignment(
        &self,
        complaint_id: &str,
        authority_id: &str,
    ) -> GrievanceResult<()> {
        self.conn.execute(
            "UPDATE complaint SET assigned_authority_id = ?1 WHERE complaint_id = ?2",
            params![authority_id, complaint_id],
        )?;
        Ok(())
    }

    // ── Status log ─────────────────────────────────────────────────

    pub(crate) fn append_status_log(&self, entry: &StatusLogEntry) -> GrievanceResult<i64> {
        self.conn.execute(
            "INSERT INTO complaint_status_log (complaint_id, status, notes, authority_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &entry.complaint_id,
                entry.status,
                entry.notes.as_deref(),
                entry.authority_id.as_deref(),
                to_millis(entry.created_at),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn status_log(&self, complaint_id: &str) -> GrievanceResult<Vec<StatusLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT log_id, complaint_id, status, notes, authority_id, created_at
             FROM complaint_status_log WHERE complaint_id = ?1
             ORDER BY created_at ASC, log_id ASC",
        )?;
        let rows = stmt.query_map(params![complaint_id], status_log_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn status_log_count(&self, status: ComplaintStatus) -> GrievanceResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM complaint_status_log WHERE status = ?1",
            params![status],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
