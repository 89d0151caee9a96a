//! Party, constituency and politician queries.

use super::{flag_at, opt_timestamp_at, timestamp_at, GrievanceStore};
use crate::{
    error::{GrievanceError, GrievanceResult},
    reference::{Constituency, PoliticalParty, Politician},
    types::to_millis,
};
use rusqlite::{params, OptionalExtension};

const POLITICIAN_COLUMNS: &str =
    "politician_id, name, party_id, seat_type, constituency_id, term_start, term_end, is_current";

fn party_row_mapper(r: &rusqlite::Row<'_>) -> rusqlite::Result<PoliticalParty> {
    Ok(PoliticalParty {
        id: r.get(0)?,
        name: r.get(1)?,
        abbreviation: r.get(2)?,
        color: r.get(3)?,
    })
}

fn constituency_row_mapper(r: &rusqlite::Row<'_>) -> rusqlite::Result<Constituency> {
    Ok(Constituency {
        id: r.get(0)?,
        name: r.get(1)?,
        kind: r.get(2)?,
        state_id: r.get(3)?,
        state_name: r.get(4)?,
    })
}

fn politician_row_mapper(r: &rusqlite::Row<'_>) -> rusqlite::Result<Politician> {
    Ok(Politician {
        id: r.get(0)?,
        name: r.get(1)?,
        party_id: r.get(2)?,
        seat_type: r.get(3)?,
        constituency_id: r.get(4)?,
        term_start: timestamp_at(r, 5)?,
        term_end: opt_timestamp_at(r, 6)?,
        is_current: flag_at(r, 7)?,
    })
}

impl GrievanceStore {
    // ── Party ──────────────────────────────────────────────────────

    pub fn upsert_party(&self, p: &PoliticalParty) -> GrievanceResult<()> {
        self.conn.execute(
            "INSERT INTO political_party (party_id, name, abbreviation, color) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(party_id) DO UPDATE SET
                name = excluded.name, abbreviation = excluded.abbreviation, color = excluded.color",
            params![&p.id, &p.name, p.abbreviation.as_deref(), p.color.as_deref()],
        )?;
        Ok(())
    }

    pub fn get_party(&self, party_id: &str) -> GrievanceResult<PoliticalParty> {
        self.conn
            .query_row(
                "SELECT party_id, name, abbreviation, color FROM political_party WHERE party_id = ?1",
                params![party_id],
                party_row_mapper,
            )
            .optional()?
            .ok_or_else(|| GrievanceError::not_found("party", party_id))
    }

    pub fn parties(&self) -> GrievanceResult<Vec<PoliticalParty>> {
        let mut stmt = self.conn.prepare(
            "SELECT party_id, name, abbreviation, color FROM political_party ORDER BY party_id ASC",
        )?;
        let rows = stmt.query_map([], party_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Constituency ───────────────────────────────────────────────

    pub fn upsert_constituency(&self, c: &Constituency) -> GrievanceResult<()> {
        self.conn.execute(
            "INSERT INTO constituency (constituency_id, name, kind, state_id, state_name)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(constituency_id) DO UPDATE SET
                name = excluded.name, kind = excluded.kind,
                state_id = excluded.state_id, state_name = excluded.state_name",
            params![&c.id, &c.name, c.kind, &c.state_id, &c.state_name],
        )?;
        Ok(())
    }

    pub fn get_constituency(&self, constituency_id: &str) -> GrievanceResult<Constituency> {
        self.conn
            .query_row(
                "SELECT constituency_id, name, kind, state_id, state_name
                 FROM constituency WHERE constituency_id = ?1",
                params![constituency_id],
                constituency_row_mapper,
            )
            .optional()?
            .ok_or_else(|| GrievanceError::not_found("constituency", constituency_id))
    }

    // ── Politician ─────────────────────────────────────────────────

    pub fn upsert_politician(&self, p: &Politician) -> GrievanceResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO politician ({POLITICIAN_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(politician_id) DO UPDATE SET
                    name = excluded.name, party_id = excluded.party_id,
                    seat_type = excluded.seat_type, constituency_id = excluded.constituency_id,
                    term_start = excluded.term_start, term_end = excluded.term_end,
                    is_current = excluded.is_current"
            ),
            params![
                &p.id,
                &p.name,
                &p.party_id,
                p.seat_type,
                &p.constituency_id,
                to_millis(p.term_start),
                p.term_end.map(to_millis),
                if p.is_current { 1i32 } else { 0i32 },
            ],
        )?;
        Ok(())
    }

    pub fn get_politician(&self, politician_id: &str) -> GrievanceResult<Politician> {
        self.conn
            .query_row(
                &format!("SELECT {POLITICIAN_COLUMNS} FROM politician WHERE politician_id = ?1"),
                params![politician_id],
                politician_row_mapper,
            )
            .optional()?
            .ok_or_else(|| GrievanceError::not_found("politician", politician_id))
    }

    /// Every politician who ever held the seat, most recent term first.
    pub fn politicians_for_constituency(
        &self,
        constituency_id: &str,
    ) -> GrievanceResult<Vec<Politician>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {POLITICIAN_COLUMNS} FROM politician
             WHERE constituency_id = ?1
             ORDER BY term_start DESC, politician_id ASC"
        ))?;
        let rows = stmt.query_map(params![constituency_id], politician_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn politicians_for_party(&self, party_id: &str) -> GrievanceResult<Vec<Politician>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {POLITICIAN_COLUMNS} FROM politician
             WHERE party_id = ?1
             ORDER BY constituency_id ASC, term_start DESC"
        ))?;
        let rows = stmt.query_map(params![party_id], politician_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
