//! Department, authority and escalation-rule queries.

use super::{flag_at, GrievanceStore};
use crate::{
    error::{GrievanceError, GrievanceResult},
    reference::{Authority, Department, EscalationRule},
};
use rusqlite::{params, OptionalExtension};
use std::collections::HashMap;

const AUTHORITY_COLUMNS: &str = "authority_id, name, designation, department_id, level,
    ward_id, city_id, district_id, is_active";

fn authority_row_mapper(r: &rusqlite::Row<'_>) -> rusqlite::Result<Authority> {
    Ok(Authority {
        id: r.get(0)?,
        name: r.get(1)?,
        designation: r.get(2)?,
        department_id: r.get(3)?,
        level: r.get(4)?,
        ward_id: r.get(5)?,
        city_id: r.get(6)?,
        district_id: r.get(7)?,
        is_active: flag_at(r, 8)?,
    })
}

fn rule_row_mapper(r: &rusqlite::Row<'_>) -> rusqlite::Result<EscalationRule> {
    Ok(EscalationRule {
        id: Some(r.get(0)?),
        department_id: r.get(1)?,
        from_level: r.get(2)?,
        to_level: r.get(3)?,
        days_to_escalate: r.get(4)?,
        is_active: flag_at(r, 5)?,
    })
}

impl GrievanceStore {
    // ── Department ─────────────────────────────────────────────────

    pub fn upsert_department(&self, d: &Department) -> GrievanceResult<()> {
        self.conn.execute(
            "INSERT INTO department (department_id, name, code) VALUES (?1, ?2, ?3)
             ON CONFLICT(department_id) DO UPDATE SET name = excluded.name, code = excluded.code",
            params![&d.id, &d.name, d.code.as_deref()],
        )?;
        Ok(())
    }

    pub fn get_department(&self, department_id: &str) -> GrievanceResult<Department> {
        self.conn
            .query_row(
                "SELECT department_id, name, code FROM department WHERE department_id = ?1",
                params![department_id],
                |r| {
                    Ok(Department {
                        id: r.get(0)?,
                        name: r.get(1)?,
                        code: r.get(2)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| GrievanceError::not_found("department", department_id))
    }

    /// department_id → name, for labelling breakdown rows.
    pub fn department_names(&self) -> GrievanceResult<HashMap<String, String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT department_id, name FROM department")?;
        let rows = stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?;
        rows.collect::<Result<HashMap<_, _>, _>>().map_err(Into::into)
    }

    // ── Authority ──────────────────────────────────────────────────

    pub fn upsert_authority(&self, a: &Authority) -> GrievanceResult<()> {
        if a.level == 0 {
            return Err(GrievanceError::InvalidInput(format!(
                "authority '{}' must have level >= 1",
                a.id
            )));
        }
        self.conn.execute(
            &format!(
                "INSERT INTO authority ({AUTHORITY_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(authority_id) DO UPDATE SET
                    name = excluded.name, designation = excluded.designation,
                    department_id = excluded.department_id, level = excluded.level,
                    ward_id = excluded.ward_id, city_id = excluded.city_id,
                    district_id = excluded.district_id, is_active = excluded.is_active"
            ),
            params![
                &a.id,
                &a.name,
                &a.designation,
                &a.department_id,
                a.level,
                a.ward_id.as_deref(),
                a.city_id.as_deref(),
                a.district_id.as_deref(),
                if a.is_active { 1i32 } else { 0i32 },
            ],
        )?;
        Ok(())
    }

    pub fn get_authority(&self, authority_id: &str) -> GrievanceResult<Authority> {
        self.conn
            .query_row(
                &format!("SELECT {AUTHORITY_COLUMNS} FROM authority WHERE authority_id = ?1"),
                params![authority_id],
                authority_row_mapper,
            )
            .optional()?
            .ok_or_else(|| GrievanceError::not_found("authority", authority_id))
    }

    /// All authorities, optionally limited to one department, ordered by id.
    pub fn authorities(&self, department_id: Option<&str>) -> GrievanceResult<Vec<Authority>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {AUTHORITY_COLUMNS} FROM authority
             WHERE ?1 IS NULL OR department_id = ?1
             ORDER BY authority_id ASC"
        ))?;
        let rows = stmt.query_map(params![department_id], authority_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn active_authorities_at_level(
        &self,
        department_id: &str,
        level: u32,
    ) -> GrievanceResult<Vec<Authority>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {AUTHORITY_COLUMNS} FROM authority
             WHERE department_id = ?1 AND level = ?2 AND is_active = 1
             ORDER BY authority_id ASC"
        ))?;
        let rows = stmt.query_map(params![department_id, level], authority_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Escalation rules ───────────────────────────────────────────

    /// Add a rung to a department's ladder. Returns the new rule id.
    pub fn insert_escalation_rule(&self, rule: &EscalationRule) -> GrievanceResult<i64> {
        if rule.from_level == 0 || rule.to_level <= rule.from_level {
            return Err(GrievanceError::InvalidInput(format!(
                "escalation rule {} -> {} must climb from level >= 1",
                rule.from_level, rule.to_level
            )));
        }
        if rule.days_to_escalate == 0 {
            return Err(GrievanceError::InvalidInput(
                "days_to_escalate must be positive".into(),
            ));
        }
        self.get_department(&rule.department_id)?;
        self.conn.execute(
            "INSERT INTO escalation_rule (department_id, from_level, to_level, days_to_escalate, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &rule.department_id,
                rule.from_level,
                rule.to_level,
                rule.days_to_escalate,
                if rule.is_active { 1i32 } else { 0i32 },
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn escalation_rule_exists(&self, rule: &EscalationRule) -> GrievanceResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM escalation_rule
             WHERE department_id = ?1 AND from_level = ?2 AND to_level = ?3 AND days_to_escalate = ?4",
            params![
                &rule.department_id,
                rule.from_level,
                rule.to_level,
                rule.days_to_escalate
            ],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    /// Rules are never edited; retiring one only affects future evaluations.
    pub fn deactivate_escalation_rule(&self, rule_id: i64) -> GrievanceResult<()> {
        let changed = self.conn.execute(
            "UPDATE escalation_rule SET is_active = 0 WHERE rule_id = ?1",
            params![rule_id],
        )?;
        if changed == 0 {
            return Err(GrievanceError::not_found("escalation rule", rule_id.to_string()));
        }
        Ok(())
    }

    pub fn active_rules_for_department(
        &self,
        department_id: &str,
    ) -> GrievanceResult<Vec<EscalationRule>> {
        let mut stmt = self.conn.prepare(
            "SELECT rule_id, department_id, from_level, to_level, days_to_escalate, is_active
             FROM escalation_rule
             WHERE department_id = ?1 AND is_active = 1
             ORDER BY from_level ASC, rule_id ASC",
        )?;
        let rows = stmt.query_map(params![department_id], rule_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
