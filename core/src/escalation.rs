//! Escalation rule engine.
//!
//! For an open complaint, find the active rule climbing from its current
//! level. No rule means the complaint sits at its ceiling (a rule gap, not an
//! error). With a rule, the complaint is due `days_to_escalate` days after it
//! entered the level; once `now` reaches that instant it moves one level up,
//! status becomes ESCALATED, the due date is recomputed from the next rung
//! (or cleared) and a system entry is appended to the status log.
//!
//! RULE: Evaluation is a check-then-write inside one IMMEDIATE transaction.
//! The new level's reference timestamp is the evaluation instant, so a repeat
//! evaluation at the same instant finds the complaint not yet due.

use crate::{
    complaint::{Complaint, ComplaintStatus, StatusLogEntry},
    error::GrievanceResult,
    reference::EscalationRule,
    store::GrievanceStore,
    types::Timestamp,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EscalationOutcome {
    /// Resolved, closed or rejected: escalation never applies.
    Dormant { status: ComplaintStatus },
    /// No active rule climbs from this level.
    RuleGap { level: u32 },
    NotDue { due_at: Timestamp },
    Escalated {
        from_level: u32,
        to_level: u32,
        missed_due_at: Timestamp,
        next_due_at: Option<Timestamp>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationCheck {
    pub complaint: Complaint,
    pub outcome: EscalationOutcome,
}

/// Tally of one sweep over the open backlog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationSweep {
    pub evaluated: u64,
    pub escalated: u64,
    pub not_due: u64,
    pub rule_gaps: u64,
    pub dormant: u64,
}

/// The active rule for `level` in the complaint's department. Duplicate rungs
/// resolve to the oldest rule.
pub fn rule_for_level<'a>(
    rules: &'a [EscalationRule],
    department_id: &str,
    level: u32,
) -> Option<&'a EscalationRule> {
    rules
        .iter()
        .filter(|r| r.is_active && r.department_id == department_id && r.from_level == level)
        .min_by_key(|r| r.id)
}

/// Decide what evaluation at `now` does to `complaint`. Pure.
///
/// A persisted due date is honoured as-is; only a complaint that has never
/// been evaluated at its level gets one computed from the rule.
pub fn plan_escalation(
    complaint: &Complaint,
    rules: &[EscalationRule],
    now: Timestamp,
) -> EscalationOutcome {
    if !complaint.status.is_open() {
        return EscalationOutcome::Dormant {
            status: complaint.status,
        };
    }
    let level = complaint.current_escalation_level;
    let Some(rule) = rule_for_level(rules, &complaint.department_id, level) else {
        return EscalationOutcome::RuleGap { level };
    };

    let due_at = complaint
        .escalation_due_at
        .unwrap_or_else(|| rule.due_from(complaint.level_entered_at));
    if now < due_at {
        return EscalationOutcome::NotDue { due_at };
    }

    let next_due_at = rule_for_level(rules, &complaint.department_id, rule.to_level)
        .map(|next| next.due_from(now));
    EscalationOutcome::Escalated {
        from_level: level,
        to_level: rule.to_level,
        missed_due_at: due_at,
        next_due_at,
    }
}

/// Evaluate one complaint and persist whatever the plan requires.
pub fn evaluate_escalation(
    store: &GrievanceStore,
    complaint_id: &str,
    now: Timestamp,
) -> GrievanceResult<EscalationCheck> {
    store.atomically(|s| {
        let mut complaint = s.get_complaint(complaint_id)?;
        // The audit trail never runs backwards: a stale `now` is raised to the
        // latest recorded event for this complaint.
        let latest = s
            .status_log(&complaint.id)?
            .last()
            .map(|entry| entry.created_at)
            .unwrap_or(complaint.created_at)
            .max(complaint.level_entered_at);
        if now < latest {
            log::debug!(
                "{}: evaluation at {now} precedes last event {latest}, using {latest}",
                complaint.ticket_number
            );
        }
        let now = now.max(latest);
        let rules = s.active_rules_for_department(&complaint.department_id)?;
        let outcome = plan_escalation(&complaint, &rules, now);

        match &outcome {
            EscalationOutcome::Dormant { status } => {
                log::debug!("{}: dormant ({status})", complaint.ticket_number);
            }
            EscalationOutcome::RuleGap { level } => {
                log::debug!("{}: rule gap at level {level}", complaint.ticket_number);
                if complaint.escalation_due_at.take().is_some() {
                    s.write_escalation_due(&complaint.id, None)?;
                }
            }
            EscalationOutcome::NotDue { due_at } => {
                log::debug!("{}: not due until {due_at}", complaint.ticket_number);
                if complaint.escalation_due_at != Some(*due_at) {
                    complaint.escalation_due_at = Some(*due_at);
                    s.write_escalation_due(&complaint.id, Some(*due_at))?;
                }
            }
            EscalationOutcome::Escalated {
                from_level,
                to_level,
                missed_due_at,
                next_due_at,
            } => {
                complaint.status = ComplaintStatus::Escalated;
                complaint.current_escalation_level = *to_level;
                complaint.level_entered_at = now;
                complaint.escalation_due_at = *next_due_at;
                s.write_escalation(&complaint)?;
                s.append_status_log(&StatusLogEntry {
                    id: None,
                    complaint_id: complaint.id.clone(),
                    status: ComplaintStatus::Escalated,
                    notes: Some(format!(
                        "Auto-escalated from level {from_level} to level {to_level}: unresolved past due date {}",
                        missed_due_at.format("%Y-%m-%d %H:%M UTC")
                    )),
                    authority_id: None,
                    created_at: now,
                })?;
                log::info!(
                    "{} escalated {from_level} -> {to_level}",
                    complaint.ticket_number
                );
            }
        }

        Ok(EscalationCheck { complaint, outcome })
    })
}

/// Evaluate every open complaint, each in its own transaction.
pub fn sweep_open_complaints(
    store: &GrievanceStore,
    now: Timestamp,
) -> GrievanceResult<EscalationSweep> {
    let mut sweep = EscalationSweep::default();
    for complaint_id in store.open_complaint_ids()? {
        let check = evaluate_escalation(store, &complaint_id, now)?;
        sweep.evaluated += 1;
        match check.outcome {
            EscalationOutcome::Dormant { .. } => sweep.dormant += 1,
            EscalationOutcome::RuleGap { .. } => sweep.rule_gaps += 1,
            EscalationOutcome::NotDue { .. } => sweep.not_due += 1,
            EscalationOutcome::Escalated { .. } => sweep.escalated += 1,
        }
    }
    log::info!(
        "escalation sweep: evaluated={} escalated={} not_due={} rule_gaps={}",
        sweep.evaluated,
        sweep.escalated,
        sweep.not_due,
        sweep.rule_gaps,
    );
    Ok(sweep)
}
