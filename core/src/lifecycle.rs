//! Status transition validator.
//!
//! Legal moves:
//!   SUBMITTED → VIEWED → IN_PROGRESS → {RESOLVED, REJECTED}
//!   RESOLVED  → CLOSED
//!   ESCALATED → {VIEWED, IN_PROGRESS, RESOLVED, REJECTED}
//!
//! ESCALATED is an overlay on the open states; only the escalation engine
//! enters it. CLOSED and REJECTED are terminal.
//!
//! RULE: `transition_status` is the only way client code changes a status,
//! and every change appends a status-log row in the same transaction.

use crate::{
    complaint::{Complaint, ComplaintStatus, StatusLogEntry},
    error::{GrievanceError, GrievanceResult},
    escalation::rule_for_level,
    store::GrievanceStore,
    types::{AuthorityId, ComplaintId, Timestamp},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub complaint_id: ComplaintId,
    pub target_status: ComplaintStatus,
    #[serde(default)]
    pub acting_authority_id: Option<AuthorityId>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TransitionRequest {
    pub fn new(complaint_id: impl Into<ComplaintId>, target_status: ComplaintStatus) -> Self {
        Self {
            complaint_id: complaint_id.into(),
            target_status,
            acting_authority_id: None,
            notes: None,
        }
    }

    pub fn by(mut self, authority_id: impl Into<AuthorityId>) -> Self {
        self.acting_authority_id = Some(authority_id.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Statuses a client may move a complaint to from `from`.
pub fn allowed_targets(from: ComplaintStatus) -> &'static [ComplaintStatus] {
    use crate::complaint::ComplaintStatus::*;
    match from {
        Submitted => &[Viewed],
        Viewed => &[InProgress],
        InProgress => &[Resolved, Rejected],
        Escalated => &[Viewed, InProgress, Resolved, Rejected],
        Resolved => &[Closed],
        Closed | Rejected => &[],
    }
}

pub fn is_reachable(from: ComplaintStatus, to: ComplaintStatus) -> bool {
    allowed_targets(from).contains(&to)
}

/// Reject illegal moves before anything is written.
pub fn validate(complaint: &Complaint, target: ComplaintStatus) -> GrievanceResult<()> {
    if complaint.status.is_terminal() || !is_reachable(complaint.status, target) {
        return Err(GrievanceError::InvalidTransition {
            complaint_id: complaint.id.clone(),
            from: complaint.status,
            to: target,
        });
    }
    if matches!(target, ComplaintStatus::Resolved | ComplaintStatus::Closed)
        && complaint.assigned_authority_id.is_none()
    {
        return Err(GrievanceError::MissingAssignment {
            complaint_id: complaint.id.clone(),
            target,
        });
    }
    Ok(())
}

/// The complaint after entering `target` at `at`. Lifecycle timestamps are
/// stamped only the first time their status is entered.
pub fn apply(complaint: &Complaint, target: ComplaintStatus, at: Timestamp) -> Complaint {
    let mut next = complaint.clone();
    next.status = target;
    match target {
        ComplaintStatus::Viewed => {
            next.viewed_at.get_or_insert(at);
        }
        ComplaintStatus::Resolved => {
            next.resolved_at.get_or_insert(at);
        }
        ComplaintStatus::Closed => {
            next.resolved_at.get_or_insert(at);
            next.closed_at.get_or_insert(at);
        }
        _ => {}
    }
    next
}

/// Validate and persist one status change with its audit entry.
pub fn transition_status(
    store: &GrievanceStore,
    request: &TransitionRequest,
    now: Timestamp,
) -> GrievanceResult<Complaint> {
    store.atomically(|s| {
        let complaint = s.get_complaint(&request.complaint_id)?;
        if let Some(authority_id) = &request.acting_authority_id {
            s.get_authority(authority_id)?;
        }
        if let Err(e) = validate(&complaint, request.target_status) {
            log::warn!("rejected transition for {}: {e}", complaint.ticket_number);
            return Err(e);
        }

        let mut complaint = complaint;
        if request.target_status.counts_as_resolved() && complaint.status.is_open() {
            stamp_due_date(s, &mut complaint)?;
        }

        let updated = apply(&complaint, request.target_status, now);
        s.write_status(&updated)?;
        s.append_status_log(&StatusLogEntry {
            id: None,
            complaint_id: updated.id.clone(),
            status: updated.status,
            notes: request.notes.clone(),
            authority_id: request.acting_authority_id.clone(),
            created_at: now,
        })?;

        log::info!(
            "{} moved {} -> {}",
            updated.ticket_number,
            complaint.status,
            updated.status
        );
        Ok(updated)
    })
}

/// Store the due date implied by the current level's rule when no escalation
/// evaluation has stored one yet.
fn stamp_due_date(store: &GrievanceStore, complaint: &mut Complaint) -> GrievanceResult<()> {
    if complaint.escalation_due_at.is_some() {
        return Ok(());
    }
    let rules = store.active_rules_for_department(&complaint.department_id)?;
    if let Some(rule) = rule_for_level(
        &rules,
        &complaint.department_id,
        complaint.current_escalation_level,
    ) {
        let due_at = rule.due_from(complaint.level_entered_at);
        store.write_escalation_due(&complaint.id, Some(due_at))?;
        complaint.escalation_due_at = Some(due_at);
    }
    Ok(())
}
