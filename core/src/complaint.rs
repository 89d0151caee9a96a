//! Complaint records and their append-only status log.
//!
//! Complaints are created by citizens, mutated only through the lifecycle
//! (status) and escalation (level, due date) modules, and never deleted.

use crate::{
    error::UnknownVariant,
    types::{AuthorityId, ComplaintId, DepartmentId, EntityId, Timestamp},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplaintStatus {
    Submitted,
    Viewed,
    InProgress,
    Escalated,
    Resolved,
    Closed,
    Rejected,
}

impl ComplaintStatus {
    pub const ALL: [Self; 7] = [
        Self::Submitted,
        Self::Viewed,
        Self::InProgress,
        Self::Escalated,
        Self::Resolved,
        Self::Closed,
        Self::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::Viewed => "VIEWED",
            Self::InProgress => "IN_PROGRESS",
            Self::Escalated => "ESCALATED",
            Self::Resolved => "RESOLVED",
            Self::Closed => "CLOSED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Open complaints are the only ones the escalation engine looks at.
    pub fn is_open(self) -> bool {
        !matches!(self, Self::Resolved | Self::Closed | Self::Rejected)
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Rejected)
    }

    pub fn counts_as_resolved(self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }

    pub fn counts_as_pending(self) -> bool {
        matches!(self, Self::Submitted | Self::Viewed | Self::InProgress)
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplaintStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "complaint status",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }
}

impl FromStr for Priority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "URGENT" => Ok(Self::Urgent),
            other => Err(UnknownVariant {
                kind: "priority",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: ComplaintId,
    pub ticket_number: String,
    pub citizen_id: EntityId,
    pub title: String,
    pub description: String,
    pub department_id: DepartmentId,
    pub priority: Priority,
    pub status: ComplaintStatus,
    pub created_at: Timestamp,
    pub viewed_at: Option<Timestamp>,
    pub resolved_at: Option<Timestamp>,
    pub closed_at: Option<Timestamp>,
    pub escalation_due_at: Option<Timestamp>,
    pub current_escalation_level: u32,
    /// When the complaint entered its current escalation level.
    pub level_entered_at: Timestamp,
    pub assigned_authority_id: Option<AuthorityId>,
    pub city_id: EntityId,
    pub ward_id: Option<EntityId>,
    pub assembly_constituency_id: Option<EntityId>,
    pub parliamentary_constituency_id: Option<EntityId>,
}

impl Complaint {
    /// Counted as escalated by the metrics aggregator.
    pub fn is_escalated(&self) -> bool {
        self.current_escalation_level > 1 || self.status == ComplaintStatus::Escalated
    }

    /// Resolved with a known due date: `Some(true)` when on time.
    /// `None` when the complaint is unresolved or never had a due date.
    pub fn resolved_on_time(&self) -> Option<bool> {
        if !self.status.counts_as_resolved() {
            return None;
        }
        match (self.resolved_at, self.escalation_due_at) {
            (Some(resolved), Some(due)) => Some(resolved <= due),
            _ => None,
        }
    }
}

/// Citizen-supplied intake payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComplaint {
    pub citizen_id: EntityId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub department_id: DepartmentId,
    #[serde(default)]
    pub priority: Priority,
    pub city_id: EntityId,
    #[serde(default)]
    pub ward_id: Option<EntityId>,
    #[serde(default)]
    pub assembly_constituency_id: Option<EntityId>,
    #[serde(default)]
    pub parliamentary_constituency_id: Option<EntityId>,
}

/// One row of the append-only audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusLogEntry {
    pub id: Option<i64>,
    pub complaint_id: ComplaintId,
    pub status: ComplaintStatus,
    pub notes: Option<String>,
    /// Absent for citizen-originated and system events.
    pub authority_id: Option<AuthorityId>,
    pub created_at: Timestamp,
}
