//! Reference entities: departments, authorities, escalation rules and the
//! political mapping (parties, politicians, constituencies).
//!
//! The core treats political entities as grouping keys; descriptive fields
//! (party color, seat type, term dates) are carried for display only.

use crate::{
    error::UnknownVariant,
    types::{AuthorityId, DepartmentId, EntityId, Timestamp},
};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
}

/// An official bound to a department, a seniority level and an optional jurisdiction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authority {
    pub id: AuthorityId,
    pub name: String,
    pub designation: String,
    pub department_id: DepartmentId,
    pub level: u32,
    #[serde(default)]
    pub ward_id: Option<EntityId>,
    #[serde(default)]
    pub city_id: Option<EntityId>,
    #[serde(default)]
    pub district_id: Option<EntityId>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// One rung of a department's escalation ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationRule {
    #[serde(default)]
    pub id: Option<i64>,
    pub department_id: DepartmentId,
    pub from_level: u32,
    pub to_level: u32,
    pub days_to_escalate: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl EscalationRule {
    /// Due date for a complaint that entered `from_level` at `entered_at`.
    pub fn due_from(&self, entered_at: Timestamp) -> Timestamp {
        entered_at + Duration::days(i64::from(self.days_to_escalate))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoliticalParty {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub abbreviation: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstituencyKind {
    Assembly,
    Parliamentary,
}

impl ConstituencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assembly => "ASSEMBLY",
            Self::Parliamentary => "PARLIAMENTARY",
        }
    }
}

impl FromStr for ConstituencyKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ASSEMBLY" => Ok(Self::Assembly),
            "PARLIAMENTARY" => Ok(Self::Parliamentary),
            _ => Err(UnknownVariant {
                kind: "constituency kind",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constituency {
    pub id: EntityId,
    pub name: String,
    pub kind: ConstituencyKind,
    pub state_id: EntityId,
    pub state_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatType {
    /// Member of the Legislative Assembly.
    Mla,
    /// Member of Parliament.
    Mp,
}

impl SeatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mla => "MLA",
            Self::Mp => "MP",
        }
    }

    pub fn constituency_kind(self) -> ConstituencyKind {
        match self {
            Self::Mla => ConstituencyKind::Assembly,
            Self::Mp => ConstituencyKind::Parliamentary,
        }
    }
}

impl FromStr for SeatType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MLA" => Ok(Self::Mla),
            "MP" => Ok(Self::Mp),
            other => Err(UnknownVariant {
                kind: "seat type",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Politician {
    pub id: EntityId,
    pub name: String,
    pub party_id: EntityId,
    pub seat_type: SeatType,
    pub constituency_id: EntityId,
    pub term_start: Timestamp,
    #[serde(default)]
    pub term_end: Option<Timestamp>,
    #[serde(default = "default_true")]
    pub is_current: bool,
}

impl Politician {
    /// Holds the seat at `now`: flagged current and inside the term window.
    pub fn is_serving_at(&self, now: Timestamp) -> bool {
        self.is_current && self.term_start <= now && self.term_end.map_or(true, |end| now < end)
    }
}

fn default_true() -> bool {
    true
}
