//! Portal configuration and reference catalogs, loaded from JSON under a data dir.

use crate::reference::{
    Authority, Constituency, Department, EscalationRule, PoliticalParty, Politician,
};
use chrono::{FixedOffset, Offset, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Offset of the portal's local time zone; calendar months in trends use it.
    pub utc_offset_minutes: i32,
    pub trend_months: u32,
    pub recent_complaints_limit: usize,
}

impl ReportingConfig {
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            trend_months: 6,
            recent_complaints_limit: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardConfig {
    /// Rank entities with no complaints (they score a vacuous 100).
    pub include_empty_entities: bool,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            include_empty_entities: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortalConfig {
    #[serde(default)]
    pub reporting: ReportingConfig,
    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
}

impl PortalConfig {
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        read_json(&format!("{data_dir}/portal.json"))
    }

    /// Config with hardcoded defaults for use in tests.
    pub fn default_test() -> Self {
        Self::default()
    }
}

/// Static reference data: the lookup tables the core only reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceData {
    pub departments: Vec<Department>,
    pub escalation_rules: Vec<EscalationRule>,
    pub authorities: Vec<Authority>,
    pub parties: Vec<PoliticalParty>,
    pub constituencies: Vec<Constituency>,
    pub politicians: Vec<Politician>,
}

#[derive(Debug, Deserialize)]
struct DepartmentsFile {
    departments: Vec<Department>,
}

#[derive(Debug, Deserialize)]
struct EscalationRulesFile {
    rules: Vec<EscalationRule>,
}

#[derive(Debug, Deserialize)]
struct AuthoritiesFile {
    authorities: Vec<Authority>,
}

#[derive(Debug, Deserialize)]
struct PartiesFile {
    parties: Vec<PoliticalParty>,
}

#[derive(Debug, Deserialize)]
struct ConstituenciesFile {
    constituencies: Vec<Constituency>,
}

#[derive(Debug, Deserialize)]
struct PoliticiansFile {
    politicians: Vec<Politician>,
}

impl ReferenceData {
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let departments: DepartmentsFile = read_json(&format!("{data_dir}/departments.json"))?;
        let rules: EscalationRulesFile =
            read_json(&format!("{data_dir}/escalation_rules.json"))?;
        let authorities: AuthoritiesFile = read_json(&format!("{data_dir}/authorities.json"))?;
        let parties: PartiesFile = read_json(&format!("{data_dir}/parties.json"))?;
        let constituencies: ConstituenciesFile =
            read_json(&format!("{data_dir}/constituencies.json"))?;
        let politicians: PoliticiansFile = read_json(&format!("{data_dir}/politicians.json"))?;

        Ok(Self {
            departments: departments.departments,
            escalation_rules: rules.rules,
            authorities: authorities.authorities,
            parties: parties.parties,
            constituencies: constituencies.constituencies,
            politicians: politicians.politicians,
        })
    }
}

fn read_json<T: DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let content =
        std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    serde_json::from_str(&content).map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))
}
