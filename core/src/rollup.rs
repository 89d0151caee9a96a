//! Rollup composers: one aggregator, many selectors.
//!
//! Each dimension implements `RollupSelector`, which only describes the
//! entity and picks its complaints. `RollupComposer` feeds the selection to
//! the metrics aggregator and attaches department names and recent complaints.
//!
//! Party tallies count a constituency only while its current representative
//! belongs to the party, so every complaint in a party rollup is also in the
//! rollup of a constituency that party holds. Vacant seats count nowhere but
//! their own constituency report.

use crate::{
    complaint::Complaint,
    config::ReportingConfig,
    error::{GrievanceError, GrievanceResult},
    metrics::{governance_metrics, GovernanceMetrics, MetricsAggregator, MetricsReport, PerformanceLevel},
    reference::{Authority, Constituency, ConstituencyKind, PoliticalParty, Politician, SeatType},
    store::GrievanceStore,
    types::{EntityId, Timestamp},
};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Picks the complaints for one rollup dimension.
pub trait RollupSelector {
    type Entity: Serialize;

    /// Entity metadata; fails with `NotFound` for unknown ids.
    fn describe(&self, store: &GrievanceStore, now: Timestamp) -> GrievanceResult<Self::Entity>;

    fn select(&self, store: &GrievanceStore, now: Timestamp) -> GrievanceResult<Vec<Complaint>>;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupReport<E> {
    pub entity: E,
    #[serde(flatten)]
    pub report: MetricsReport,
    pub recent_complaints: Vec<Complaint>,
}

// ── Authority ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorityProfile {
    pub authority: Authority,
    pub department_name: String,
}

pub struct AuthoritySelector {
    pub authority_id: EntityId,
}

impl RollupSelector for AuthoritySelector {
    type Entity = AuthorityProfile;

    fn describe(&self, store: &GrievanceStore, _now: Timestamp) -> GrievanceResult<AuthorityProfile> {
        let authority = store.get_authority(&self.authority_id)?;
        let department_name = store.get_department(&authority.department_id)?.name;
        Ok(AuthorityProfile {
            authority,
            department_name,
        })
    }

    fn select(&self, store: &GrievanceStore, _now: Timestamp) -> GrievanceResult<Vec<Complaint>> {
        store.complaints_for_authority(&self.authority_id)
    }
}

// ── Constituency ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Representative {
    pub politician_id: EntityId,
    pub name: String,
    pub seat_type: SeatType,
    pub party_id: EntityId,
    pub party_name: String,
    pub party_color: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstituencyProfile {
    pub constituency: Constituency,
    /// None while the seat is vacant.
    pub representative: Option<Representative>,
}

pub struct ConstituencySelector {
    pub constituency_id: EntityId,
    pub kind: ConstituencyKind,
}

impl ConstituencySelector {
    /// The constituency, provided it is of the requested kind.
    fn constituency(&self, store: &GrievanceStore) -> GrievanceResult<Constituency> {
        let constituency = store.get_constituency(&self.constituency_id)?;
        if constituency.kind != self.kind {
            return Err(GrievanceError::not_found(
                "constituency",
                format!("{} ({})", self.constituency_id, self.kind.as_str()),
            ));
        }
        Ok(constituency)
    }
}

impl RollupSelector for ConstituencySelector {
    type Entity = ConstituencyProfile;

    fn describe(&self, store: &GrievanceStore, now: Timestamp) -> GrievanceResult<ConstituencyProfile> {
        let constituency = self.constituency(store)?;
        let representative = match current_representative(store, &constituency, now)? {
            Some(politician) => {
                let party = store.get_party(&politician.party_id)?;
                Some(Representative {
                    politician_id: politician.id,
                    name: politician.name,
                    seat_type: politician.seat_type,
                    party_id: party.id,
                    party_name: party.name,
                    party_color: party.color,
                })
            }
            None => None,
        };
        Ok(ConstituencyProfile {
            constituency,
            representative,
        })
    }

    fn select(&self, store: &GrievanceStore, _now: Timestamp) -> GrievanceResult<Vec<Complaint>> {
        store.complaints_for_constituency(self.kind, &self.constituency_id)
    }
}

/// The politician holding the seat at `now`; the latest term wins if the
/// records overlap.
pub fn current_representative(
    store: &GrievanceStore,
    constituency: &Constituency,
    now: Timestamp,
) -> GrievanceResult<Option<Politician>> {
    Ok(store
        .politicians_for_constituency(&constituency.id)?
        .into_iter()
        .find(|p| p.seat_type.constituency_kind() == constituency.kind && p.is_serving_at(now)))
}

// ── Politician ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoliticianProfile {
    pub politician: Politician,
    pub party: PoliticalParty,
    pub constituency: Constituency,
    pub is_serving: bool,
}

pub struct PoliticianSelector {
    pub politician_id: EntityId,
}

impl PoliticianSelector {
    fn seat(&self, store: &GrievanceStore) -> GrievanceResult<(Politician, ConstituencySelector)> {
        let politician = store.get_politician(&self.politician_id)?;
        let seat = ConstituencySelector {
            constituency_id: politician.constituency_id.clone(),
            kind: politician.seat_type.constituency_kind(),
        };
        Ok((politician, seat))
    }
}

impl RollupSelector for PoliticianSelector {
    type Entity = PoliticianProfile;

    fn describe(&self, store: &GrievanceStore, now: Timestamp) -> GrievanceResult<PoliticianProfile> {
        let (politician, seat) = self.seat(store)?;
        let party = store.get_party(&politician.party_id)?;
        let constituency = seat.constituency(store)?;
        let is_serving = politician.is_serving_at(now);
        Ok(PoliticianProfile {
            politician,
            party,
            constituency,
            is_serving,
        })
    }

    fn select(&self, store: &GrievanceStore, now: Timestamp) -> GrievanceResult<Vec<Complaint>> {
        let (_, seat) = self.seat(store)?;
        seat.select(store, now)
    }
}

// ── Party ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyProfile {
    pub party: PoliticalParty,
    pub seats_held: u64,
    pub constituency_ids: Vec<EntityId>,
}

pub struct PartySelector {
    pub party_id: EntityId,
}

impl PartySelector {
    /// Constituencies whose current representative belongs to the party, by id.
    pub fn held_seats(
        &self,
        store: &GrievanceStore,
        now: Timestamp,
    ) -> GrievanceResult<Vec<Constituency>> {
        let mut held: BTreeMap<EntityId, Constituency> = BTreeMap::new();
        for politician in store.politicians_for_party(&self.party_id)? {
            if !politician.is_serving_at(now) || held.contains_key(&politician.constituency_id) {
                continue;
            }
            let constituency = store.get_constituency(&politician.constituency_id)?;
            let holder = current_representative(store, &constituency, now)?;
            if holder.is_some_and(|p| p.party_id == self.party_id) {
                held.insert(constituency.id.clone(), constituency);
            }
        }
        Ok(held.into_values().collect())
    }
}

impl RollupSelector for PartySelector {
    type Entity = PartyProfile;

    fn describe(&self, store: &GrievanceStore, now: Timestamp) -> GrievanceResult<PartyProfile> {
        let party = store.get_party(&self.party_id)?;
        let seats = self.held_seats(store, now)?;
        Ok(PartyProfile {
            party,
            seats_held: seats.len() as u64,
            constituency_ids: seats.into_iter().map(|c| c.id).collect(),
        })
    }

    fn select(&self, store: &GrievanceStore, now: Timestamp) -> GrievanceResult<Vec<Complaint>> {
        let seats = self.held_seats(store, now)?;
        union_of_constituencies(store, &seats)
    }
}

/// Complaints of several constituencies, each counted once even when it maps
/// to both an assembly and a parliamentary seat in the set.
fn union_of_constituencies(
    store: &GrievanceStore,
    constituencies: &[Constituency],
) -> GrievanceResult<Vec<Complaint>> {
    let mut seen = HashSet::new();
    let mut complaints = Vec::new();
    for constituency in constituencies {
        for complaint in store.complaints_for_constituency(constituency.kind, &constituency.id)? {
            if seen.insert(complaint.id.clone()) {
                complaints.push(complaint);
            }
        }
    }
    complaints.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    Ok(complaints)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateBreakdown {
    pub state_id: EntityId,
    pub state_name: String,
    pub seats_held: u64,
    pub metrics: GovernanceMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentHighlight {
    pub department_id: EntityId,
    pub department_name: Option<String>,
    pub resolution_rate: u32,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyReport {
    #[serde(flatten)]
    pub rollup: RollupReport<PartyProfile>,
    pub state_breakdown: Vec<StateBreakdown>,
    pub best_department: Option<DepartmentHighlight>,
    pub worst_department: Option<DepartmentHighlight>,
}

// ── Leaderboards ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub entity_id: EntityId,
    pub name: String,
    pub total_complaints: u64,
    pub performance_score: u32,
    pub performance_level: PerformanceLevel,
}

fn rank_entries(
    scored: Vec<(EntityId, String, GovernanceMetrics)>,
    include_empty: bool,
) -> Vec<LeaderboardEntry> {
    let mut scored: Vec<_> = scored
        .into_iter()
        .filter(|(_, _, m)| include_empty || m.total_complaints > 0)
        .collect();
    scored.sort_by(|(a_id, _, a), (b_id, _, b)| {
        b.performance_score
            .cmp(&a.performance_score)
            .then_with(|| b.total_complaints.cmp(&a.total_complaints))
            .then_with(|| a_id.cmp(b_id))
    });
    scored
        .into_iter()
        .enumerate()
        .map(|(i, (entity_id, name, m))| LeaderboardEntry {
            rank: i + 1,
            entity_id,
            name,
            total_complaints: m.total_complaints,
            performance_score: m.performance_score,
            performance_level: m.performance_level,
        })
        .collect()
}

// ── Composer ───────────────────────────────────────────────────────

pub struct RollupComposer<'a> {
    store: &'a GrievanceStore,
    aggregator: MetricsAggregator,
    recent_limit: usize,
}

impl<'a> RollupComposer<'a> {
    pub fn new(store: &'a GrievanceStore, reporting: &ReportingConfig) -> Self {
        Self {
            store,
            aggregator: MetricsAggregator::new(reporting.clone()),
            recent_limit: reporting.recent_complaints_limit,
        }
    }

    pub fn compose<S: RollupSelector>(
        &self,
        selector: &S,
        now: Timestamp,
    ) -> GrievanceResult<RollupReport<S::Entity>> {
        let entity = selector.describe(self.store, now)?;
        let complaints = selector.select(self.store, now)?;

        let mut report = self.aggregator.compute(&complaints, now);
        let names = self.store.department_names()?;
        for stat in &mut report.department_breakdown {
            stat.department_name = names.get(&stat.department_id).cloned();
        }

        let mut recent = complaints;
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        recent.truncate(self.recent_limit);

        Ok(RollupReport {
            entity,
            report,
            recent_complaints: recent,
        })
    }

    pub fn authority_report(
        &self,
        authority_id: &str,
        now: Timestamp,
    ) -> GrievanceResult<RollupReport<AuthorityProfile>> {
        self.compose(
            &AuthoritySelector {
                authority_id: authority_id.to_string(),
            },
            now,
        )
    }

    pub fn constituency_report(
        &self,
        constituency_id: &str,
        kind: ConstituencyKind,
        now: Timestamp,
    ) -> GrievanceResult<RollupReport<ConstituencyProfile>> {
        self.compose(
            &ConstituencySelector {
                constituency_id: constituency_id.to_string(),
                kind,
            },
            now,
        )
    }

    pub fn politician_report(
        &self,
        politician_id: &str,
        now: Timestamp,
    ) -> GrievanceResult<RollupReport<PoliticianProfile>> {
        self.compose(
            &PoliticianSelector {
                politician_id: politician_id.to_string(),
            },
            now,
        )
    }

    pub fn party_report(&self, party_id: &str, now: Timestamp) -> GrievanceResult<PartyReport> {
        let selector = PartySelector {
            party_id: party_id.to_string(),
        };
        let rollup = self.compose(&selector, now)?;
        let seats = selector.held_seats(self.store, now)?;

        let mut by_state: BTreeMap<EntityId, (String, Vec<Constituency>)> = BTreeMap::new();
        for constituency in seats {
            by_state
                .entry(constituency.state_id.clone())
                .or_insert_with(|| (constituency.state_name.clone(), Vec::new()))
                .1
                .push(constituency);
        }
        let mut state_breakdown = Vec::with_capacity(by_state.len());
        for (state_id, (state_name, constituencies)) in by_state {
            let complaints = union_of_constituencies(self.store, &constituencies)?;
            state_breakdown.push(StateBreakdown {
                state_id,
                state_name,
                seats_held: constituencies.len() as u64,
                metrics: governance_metrics(&complaints),
            });
        }

        let highlights: Vec<DepartmentHighlight> = rollup
            .report
            .department_breakdown
            .iter()
            .map(|d| DepartmentHighlight {
                department_id: d.department_id.clone(),
                department_name: d.department_name.clone(),
                resolution_rate: d.resolution_rate,
                total: d.total,
            })
            .collect();
        let best_department = highlights
            .iter()
            .max_by(|a, b| {
                a.resolution_rate
                    .cmp(&b.resolution_rate)
                    .then_with(|| a.total.cmp(&b.total))
                    .then_with(|| b.department_id.cmp(&a.department_id))
            })
            .cloned();
        let worst_department = highlights
            .iter()
            .min_by(|a, b| {
                a.resolution_rate
                    .cmp(&b.resolution_rate)
                    .then_with(|| b.total.cmp(&a.total))
                    .then_with(|| a.department_id.cmp(&b.department_id))
            })
            .cloned();

        Ok(PartyReport {
            rollup,
            state_breakdown,
            best_department,
            worst_department,
        })
    }

    /// Authorities ranked by score, optionally within one department.
    pub fn authority_leaderboard(
        &self,
        department_id: Option<&str>,
        include_empty: bool,
    ) -> GrievanceResult<Vec<LeaderboardEntry>> {
        let mut scored = Vec::new();
        for authority in self.store.authorities(department_id)? {
            let complaints = self.store.complaints_for_authority(&authority.id)?;
            scored.push((authority.id, authority.name, governance_metrics(&complaints)));
        }
        Ok(rank_entries(scored, include_empty))
    }

    pub fn party_leaderboard(
        &self,
        include_empty: bool,
        now: Timestamp,
    ) -> GrievanceResult<Vec<LeaderboardEntry>> {
        let mut scored = Vec::new();
        for party in self.store.parties()? {
            let selector = PartySelector {
                party_id: party.id.clone(),
            };
            let complaints = selector.select(self.store, now)?;
            scored.push((party.id, party.name, governance_metrics(&complaints)));
        }
        Ok(rank_entries(scored, include_empty))
    }
}
