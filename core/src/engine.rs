//! The grievance engine: the one entry point callers hold.
//!
//! RULES:
//!   - Every write goes through a store transaction together with its audit entry.
//!   - Intake, transitions and reports read the engine's clock.
//!   - Escalation evaluation takes `now` explicitly so sweeps can be replayed.

use crate::{
    clock::{Clock, FixedClock},
    complaint::{Complaint, ComplaintStatus, NewComplaint, StatusLogEntry},
    config::{PortalConfig, ReferenceData},
    error::{GrievanceError, GrievanceResult},
    escalation::{self, EscalationCheck, EscalationSweep},
    lifecycle::{self, TransitionRequest},
    metrics::{MetricsAggregator, MetricsReport},
    reference::{Authority, ConstituencyKind, EscalationRule},
    rng::SuffixRng,
    rollup::{
        AuthorityProfile, ConstituencyProfile, LeaderboardEntry, PartyReport, PoliticianProfile,
        RollupComposer, RollupReport,
    },
    store::GrievanceStore,
    ticket::TicketGenerator,
    types::Timestamp,
};

/// Attempts before giving up on a fresh ticket number.
const TICKET_ATTEMPTS: usize = 16;

pub struct GrievanceEngine {
    store: GrievanceStore,
    config: PortalConfig,
    clock: Box<dyn Clock>,
    tickets: TicketGenerator,
}

impl GrievanceEngine {
    pub fn new(store: GrievanceStore, config: PortalConfig, clock: Box<dyn Clock>) -> Self {
        Self {
            store,
            config,
            clock,
            tickets: TicketGenerator::new(SuffixRng::from_entropy()),
        }
    }

    /// Replace the ticket suffix stream with a seeded one. Tests use this to
    /// get reproducible ticket numbers.
    pub fn with_ticket_seed(mut self, seed: u64) -> Self {
        self.tickets = TicketGenerator::new(SuffixRng::seeded(seed));
        self
    }

    /// Migrate the store and load the reference catalogs in one go.
    pub fn build(
        store: GrievanceStore,
        config: PortalConfig,
        reference: &ReferenceData,
        clock: Box<dyn Clock>,
    ) -> GrievanceResult<Self> {
        store.migrate()?;
        store.seed_reference(reference)?;
        Ok(Self::new(store, config, clock))
    }

    /// In-memory engine on a manual clock with default config and a seeded
    /// ticket stream.
    pub fn build_test(reference: &ReferenceData, clock: FixedClock) -> GrievanceResult<Self> {
        let store = GrievanceStore::in_memory()?;
        let engine = Self::build(store, PortalConfig::default_test(), reference, Box::new(clock))?;
        Ok(engine.with_ticket_seed(42))
    }

    pub fn store(&self) -> &GrievanceStore {
        &self.store
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // ── Intake ─────────────────────────────────────────────────────

    pub fn create_complaint(&mut self, input: NewComplaint) -> GrievanceResult<Complaint> {
        if input.citizen_id.trim().is_empty() {
            return Err(GrievanceError::InvalidInput("citizen id is required".into()));
        }
        if input.title.trim().is_empty() {
            return Err(GrievanceError::InvalidInput("title is required".into()));
        }
        if input.city_id.trim().is_empty() {
            return Err(GrievanceError::InvalidInput("city id is required".into()));
        }

        let now = self.clock.now();
        let tickets = &mut self.tickets;
        let complaint = self.store.atomically(|s| {
            s.get_department(&input.department_id)?;

            let mut ticket_number = None;
            for _ in 0..TICKET_ATTEMPTS {
                let candidate = tickets.next(now);
                if !s.ticket_exists(&candidate)? {
                    ticket_number = Some(candidate);
                    break;
                }
                log::warn!("ticket collision on {candidate}, retrying");
            }
            let ticket_number = ticket_number.ok_or_else(|| {
                GrievanceError::Other(anyhow::anyhow!(
                    "no free ticket number after {TICKET_ATTEMPTS} attempts"
                ))
            })?;

            let complaint = Complaint {
                id: uuid::Uuid::new_v4().to_string(),
                ticket_number,
                citizen_id: input.citizen_id,
                title: input.title,
                description: input.description,
                department_id: input.department_id,
                priority: input.priority,
                status: ComplaintStatus::Submitted,
                created_at: now,
                viewed_at: None,
                resolved_at: None,
                closed_at: None,
                escalation_due_at: None,
                current_escalation_level: 1,
                level_entered_at: now,
                assigned_authority_id: None,
                city_id: input.city_id,
                ward_id: input.ward_id,
                assembly_constituency_id: input.assembly_constituency_id,
                parliamentary_constituency_id: input.parliamentary_constituency_id,
            };
            s.insert_complaint(&complaint)?;
            s.append_status_log(&StatusLogEntry {
                id: None,
                complaint_id: complaint.id.clone(),
                status: ComplaintStatus::Submitted,
                notes: Some("Complaint submitted".into()),
                authority_id: None,
                created_at: now,
            })?;
            Ok(complaint)
        })?;

        log::info!(
            "complaint {} filed with {}",
            complaint.ticket_number,
            complaint.department_id
        );
        Ok(complaint)
    }

    // ── Assignment ─────────────────────────────────────────────────

    pub fn assign_authority(
        &self,
        complaint_id: &str,
        authority_id: &str,
    ) -> GrievanceResult<Complaint> {
        self.store.atomically(|s| {
            let mut complaint = s.get_complaint(complaint_id)?;
            let authority = s.get_authority(authority_id)?;
            if authority.department_id != complaint.department_id {
                return Err(GrievanceError::InvalidInput(format!(
                    "authority {} belongs to {}, complaint {} to {}",
                    authority.id,
                    authority.department_id,
                    complaint.ticket_number,
                    complaint.department_id
                )));
            }
            s.write_assignment(&complaint.id, &authority.id)?;
            complaint.assigned_authority_id = Some(authority.id);
            log::info!(
                "{} assigned to {}",
                complaint.ticket_number,
                authority_id
            );
            Ok(complaint)
        })
    }

    /// Assign the best-placed active authority at the complaint's current level.
    pub fn route_complaint(&self, complaint_id: &str) -> GrievanceResult<Complaint> {
        let complaint = self.store.get_complaint(complaint_id)?;
        let candidates = self
            .store
            .active_authorities_at_level(&complaint.department_id, complaint.current_escalation_level)?;
        let chosen = pick_authority(&complaint, &candidates).ok_or_else(|| {
            GrievanceError::not_found(
                "authority",
                format!(
                    "{} level {} for {}",
                    complaint.department_id,
                    complaint.current_escalation_level,
                    complaint.ticket_number
                ),
            )
        })?;
        let authority_id = chosen.id.clone();
        self.assign_authority(complaint_id, &authority_id)
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    pub fn transition_status(&self, request: &TransitionRequest) -> GrievanceResult<Complaint> {
        lifecycle::transition_status(&self.store, request, self.clock.now())
    }

    pub fn status_history(&self, complaint_id: &str) -> GrievanceResult<Vec<StatusLogEntry>> {
        self.store.get_complaint(complaint_id)?;
        self.store.status_log(complaint_id)
    }

    // ── Escalation ─────────────────────────────────────────────────

    pub fn evaluate_escalation(
        &self,
        complaint_id: &str,
        now: Timestamp,
    ) -> GrievanceResult<EscalationCheck> {
        escalation::evaluate_escalation(&self.store, complaint_id, now)
    }

    pub fn evaluate_open_escalations(&self, now: Timestamp) -> GrievanceResult<EscalationSweep> {
        escalation::sweep_open_complaints(&self.store, now)
    }

    pub fn add_escalation_rule(&self, rule: &EscalationRule) -> GrievanceResult<i64> {
        let rule_id = self.store.insert_escalation_rule(rule)?;
        log::info!(
            "rule {rule_id}: {} level {} -> {} after {} days",
            rule.department_id,
            rule.from_level,
            rule.to_level,
            rule.days_to_escalate
        );
        Ok(rule_id)
    }

    pub fn deactivate_escalation_rule(&self, rule_id: i64) -> GrievanceResult<()> {
        self.store.deactivate_escalation_rule(rule_id)?;
        log::info!("rule {rule_id} deactivated");
        Ok(())
    }

    // ── Reporting ──────────────────────────────────────────────────

    pub fn compute_metrics(&self, complaints: &[Complaint]) -> MetricsReport {
        MetricsAggregator::new(self.config.reporting.clone()).compute(complaints, self.clock.now())
    }

    fn composer(&self) -> RollupComposer<'_> {
        RollupComposer::new(&self.store, &self.config.reporting)
    }

    pub fn authority_report(
        &self,
        authority_id: &str,
    ) -> GrievanceResult<RollupReport<AuthorityProfile>> {
        self.composer().authority_report(authority_id, self.clock.now())
    }

    pub fn constituency_report(
        &self,
        constituency_id: &str,
        kind: ConstituencyKind,
    ) -> GrievanceResult<RollupReport<ConstituencyProfile>> {
        self.composer()
            .constituency_report(constituency_id, kind, self.clock.now())
    }

    pub fn politician_report(
        &self,
        politician_id: &str,
    ) -> GrievanceResult<RollupReport<PoliticianProfile>> {
        self.composer().politician_report(politician_id, self.clock.now())
    }

    pub fn party_report(&self, party_id: &str) -> GrievanceResult<PartyReport> {
        self.composer().party_report(party_id, self.clock.now())
    }

    pub fn authority_leaderboard(
        &self,
        department_id: Option<&str>,
    ) -> GrievanceResult<Vec<LeaderboardEntry>> {
        self.composer()
            .authority_leaderboard(department_id, self.config.leaderboard.include_empty_entities)
    }

    pub fn party_leaderboard(&self) -> GrievanceResult<Vec<LeaderboardEntry>> {
        self.composer().party_leaderboard(
            self.config.leaderboard.include_empty_entities,
            self.clock.now(),
        )
    }
}

/// Ward match beats city match beats no jurisdiction. An authority bound to a
/// different ward or city is never a candidate.
fn pick_authority<'a>(complaint: &Complaint, candidates: &'a [Authority]) -> Option<&'a Authority> {
    candidates
        .iter()
        .filter_map(|a| {
            let rank = match (&a.ward_id, &a.city_id) {
                (Some(ward), _) if complaint.ward_id.as_ref() == Some(ward) => 0,
                (Some(_), _) => return None,
                (None, Some(city)) if *city == complaint.city_id => 1,
                (None, Some(_)) => return None,
                (None, None) => 2,
            };
            Some((rank, a))
        })
        .min_by(|(ra, a), (rb, b)| ra.cmp(rb).then_with(|| a.id.cmp(&b.id)))
        .map(|(_, a)| a)
}
