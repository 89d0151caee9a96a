//! Rollup composers: authority, constituency, politician and party reports,
//! plus leaderboards.

use chrono::{DateTime, Duration, TimeZone, Utc};
use grievance_core::{
    clock::FixedClock,
    complaint::{Complaint, ComplaintStatus, NewComplaint},
    config::ReferenceData,
    engine::GrievanceEngine,
    error::GrievanceError,
    lifecycle::TransitionRequest,
    metrics::PerformanceLevel,
    reference::{
        Authority, Constituency, ConstituencyKind, Department, PoliticalParty, Politician,
        SeatType,
    },
    rollup::RollupComposer,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

fn authority(id: &str, department: &str) -> Authority {
    Authority {
        id: id.into(),
        name: format!("Officer {id}"),
        designation: "Engineer".into(),
        department_id: department.into(),
        level: 1,
        ward_id: None,
        city_id: None,
        district_id: None,
        is_active: true,
    }
}

fn party(id: &str, name: &str) -> PoliticalParty {
    PoliticalParty {
        id: id.into(),
        name: name.into(),
        abbreviation: None,
        color: Some("#123456".into()),
    }
}

fn constituency(id: &str, kind: ConstituencyKind, state: &str) -> Constituency {
    Constituency {
        id: id.into(),
        name: id.into(),
        kind,
        state_id: format!("state-{state}"),
        state_name: state.to_uppercase(),
    }
}

fn politician(
    id: &str,
    party: &str,
    seat: SeatType,
    constituency: &str,
    term: (DateTime<Utc>, Option<DateTime<Utc>>),
) -> Politician {
    Politician {
        id: id.into(),
        name: format!("Hon. {id}"),
        party_id: party.into(),
        seat_type: seat,
        constituency_id: constituency.into(),
        term_start: term.0,
        term_end: term.1,
        is_current: term.1.is_none(),
    }
}

fn reference() -> ReferenceData {
    use ConstituencyKind::{Assembly, Parliamentary};
    ReferenceData {
        departments: vec![
            Department {
                id: "dept-water".into(),
                name: "Water Supply".into(),
                code: None,
            },
            Department {
                id: "dept-roads".into(),
                name: "Roads".into(),
                code: None,
            },
        ],
        authorities: vec![
            authority("auth-1", "dept-water"),
            authority("auth-2", "dept-water"),
            authority("auth-3", "dept-roads"),
            authority("auth-4", "dept-roads"),
        ],
        parties: vec![
            party("party-civic", "Civic Progress"),
            party("party-green", "Green Front"),
            party("party-peoples", "Peoples Alliance"),
        ],
        constituencies: vec![
            constituency("ac-central", Assembly, "mh"),
            constituency("ac-kothrud", Assembly, "mh"),
            constituency("ac-panaji", Assembly, "ga"),
            constituency("pc-goa", Parliamentary, "ga"),
            constituency("pc-pune", Parliamentary, "mh"),
        ],
        politicians: vec![
            politician("mla-central", "party-civic", SeatType::Mla, "ac-central", (date(2024, 11, 23), None)),
            politician("mla-kothrud", "party-peoples", SeatType::Mla, "ac-kothrud", (date(2024, 11, 23), None)),
            politician(
                "mla-panaji-old",
                "party-peoples",
                SeatType::Mla,
                "ac-panaji",
                (date(2017, 3, 11), Some(date(2022, 3, 10))),
            ),
            politician("mla-panaji", "party-civic", SeatType::Mla, "ac-panaji", (date(2022, 3, 10), None)),
            politician("mp-pune", "party-civic", SeatType::Mp, "pc-pune", (date(2024, 6, 4), None)),
        ],
        ..ReferenceData::default()
    }
}

struct Portal {
    engine: GrievanceEngine,
    complaints: Vec<Complaint>,
}

fn file(
    engine: &mut GrievanceEngine,
    clock: &FixedClock,
    department: &str,
    assembly: Option<&str>,
    parliamentary: Option<&str>,
) -> Complaint {
    clock.advance(Duration::hours(1));
    engine
        .create_complaint(NewComplaint {
            citizen_id: "citizen-3".into(),
            title: "Civic issue".into(),
            department_id: department.into(),
            city_id: "city-pune".into(),
            assembly_constituency_id: assembly.map(Into::into),
            parliamentary_constituency_id: parliamentary.map(Into::into),
            ..NewComplaint::default()
        })
        .expect("create complaint")
}

/// c1 resolved by auth-1, c2 pending with auth-1, c3 pending with auth-3,
/// c4 in Goa, c5 mapped to no constituency.
fn portal() -> Portal {
    let clock = FixedClock::at(now() - Duration::days(20));
    let mut engine = GrievanceEngine::build_test(&reference(), clock.clone()).expect("engine");

    let c1 = file(&mut engine, &clock, "dept-water", Some("ac-central"), Some("pc-pune"));
    let c2 = file(&mut engine, &clock, "dept-water", Some("ac-central"), Some("pc-pune"));
    let c3 = file(&mut engine, &clock, "dept-roads", Some("ac-kothrud"), Some("pc-pune"));
    let c4 = file(&mut engine, &clock, "dept-roads", Some("ac-panaji"), Some("pc-goa"));
    let c5 = file(&mut engine, &clock, "dept-water", None, None);

    engine.assign_authority(&c1.id, "auth-1").unwrap();
    engine.assign_authority(&c2.id, "auth-1").unwrap();
    engine.assign_authority(&c3.id, "auth-3").unwrap();
    for status in [
        ComplaintStatus::Viewed,
        ComplaintStatus::InProgress,
        ComplaintStatus::Resolved,
    ] {
        clock.advance(Duration::hours(6));
        engine
            .transition_status(&TransitionRequest::new(&c1.id, status).by("auth-1"))
            .unwrap();
    }

    clock.set(now());
    Portal {
        engine,
        complaints: vec![c1, c2, c3, c4, c5],
    }
}

/// Constituency report carries the sitting representative and newest-first
/// recent complaints.
#[test]
fn constituency_report_names_representative() {
    let p = portal();
    let report = p
        .engine
        .constituency_report("ac-central", ConstituencyKind::Assembly)
        .unwrap();

    assert_eq!(report.report.metrics.total_complaints, 2);
    assert_eq!(report.report.metrics.resolved_complaints, 1);
    let rep = report.entity.representative.expect("seat is held");
    assert_eq!(rep.politician_id, "mla-central");
    assert_eq!(rep.party_name, "Civic Progress");
    assert_eq!(rep.party_color.as_deref(), Some("#123456"));

    let recent: Vec<&str> = report.recent_complaints.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(recent, vec![p.complaints[1].id.as_str(), p.complaints[0].id.as_str()]);
    assert_eq!(
        report.report.department_breakdown[0].department_name.as_deref(),
        Some("Water Supply")
    );
}

/// Asking for an assembly seat as parliamentary is NotFound.
#[test]
fn constituency_kind_must_match() {
    let p = portal();
    let err = p
        .engine
        .constituency_report("ac-central", ConstituencyKind::Parliamentary)
        .unwrap_err();
    assert!(
        matches!(err, GrievanceError::NotFound { entity: "constituency", .. }),
        "expected NotFound(constituency), got {err:?}"
    );
}

/// A vacant seat reports its complaints with no representative.
#[test]
fn vacant_seat_has_no_representative() {
    let p = portal();
    let report = p
        .engine
        .constituency_report("pc-goa", ConstituencyKind::Parliamentary)
        .unwrap();
    assert!(report.entity.representative.is_none());
    assert_eq!(report.report.metrics.total_complaints, 1);
}

/// Party rollup: union of held seats, each complaint counted once.
#[test]
fn party_report_unions_held_seats() {
    let p = portal();
    let report = p.engine.party_report("party-civic").unwrap();
    let profile = &report.rollup.entity;
    assert_eq!(profile.seats_held, 3);
    assert_eq!(profile.constituency_ids, vec!["ac-central", "ac-panaji", "pc-pune"]);

    // c1..c4; c1-c3 sit in both ac-* and pc-pune but count once.
    let metrics = &report.rollup.report.metrics;
    assert_eq!(metrics.total_complaints, 4);
    assert_eq!(metrics.resolved_complaints, 1);
    assert_eq!(metrics.resolution_rate, 25);

    let states: Vec<(&str, u64, u64)> = report
        .state_breakdown
        .iter()
        .map(|s| (s.state_id.as_str(), s.seats_held, s.metrics.total_complaints))
        .collect();
    assert_eq!(states, vec![("state-ga", 1, 1), ("state-mh", 2, 3)]);

    let best = report.best_department.expect("best department");
    let worst = report.worst_department.expect("worst department");
    assert_eq!(best.department_id, "dept-water");
    assert_eq!(best.resolution_rate, 50);
    assert_eq!(worst.department_id, "dept-roads");
    assert_eq!(worst.resolution_rate, 0);
}

/// A past holder's party loses the seat; only the sitting member counts.
#[test]
fn former_representatives_do_not_count() {
    let p = portal();
    let report = p.engine.party_report("party-peoples").unwrap();
    assert_eq!(report.rollup.entity.constituency_ids, vec!["ac-kothrud"]);
    assert_eq!(report.rollup.report.metrics.total_complaints, 1);
}

/// Every complaint in a party rollup belongs to one of its seats' rollups.
#[test]
fn party_complaints_are_covered_by_its_constituencies() {
    let p = portal();
    let party = p.engine.party_report("party-civic").unwrap();
    let mut covered = std::collections::HashSet::new();
    for id in &party.rollup.entity.constituency_ids {
        let kind = if id.starts_with("ac-") {
            ConstituencyKind::Assembly
        } else {
            ConstituencyKind::Parliamentary
        };
        for c in p.engine.store().complaints_for_constituency(kind, id).unwrap() {
            covered.insert(c.id);
        }
    }
    for c in &party.rollup.recent_complaints {
        assert!(covered.contains(&c.id), "{} not in any held seat", c.ticket_number);
    }
    assert_eq!(covered.len() as u64, party.rollup.report.metrics.total_complaints);
}

/// A party holding no seats gets the vacuous report, not an error.
#[test]
fn party_without_seats_is_vacuous() {
    let p = portal();
    let report = p.engine.party_report("party-green").unwrap();
    assert_eq!(report.rollup.entity.seats_held, 0);
    assert_eq!(report.rollup.report.metrics.total_complaints, 0);
    assert_eq!(report.rollup.report.metrics.performance_score, 100);
    assert!(report.state_breakdown.is_empty());
    assert!(report.best_department.is_none());

    assert_eq!(p.engine.party_report("party-ghost").unwrap_err().kind(), "not_found");
}

/// Politician rollup follows the seat; serving status is reported.
#[test]
fn politician_report_follows_seat() {
    let p = portal();
    let mp = p.engine.politician_report("mp-pune").unwrap();
    assert!(mp.entity.is_serving);
    assert_eq!(mp.entity.party.id, "party-civic");
    assert_eq!(mp.report.metrics.total_complaints, 3);

    let former = p.engine.politician_report("mla-panaji-old").unwrap();
    assert!(!former.entity.is_serving);
    assert_eq!(former.entity.constituency.id, "ac-panaji");
}

/// Authority report includes only assigned complaints and the department name.
#[test]
fn authority_report_counts_assigned_complaints() {
    let p = portal();
    let report = p.engine.authority_report("auth-1").unwrap();
    assert_eq!(report.entity.department_name, "Water Supply");
    assert_eq!(report.report.metrics.total_complaints, 2);
    assert_eq!(report.report.metrics.resolution_rate, 50);
    assert_eq!(report.report.metrics.performance_score, 80);

    let idle = p.engine.authority_report("auth-2").unwrap();
    assert_eq!(idle.report.metrics.total_complaints, 0);
    assert_eq!(idle.report.metrics.performance_level, PerformanceLevel::Excellent);

    assert_eq!(p.engine.authority_report("auth-ghost").unwrap_err().kind(), "not_found");
}

/// Leaderboards rank by score, then volume, then id.
#[test]
fn leaderboards_rank_by_score() {
    let p = portal();

    let parties: Vec<(String, u32)> = p
        .engine
        .party_leaderboard()
        .unwrap()
        .into_iter()
        .map(|e| (e.entity_id, e.performance_score))
        .collect();
    assert_eq!(
        parties,
        vec![
            ("party-green".to_string(), 100),
            ("party-civic".to_string(), 70),
            ("party-peoples".to_string(), 60),
        ]
    );

    let composer = RollupComposer::new(p.engine.store(), &p.engine.config().reporting);
    let busy = composer.authority_leaderboard(None, false).unwrap();
    let ids: Vec<&str> = busy.iter().map(|e| e.entity_id.as_str()).collect();
    assert_eq!(ids, vec!["auth-1", "auth-3"]);
    assert_eq!(busy[0].rank, 1);
    assert_eq!(busy[1].performance_level, PerformanceLevel::Good);

    let roads = p.engine.authority_leaderboard(Some("dept-roads")).unwrap();
    let ids: Vec<&str> = roads.iter().map(|e| e.entity_id.as_str()).collect();
    assert_eq!(ids, vec!["auth-4", "auth-3"], "idle authority scores a vacuous 100");
}
