//! Governance metrics aggregator: formula, vacuous values, breakdown and trend.

use chrono::{DateTime, Duration, TimeZone, Utc};
use grievance_core::{
    clock::FixedClock,
    complaint::{Complaint, ComplaintStatus, NewComplaint, Priority},
    config::{ReferenceData, ReportingConfig},
    engine::GrievanceEngine,
    lifecycle::TransitionRequest,
    metrics::{compute_metrics, governance_metrics, MetricsAggregator, PerformanceLevel},
    reference::{Authority, Department, EscalationRule},
};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap()
}

fn complaint(n: usize, department: &str, status: ComplaintStatus) -> Complaint {
    let created = base() + Duration::hours(n as i64);
    Complaint {
        id: format!("c-{n:02}"),
        ticket_number: format!("GRV-TEST-{n:04}"),
        citizen_id: "citizen-1".into(),
        title: format!("Complaint {n}"),
        description: String::new(),
        department_id: department.into(),
        priority: Priority::Medium,
        status,
        created_at: created,
        viewed_at: None,
        resolved_at: None,
        closed_at: None,
        escalation_due_at: None,
        current_escalation_level: 1,
        level_entered_at: created,
        assigned_authority_id: Some("auth-1".into()),
        city_id: "city-1".into(),
        ward_id: None,
        assembly_constituency_id: None,
        parliamentary_constituency_id: None,
    }
}

/// Resolved two days after filing, due after `due_days`.
fn resolved(n: usize, department: &str, due_days: i64) -> Complaint {
    let mut c = complaint(n, department, ComplaintStatus::Resolved);
    c.resolved_at = Some(c.created_at + Duration::days(2));
    c.escalation_due_at = Some(c.created_at + Duration::days(due_days));
    c
}

/// 8 of 10 resolved, 6 of 8 on time, 1 escalated.
fn scenario() -> Vec<Complaint> {
    let mut complaints = Vec::new();
    for n in 0..6 {
        complaints.push(resolved(n, "dept-water", 7));
    }
    complaints.push(resolved(6, "dept-roads", 1));
    complaints.push(resolved(7, "dept-roads", 1));
    let mut escalated = complaint(8, "dept-roads", ComplaintStatus::Escalated);
    escalated.current_escalation_level = 2;
    complaints.push(escalated);
    complaints.push(complaint(9, "dept-roads", ComplaintStatus::Submitted));
    complaints
}

/// 0.40·80 + 0.35·75 + 0.25·90 = 80.75, rounded to 81: excellent.
#[test]
fn worked_example_scores_81() {
    let m = governance_metrics(&scenario());
    assert_eq!(m.total_complaints, 10);
    assert_eq!(m.resolved_complaints, 8);
    assert_eq!(m.pending_complaints, 1);
    assert_eq!(m.escalated_complaints, 1);
    assert_eq!(m.resolution_rate, 80);
    assert_eq!(m.on_time_resolutions, 6);
    assert_eq!(m.on_time_eligible, 8);
    assert_eq!(m.on_time_resolution_rate, 75);
    assert!((m.non_escalation_rate - 90.0).abs() < 1e-9);
    assert_eq!(m.avg_response_time_days, 2.0);
    assert_eq!(m.performance_score, 81);
    assert_eq!(m.performance_level, PerformanceLevel::Excellent);
}

/// No complaints: vacuous 100% rates, zero counts, no error.
#[test]
fn empty_set_is_vacuously_perfect() {
    let report = compute_metrics(&[], base());
    let m = &report.metrics;
    assert_eq!(m.total_complaints, 0);
    assert_eq!(m.resolution_rate, 100);
    assert_eq!(m.on_time_resolution_rate, 100);
    assert_eq!(m.non_escalation_rate, 100.0);
    assert_eq!(m.avg_response_time_days, 0.0);
    assert_eq!(m.performance_score, 100);
    assert_eq!(m.performance_level, PerformanceLevel::Excellent);
    assert!(report.department_breakdown.is_empty());
    assert_eq!(report.monthly_trend.len(), 6, "trend still lists every month");
    assert!(report.monthly_trend.iter().all(|p| p.filed == 0 && p.resolved == 0));
}

/// CLOSED counts as resolved; REJECTED counts as neither resolved nor pending.
#[test]
fn closed_and_rejected_are_classified() {
    let mut closed = resolved(0, "dept-water", 7);
    closed.status = ComplaintStatus::Closed;
    closed.closed_at = Some(closed.created_at + Duration::days(3));
    let rejected = complaint(1, "dept-water", ComplaintStatus::Rejected);
    let viewed = complaint(2, "dept-water", ComplaintStatus::Viewed);

    let m = governance_metrics(&[closed, rejected, viewed]);
    assert_eq!(m.resolved_complaints, 1);
    assert_eq!(m.pending_complaints, 1);
    assert_eq!(m.resolution_rate, 33);
}

/// Resolved complaints that never had a due date do not dilute the on-time rate.
#[test]
fn on_time_rate_ignores_resolutions_without_due_date() {
    let mut undated = resolved(0, "dept-water", 7);
    undated.escalation_due_at = None;
    let late = resolved(1, "dept-water", 1);

    let m = governance_metrics(&[undated.clone()]);
    assert_eq!(m.on_time_eligible, 0);
    assert_eq!(m.on_time_resolution_rate, 100);

    let m = governance_metrics(&[undated, late]);
    assert_eq!(m.on_time_eligible, 1);
    assert_eq!(m.on_time_resolution_rate, 0);
}

/// A complaint escalated and then resolved still counts as escalated.
#[test]
fn escalation_history_counts_after_resolution() {
    let mut c = resolved(0, "dept-water", 30);
    c.current_escalation_level = 2;
    let m = governance_metrics(&[c, complaint(1, "dept-water", ComplaintStatus::Submitted)]);
    assert_eq!(m.escalated_complaints, 1);
    assert!((m.non_escalation_rate - 50.0).abs() < 1e-9);
}

/// Busiest department first, with per-department resolution rates.
#[test]
fn department_breakdown_sorted_by_volume() {
    let report = compute_metrics(&scenario(), base());
    let rows = &report.department_breakdown;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].department_id, "dept-water");
    assert_eq!(rows[0].total, 6);
    assert_eq!(rows[0].resolution_rate, 100);
    assert_eq!(rows[1].department_id, "dept-roads");
    assert_eq!(rows[1].total, 4);
    assert_eq!(rows[1].resolved, 2);
    assert_eq!(rows[1].pending, 1);
    assert_eq!(rows[1].resolution_rate, 50);
}

/// Trailing months, oldest first, bucketed on the portal's local calendar.
#[test]
fn monthly_trend_uses_local_calendar() {
    let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
    let mut late_september = complaint(0, "dept-water", ComplaintStatus::Submitted);
    // 20:00 UTC on 30 Sep is 01:30 on 1 Oct at UTC+05:30.
    late_september.created_at = Utc.with_ymd_and_hms(2026, 9, 30, 20, 0, 0).unwrap();
    let mut july = resolved(1, "dept-water", 7);
    july.created_at = Utc.with_ymd_and_hms(2026, 7, 10, 9, 0, 0).unwrap();
    july.resolved_at = Some(Utc.with_ymd_and_hms(2026, 8, 2, 9, 0, 0).unwrap());
    let complaints = vec![late_september, july];

    let utc = compute_metrics(&complaints, now);
    let months: Vec<&str> = utc.monthly_trend.iter().map(|p| p.month.as_str()).collect();
    assert_eq!(
        months,
        vec!["2026-05", "2026-06", "2026-07", "2026-08", "2026-09", "2026-10"]
    );
    assert_eq!(utc.monthly_trend[5].label, "Oct 2026");
    assert_eq!(utc.monthly_trend[2].filed, 1, "July filing");
    assert_eq!(utc.monthly_trend[3].resolved, 1, "August resolution");
    assert_eq!(utc.monthly_trend[4].filed, 1, "September in UTC");

    let ist = MetricsAggregator::new(ReportingConfig {
        utc_offset_minutes: 330,
        trend_months: 3,
        recent_complaints_limit: 10,
    })
    .compute(&complaints, now);
    assert_eq!(ist.monthly_trend.len(), 3);
    assert_eq!(ist.monthly_trend[0].month, "2026-08");
    assert_eq!(ist.monthly_trend[1].filed, 0, "nothing left in September");
    assert_eq!(ist.monthly_trend[2].filed, 1, "October in local time");
}

/// A late resolution with no escalation sweep in between still counts
/// against the on-time rate.
#[test]
fn late_resolution_without_sweep_is_not_on_time() {
    let reference = ReferenceData {
        departments: vec![Department {
            id: "dept-water".into(),
            name: "Water Supply".into(),
            code: None,
        }],
        escalation_rules: vec![EscalationRule {
            id: None,
            department_id: "dept-water".into(),
            from_level: 1,
            to_level: 2,
            days_to_escalate: 7,
            is_active: true,
        }],
        authorities: vec![Authority {
            id: "auth-1".into(),
            name: "Engineer".into(),
            designation: "Junior Engineer".into(),
            department_id: "dept-water".into(),
            level: 1,
            ward_id: None,
            city_id: None,
            district_id: None,
            is_active: true,
        }],
        ..ReferenceData::default()
    };
    let clock = FixedClock::at(base());
    let mut engine = GrievanceEngine::build_test(&reference, clock.clone()).expect("engine");
    let complaint = engine
        .create_complaint(NewComplaint {
            citizen_id: "citizen-1".into(),
            title: "Burst main".into(),
            department_id: "dept-water".into(),
            city_id: "city-1".into(),
            ..NewComplaint::default()
        })
        .unwrap();
    engine.assign_authority(&complaint.id, "auth-1").unwrap();

    clock.set(base() + Duration::days(20));
    for status in [
        ComplaintStatus::Viewed,
        ComplaintStatus::InProgress,
        ComplaintStatus::Resolved,
    ] {
        engine
            .transition_status(&TransitionRequest::new(&complaint.id, status))
            .unwrap();
    }

    let stored = engine.store().get_complaint(&complaint.id).unwrap();
    assert_eq!(stored.escalation_due_at, Some(base() + Duration::days(7)));

    let m = engine.authority_report("auth-1").unwrap().report.metrics;
    assert_eq!(m.on_time_eligible, 1);
    assert_eq!(m.on_time_resolutions, 0);
    assert_eq!(m.on_time_resolution_rate, 0);
    assert!(m.performance_score < 100, "late resolution must cost score: {}", m.performance_score);
}
