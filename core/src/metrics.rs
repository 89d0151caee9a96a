//! Governance metrics aggregator.
//!
//! One pure function scores any collection of complaints. Rollups differ only
//! in which complaints they hand over; the 40/35/25 weighting below is the
//! single governing formula for every dimension.
//!
//! Empty collections are not an error: every rate is a vacuous 100.

use crate::{
    complaint::Complaint,
    config::ReportingConfig,
    types::{days_between, DepartmentId, Timestamp},
};
use chrono::{DateTime, Datelike, FixedOffset, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Score weights, in percent.
pub const RESOLUTION_WEIGHT: u32 = 40;
pub const ON_TIME_WEIGHT: u32 = 35;
pub const NON_ESCALATION_WEIGHT: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceLevel {
    Excellent,
    Good,
    Average,
    Poor,
}

impl PerformanceLevel {
    pub fn for_score(score: u32) -> Self {
        if score >= 80 {
            Self::Excellent
        } else if score >= 60 {
            Self::Good
        } else if score >= 40 {
            Self::Average
        } else {
            Self::Poor
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernanceMetrics {
    pub total_complaints: u64,
    pub resolved_complaints: u64,
    pub pending_complaints: u64,
    pub escalated_complaints: u64,
    pub resolution_rate: u32,
    pub on_time_resolutions: u64,
    /// Resolved complaints that carried a due date (the on-time denominator).
    pub on_time_eligible: u64,
    pub on_time_resolution_rate: u32,
    pub non_escalation_rate: f64,
    pub avg_response_time_days: f64,
    pub performance_score: u32,
    pub performance_level: PerformanceLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentStat {
    pub department_id: DepartmentId,
    /// Filled in by rollups from the department catalog.
    pub department_name: Option<String>,
    pub total: u64,
    pub resolved: u64,
    pub pending: u64,
    pub resolution_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrendPoint {
    /// "YYYY-MM" in the portal's local calendar.
    pub month: String,
    pub label: String,
    pub filed: u64,
    pub resolved: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub metrics: GovernanceMetrics,
    pub department_breakdown: Vec<DepartmentStat>,
    pub monthly_trend: Vec<MonthlyTrendPoint>,
}

/// round(100 × part / whole), 100 when `whole` is zero.
pub fn percentage(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        return 100;
    }
    (100.0 * part as f64 / whole as f64).round() as u32
}

/// The governing formula. Inputs are percentages in [0, 100].
pub fn performance_score(resolution_rate: u32, on_time_rate: u32, non_escalation_rate: f64) -> u32 {
    let weighted = f64::from(RESOLUTION_WEIGHT * resolution_rate)
        + f64::from(ON_TIME_WEIGHT * on_time_rate)
        + f64::from(NON_ESCALATION_WEIGHT) * non_escalation_rate;
    (weighted / 100.0).round().clamp(0.0, 100.0) as u32
}

/// Scalar metrics for a complaint collection.
pub fn governance_metrics(complaints: &[Complaint]) -> GovernanceMetrics {
    let total = complaints.len() as u64;
    let mut resolved = 0u64;
    let mut pending = 0u64;
    let mut escalated = 0u64;
    let mut on_time = 0u64;
    let mut on_time_eligible = 0u64;
    let mut response_days_sum = 0.0;
    let mut responded = 0u64;

    for c in complaints {
        if c.status.counts_as_resolved() {
            resolved += 1;
        }
        if c.status.counts_as_pending() {
            pending += 1;
        }
        if c.is_escalated() {
            escalated += 1;
        }
        if let Some(was_on_time) = c.resolved_on_time() {
            on_time_eligible += 1;
            if was_on_time {
                on_time += 1;
            }
        }
        if let Some(resolved_at) = c.resolved_at {
            response_days_sum += days_between(c.created_at, resolved_at);
            responded += 1;
        }
    }

    let resolution_rate = percentage(resolved, total);
    let on_time_resolution_rate = percentage(on_time, on_time_eligible);
    let non_escalation_rate = if total == 0 {
        100.0
    } else {
        100.0 * (total - escalated) as f64 / total as f64
    };
    let avg_response_time_days = if responded == 0 {
        0.0
    } else {
        (response_days_sum / responded as f64 * 10.0).round() / 10.0
    };
    let performance_score =
        performance_score(resolution_rate, on_time_resolution_rate, non_escalation_rate);

    GovernanceMetrics {
        total_complaints: total,
        resolved_complaints: resolved,
        pending_complaints: pending,
        escalated_complaints: escalated,
        resolution_rate,
        on_time_resolutions: on_time,
        on_time_eligible,
        on_time_resolution_rate,
        non_escalation_rate,
        avg_response_time_days,
        performance_score,
        performance_level: PerformanceLevel::for_score(performance_score),
    }
}

/// Per-department totals, busiest department first (ties by id).
pub fn department_breakdown(complaints: &[Complaint]) -> Vec<DepartmentStat> {
    let mut by_department: HashMap<&str, (u64, u64, u64)> = HashMap::new();
    for c in complaints {
        let entry = by_department.entry(c.department_id.as_str()).or_default();
        entry.0 += 1;
        if c.status.counts_as_resolved() {
            entry.1 += 1;
        }
        if c.status.counts_as_pending() {
            entry.2 += 1;
        }
    }

    let mut stats: Vec<DepartmentStat> = by_department
        .into_iter()
        .map(|(department_id, (total, resolved, pending))| DepartmentStat {
            department_id: department_id.to_string(),
            department_name: None,
            total,
            resolved,
            pending,
            resolution_rate: percentage(resolved, total),
        })
        .collect();
    stats.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.department_id.cmp(&b.department_id))
    });
    stats
}

/// Filed/resolved counts for the trailing `months` calendar months (the
/// current one included), oldest first, using the offset's local calendar.
pub fn monthly_trend(
    complaints: &[Complaint],
    now: Timestamp,
    months: u32,
    offset: FixedOffset,
) -> Vec<MonthlyTrendPoint> {
    let local_now = now.with_timezone(&offset);
    let current = month_index(local_now.year(), local_now.month());

    (0..months)
        .rev()
        .filter_map(|back| {
            let index = current - i64::from(back);
            let start = month_start(index, offset)?;
            let end = month_start(index + 1, offset)?;
            let within = |t: Timestamp| t >= start && t < end;
            let filed = complaints.iter().filter(|c| within(c.created_at)).count() as u64;
            let resolved = complaints
                .iter()
                .filter(|c| c.resolved_at.is_some_and(within))
                .count() as u64;
            Some(MonthlyTrendPoint {
                month: start.with_timezone(&offset).format("%Y-%m").to_string(),
                label: start.with_timezone(&offset).format("%b %Y").to_string(),
                filed,
                resolved,
            })
        })
        .collect()
}

fn month_index(year: i32, month: u32) -> i64 {
    i64::from(year) * 12 + i64::from(month) - 1
}

fn month_start(index: i64, offset: FixedOffset) -> Option<Timestamp> {
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
    let local: DateTime<FixedOffset> = offset.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()?;
    Some(local.with_timezone(&chrono::Utc))
}

/// Computes the full report for a complaint collection. Holds only the
/// reporting window; scoring itself has no knobs.
#[derive(Debug, Clone, Default)]
pub struct MetricsAggregator {
    reporting: ReportingConfig,
}

impl MetricsAggregator {
    pub fn new(reporting: ReportingConfig) -> Self {
        Self { reporting }
    }

    pub fn compute(&self, complaints: &[Complaint], now: Timestamp) -> MetricsReport {
        MetricsReport {
            metrics: governance_metrics(complaints),
            department_breakdown: department_breakdown(complaints),
            monthly_trend: monthly_trend(
                complaints,
                now,
                self.reporting.trend_months,
                self.reporting.offset(),
            ),
        }
    }
}

/// Full report with default reporting settings (UTC calendar, six months).
pub fn compute_metrics(complaints: &[Complaint], now: Timestamp) -> MetricsReport {
    MetricsAggregator::default().compute(complaints, now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_follow_score_thresholds() {
        assert_eq!(PerformanceLevel::for_score(100), PerformanceLevel::Excellent);
        assert_eq!(PerformanceLevel::for_score(80), PerformanceLevel::Excellent);
        assert_eq!(PerformanceLevel::for_score(79), PerformanceLevel::Good);
        assert_eq!(PerformanceLevel::for_score(60), PerformanceLevel::Good);
        assert_eq!(PerformanceLevel::for_score(59), PerformanceLevel::Average);
        assert_eq!(PerformanceLevel::for_score(40), PerformanceLevel::Average);
        assert_eq!(PerformanceLevel::for_score(39), PerformanceLevel::Poor);
        assert_eq!(PerformanceLevel::for_score(0), PerformanceLevel::Poor);
    }

    #[test]
    fn score_uses_fixed_weights() {
        assert_eq!(performance_score(80, 75, 90.0), 81);
        assert_eq!(performance_score(100, 100, 100.0), 100);
        assert_eq!(performance_score(0, 0, 0.0), 0);
        assert_eq!(performance_score(0, 0, 100.0), 25);
    }

    #[test]
    fn percentage_is_vacuous_for_empty_denominator() {
        assert_eq!(percentage(0, 0), 100);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
    }

    #[test]
    fn month_start_handles_year_boundaries() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let jan = month_start(month_index(2026, 1), utc).unwrap();
        let dec = month_start(month_index(2026, 1) - 1, utc).unwrap();
        assert_eq!(jan.format("%Y-%m-%d").to_string(), "2026-01-01");
        assert_eq!(dec.format("%Y-%m-%d").to_string(), "2025-12-01");
    }
}
