//! # Quota Distribution Engine
//!
//! Turns a city's total visit quota into an integer per-agent, per-week plan.
//!
//! ## Pipeline (per city)
//! 1. Stage split: `stage_quota = total * coefficient / sum(coefficients)`
//! 2. Day split: Mon-Fri days of the stage share the stage quota; every day
//!    but the last gets `floor(stage_quota / days)`, the last day gets the
//!    rounded remainder.
//! 3. Week aggregation: daily integers are summed per ISO week.
//! 4. Agent split: each week's total is divided evenly; the first
//!    `total % agents` agents get one extra visit.
//!
//! Math stays in `f64` until the day boundary. Every integerization step
//! carries its remainder forward, so a stage's integer total equals its
//! rounded quota and a week's agent split conserves the week total exactly.

use crate::calendar::{IsoWeekKey, QuarterCalendar, Week};
use crate::models::Location;
use crate::territory::{cities_in_order, Assignment, Territory};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Planned visits for one agent in one week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyPlanEntry {
    pub city: String,
    pub territory: String,
    pub agent_id: String,
    pub iso_year: i32,
    pub iso_week: u32,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub planned: u64,
}

impl WeeklyPlanEntry {
    pub fn iso(&self) -> IsoWeekKey {
        IsoWeekKey { year: self.iso_year, week: self.iso_week }
    }
}

/// How one stage's quota was spread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageQuota {
    pub stage: usize,
    /// Fractional share of the city total
    pub quota: f64,
    pub workable_days: usize,
    /// Integer visits actually placed on the stage's days
    pub assigned: u64,
}

/// Distribution result for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityQuotaPlan {
    pub city: String,
    pub total_quota: u64,
    pub agent_count: usize,
    pub stages: Vec<StageQuota>,
    /// City total per quarter week, in calendar order
    pub weekly_totals: Vec<u64>,
    /// Non-zero rows, ordered by agent then week
    pub entries: Vec<WeeklyPlanEntry>,
}

impl CityQuotaPlan {
    pub fn planned_total(&self) -> u64 {
        self.entries.iter().map(|e| e.planned).sum()
    }
}

/// Distribution result for every city.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuotaPlan {
    pub cities: Vec<CityQuotaPlan>,
}

impl QuotaPlan {
    pub fn entries(&self) -> impl Iterator<Item = &WeeklyPlanEntry> {
        self.cities.iter().flat_map(|c| c.entries.iter())
    }

    pub fn city(&self, city: &str) -> Option<&CityQuotaPlan> {
        self.cities.iter().find(|c| c.city == city)
    }

    pub fn into_entries(self) -> Vec<WeeklyPlanEntry> {
        self.cities.into_iter().flat_map(|c| c.entries).collect()
    }
}

/// Fractional share of `total` per stage, proportional to its coefficient.
pub fn stage_quotas(total: u64, calendar: &QuarterCalendar) -> Vec<f64> {
    let coefficient_sum = calendar.coefficient_sum();
    calendar
        .stages
        .iter()
        .map(|stage| total as f64 * (stage.coefficient / coefficient_sum))
        .collect()
}

/// Spread a fractional stage quota over its workable days.
///
/// Every day but the last gets the floor of the daily share; the last day
/// gets whatever remains, rounded half-to-even. No workable days yields
/// nothing.
pub fn split_into_days(quota: f64, days: &[NaiveDate]) -> Vec<(NaiveDate, u64)> {
    let Some((&last_day, rest)) = days.split_last() else {
        return Vec::new();
    };

    let daily_share = quota / days.len() as f64;
    let floor_share = daily_share.floor().max(0.0) as u64;

    let mut remaining = quota;
    let mut out = Vec::with_capacity(days.len());
    for &day in rest {
        out.push((day, floor_share));
        remaining -= floor_share as f64;
    }
    out.push((last_day, remaining.round_ties_even().max(0.0) as u64));
    out
}

/// Sum daily integers into the calendar's weeks, indexed like `calendar.weeks`.
pub fn aggregate_weeks(daily: &[(NaiveDate, u64)], calendar: &QuarterCalendar) -> Vec<u64> {
    let mut totals = vec![0u64; calendar.weeks.len()];
    for &(day, visits) in daily {
        if let Some(idx) = calendar.week_index_for_day(day) {
            totals[idx] += visits;
        }
    }
    totals
}

/// Divide a week total among `agent_count` agents; the first
/// `total % agent_count` agents get one extra unit.
pub fn split_among_agents(week_total: u64, agent_count: usize) -> Vec<u64> {
    if agent_count == 0 {
        return Vec::new();
    }
    let n = agent_count as u64;
    let base = week_total / n;
    let remainder = (week_total % n) as usize;
    (0..agent_count).map(|i| base + u64::from(i < remainder)).collect()
}

/// Run the full stage -> day -> week -> agent pipeline for one city.
///
/// `territories` must be the city's territories in agent roster order.
pub fn distribute_city(
    city: &str,
    total_quota: u64,
    territories: &[&Territory],
    calendar: &QuarterCalendar,
) -> CityQuotaPlan {
    let mut plan = CityQuotaPlan {
        city: city.to_string(),
        total_quota,
        agent_count: territories.len(),
        stages: Vec::new(),
        weekly_totals: vec![0; calendar.weeks.len()],
        entries: Vec::new(),
    };

    if total_quota == 0 || territories.is_empty() {
        return plan;
    }

    let mut daily = Vec::new();
    for (stage, quota) in calendar.stages.iter().zip(stage_quotas(total_quota, calendar)) {
        let days = stage.workable_days();
        let stage_days = split_into_days(quota, &days);
        plan.stages.push(StageQuota {
            stage: stage.index,
            quota,
            workable_days: days.len(),
            assigned: stage_days.iter().map(|(_, v)| v).sum(),
        });
        daily.extend(stage_days);
    }

    plan.weekly_totals = aggregate_weeks(&daily, calendar);

    let per_week: Vec<Vec<u64>> = plan
        .weekly_totals
        .iter()
        .map(|&total| split_among_agents(total, territories.len()))
        .collect();

    for (agent_idx, territory) in territories.iter().enumerate() {
        for (week, split) in calendar.weeks.iter().zip(&per_week) {
            let planned = split[agent_idx];
            if planned == 0 {
                continue;
            }
            plan.entries.push(entry(city, territory, week, planned));
        }
    }

    debug!(
        "City {}: quota {} -> {} planned across {} weeks",
        city,
        total_quota,
        plan.planned_total(),
        calendar.weeks.len()
    );

    plan
}

fn entry(city: &str, territory: &Territory, week: &Week, planned: u64) -> WeeklyPlanEntry {
    WeeklyPlanEntry {
        city: city.to_string(),
        territory: territory.label.clone(),
        agent_id: territory.agent_id.clone(),
        iso_year: week.iso.year,
        iso_week: week.iso.week,
        week_start: week.start_date,
        week_end: week.end_date,
        planned,
    }
}

/// Distribute every city's quota. Cities without territories produce no rows.
///
/// Only territories holding at least one location share the quota; agents
/// with an empty territory get no weekly rows.
pub fn distribute_quotas(
    locations: &[Location],
    assignment: &Assignment,
    calendar: &QuarterCalendar,
) -> QuotaPlan {
    let cities = cities_in_order(locations.iter().map(|l| l.city.as_str()));

    let cities = cities
        .par_iter()
        .filter_map(|&city| {
            let territories: Vec<&Territory> =
                assignment.territories_in(city).filter(|t| !t.is_empty()).collect();
            if territories.is_empty() {
                return None;
            }
            let total: u64 = locations
                .iter()
                .filter(|l| l.city == city)
                .map(|l| l.required_visits as u64)
                .sum();
            Some(distribute_city(city, total, &territories, calendar))
        })
        .collect();

    QuotaPlan { cities }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::STAGE_COUNT;
    use crate::models::{Agent, Category};
    use crate::territory::assign_territories;

    const COEFFS: [f64; 4] = [0.8, 1.0, 1.2, 0.9];

    fn calendar() -> QuarterCalendar {
        QuarterCalendar::resolve(2025, 1, COEFFS).unwrap()
    }

    fn territory(label: &str, agent: &str) -> Territory {
        Territory {
            city: "X".to_string(),
            label: label.to_string(),
            agent_id: agent.to_string(),
            location_ids: Vec::new(),
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_stage_quotas_are_proportional() {
        let quotas = stage_quotas(39, &calendar());
        assert!((quotas[0] - 8.0).abs() < 1e-9);
        assert!((quotas[1] - 10.0).abs() < 1e-9);
        assert!((quotas[2] - 12.0).abs() < 1e-9);
        assert!((quotas[3] - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_split_into_days_puts_remainder_on_last_day() {
        let days: Vec<NaiveDate> = (6..=10).map(|day| d(2025, 1, day)).collect();
        let split = split_into_days(12.4, &days);

        let values: Vec<u64> = split.iter().map(|(_, v)| *v).collect();
        // floor(12.4 / 5) = 2 for four days, last day gets round(4.4) = 4
        assert_eq!(values, vec![2, 2, 2, 2, 4]);
        assert_eq!(split.last().unwrap().0, d(2025, 1, 10));
    }

    #[test]
    fn test_small_quota_lands_on_last_day() {
        let days: Vec<NaiveDate> = (6..=10).map(|day| d(2025, 1, day)).collect();
        let values: Vec<u64> = split_into_days(2.6, &days).iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![0, 0, 0, 0, 3]);
    }

    #[test]
    fn test_split_into_days_without_days() {
        assert!(split_into_days(5.0, &[]).is_empty());
    }

    #[test]
    fn test_split_among_agents() {
        assert_eq!(split_among_agents(7, 3), vec![3, 2, 2]);
        assert_eq!(split_among_agents(2, 3), vec![1, 1, 0]);
        assert_eq!(split_among_agents(9, 3), vec![3, 3, 3]);
        assert!(split_among_agents(5, 0).is_empty());
    }

    #[test]
    fn test_aggregate_weeks_uses_iso_week_of_day() {
        let cal = calendar();
        // Mon Jan 6 is ISO week 2 -> second quarter week
        let totals = aggregate_weeks(&[(d(2025, 1, 2), 1), (d(2025, 1, 6), 4)], &cal);
        assert_eq!(totals[0], 1);
        assert_eq!(totals[1], 4);
        assert_eq!(totals.iter().sum::<u64>(), 5);
    }

    #[test]
    fn test_distribute_city_conserves_quota() {
        let cal = calendar();
        let (a, b) = (territory("X-West", "A"), territory("X-Center", "B"));
        let plan = distribute_city("X", 10, &[&a, &b], &cal);

        assert_eq!(plan.planned_total(), 10);
        assert_eq!(plan.weekly_totals.iter().sum::<u64>(), 10);
        assert!(plan.entries.iter().all(|e| e.planned > 0));

        // Stage 3 has the largest coefficient and the largest share
        let largest = plan
            .stages
            .iter()
            .max_by(|x, y| x.quota.total_cmp(&y.quota))
            .unwrap();
        assert_eq!(largest.stage, 3);
    }

    #[test]
    fn test_distribute_city_agent_fairness() {
        let cal = calendar();
        let ts: Vec<Territory> =
            (0..3).map(|i| territory(&format!("X-{i}"), &format!("A{i}"))).collect();
        let refs: Vec<&Territory> = ts.iter().collect();
        let plan = distribute_city("X", 250, &refs, &cal);

        for week in &cal.weeks {
            let counts: Vec<u64> = refs
                .iter()
                .map(|t| {
                    plan.entries
                        .iter()
                        .filter(|e| e.agent_id == t.agent_id && e.iso() == week.iso)
                        .map(|e| e.planned)
                        .sum()
                })
                .collect();
            let max = counts.iter().max().unwrap();
            let min = counts.iter().min().unwrap();
            assert!(max - min <= 1, "week {} unfair: {:?}", week.iso, counts);
        }
        let diff = plan.planned_total() as i64 - 250;
        assert!(diff.abs() <= 4);
    }

    #[test]
    fn test_entries_ordered_by_agent_then_week() {
        let cal = calendar();
        let (a, b) = (territory("X-West", "A"), territory("X-Center", "B"));
        let plan = distribute_city("X", 130, &[&a, &b], &cal);

        let keys: Vec<(String, IsoWeekKey)> =
            plan.entries.iter().map(|e| (e.agent_id.clone(), e.iso())).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_degenerate_inputs_yield_no_rows() {
        let cal = calendar();
        let a = territory("X", "A");
        assert!(distribute_city("X", 0, &[&a], &cal).entries.is_empty());
        assert!(distribute_city("X", 10, &[], &cal).entries.is_empty());
    }

    #[test]
    fn test_distribute_quotas_skips_cities_without_agents() {
        let locations = vec![
            Location::new("P1", 55.0, 37.0, "Moscow", Category::Convenience).with_required_visits(4),
            Location::new("P2", 55.0, 49.0, "Kazan", Category::Convenience),
        ];
        let agents = vec![Agent::new("A1", "Moscow")];
        let cal = calendar();
        let assignment = assign_territories(&locations, &agents);

        let plan = distribute_quotas(&locations, &assignment, &cal);

        assert_eq!(plan.cities.len(), 1);
        assert_eq!(plan.city("Moscow").unwrap().total_quota, 4);
        assert!(plan.city("Kazan").is_none());
        assert!(plan.entries().all(|e| e.agent_id == "A1"));
    }

    #[test]
    fn test_q4_year_boundary_days_are_not_dropped() {
        let cal = QuarterCalendar::resolve(2024, 4, [1.0; 4]).unwrap();
        let a = territory("X", "A");
        let plan = distribute_city("X", 200, &[&a], &cal);
        let stage_sum: u64 = plan.stages.iter().map(|s| s.assigned).sum();
        assert_eq!(plan.planned_total(), stage_sum);
    }

    #[test]
    fn test_empty_territory_gets_no_quota() {
        let locations = vec![
            Location::new("M1", 55.7, 37.5, "Moscow", Category::Convenience).with_required_visits(3),
        ];
        let agents = vec![Agent::new("A1", "Moscow"), Agent::new("A2", "Moscow")];
        let cal = calendar();
        let assignment = assign_territories(&locations, &agents);
        assert_eq!(assignment.empty_territories().count(), 1);

        let plan = distribute_quotas(&locations, &assignment, &cal);

        let moscow = plan.city("Moscow").unwrap();
        assert_eq!(moscow.agent_count, 1);
        assert!(plan.entries().all(|e| e.agent_id == "A2"));
        let a2_total: u64 = plan.entries().map(|e| e.planned).sum();
        assert!(a2_total > 0);
        assert_eq!(a2_total, moscow.planned_total());
        assert!(a2_total.abs_diff(3) <= STAGE_COUNT as u64);
    }

    #[test]
    fn test_large_city_total_does_not_overflow() {
        let cal = calendar();
        let a = territory("X-West", "A");
        let b = territory("X-East", "B");
        let total = 100_000_000_000u64;

        let plan = distribute_city("X", total, &[&a, &b], &cal);

        let planned = plan.planned_total();
        assert!(planned.abs_diff(total) <= STAGE_COUNT as u64);
        assert_eq!(plan.weekly_totals.iter().sum::<u64>(), planned);
        let stage_sum: u64 = plan.stages.iter().map(|s| s.assigned).sum();
        assert_eq!(stage_sum, planned);
        assert!(plan.weekly_totals.iter().any(|&w| w > u32::MAX as u64));
    }
}
