//! # Reconciliation Engine
//!
//! Matches recorded visits against the plan.
//!
//! Visits outside the quarter are dropped first; the rest are tagged with the
//! quarter week they fall into. Visits to unknown locations are discarded and
//! counted as anomalies. Actual counts are then aggregated per city, category,
//! territory-week and location.

use crate::calendar::{IsoWeekKey, QuarterCalendar};
use crate::models::{Category, Location, VisitEvent};
use crate::quota::WeeklyPlanEntry;
use crate::territory::{cities_in_order, Assignment, Territory};
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Aggregation key of a reconciliation row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum RecordKey {
    City { city: String },
    Category { category: Category },
    TerritoryWeek { city: String, territory: String, agent_id: String, iso_year: i32, iso_week: u32 },
    Location { location_id: String, city: String, category: Category },
}

/// Planned vs actual visits for one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationRecord {
    #[serde(flatten)]
    pub key: RecordKey,
    pub planned: u64,
    pub actual: u64,
    pub completion_pct: f64,
    /// Location rows only: quarter target reached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub met: Option<bool>,
}

impl ReconciliationRecord {
    pub fn new(key: RecordKey, planned: u64, actual: u64) -> Self {
        Self { key, planned, actual, completion_pct: completion_pct(actual, planned), met: None }
    }
}

/// Actual visits to one location in one week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationWeekActual {
    pub location_id: String,
    /// `iso_year`/`iso_week` name the quarter week the visit was booked to.
    /// At a year boundary this can differ from the visit date's own ISO week.
    pub iso_year: i32,
    pub iso_week: u32,
    pub actual: u64,
}

/// Visit records excluded or only partly attributed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitAnomalies {
    /// In-window visits to location ids not in the catalog (discarded)
    pub unknown_location: usize,
    /// Visits dated outside the quarter (discarded)
    pub out_of_window: usize,
    /// Accepted visits whose agent owns no territory; missing from
    /// territory-week rows only
    pub unattributed: usize,
}

/// All reconciliation tables of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub by_city: Vec<ReconciliationRecord>,
    pub by_category: Vec<ReconciliationRecord>,
    pub by_territory_week: Vec<ReconciliationRecord>,
    pub by_location: Vec<ReconciliationRecord>,
    pub location_weeks: Vec<LocationWeekActual>,
    pub accepted_visits: usize,
    pub anomalies: VisitAnomalies,
}

impl Reconciliation {
    pub fn locations_met(&self) -> usize {
        self.by_location.iter().filter(|r| r.met == Some(true)).count()
    }

    pub fn city(&self, city: &str) -> Option<&ReconciliationRecord> {
        self.by_city
            .iter()
            .find(|r| matches!(&r.key, RecordKey::City { city: c } if c == city))
    }
}

/// `actual / planned * 100` rounded to one decimal; 0 when nothing is planned.
pub fn completion_pct(actual: u64, planned: u64) -> f64 {
    if planned == 0 {
        return 0.0;
    }
    (actual as f64 / planned as f64 * 1000.0).round() / 10.0
}

/// A visit that passed window and catalog checks.
struct TaggedVisit<'a> {
    location: &'a Location,
    week: IsoWeekKey,
    agent_id: Option<&'a str>,
}

/// Reconcile `visits` against the plan.
pub fn reconcile(
    calendar: &QuarterCalendar,
    locations: &[Location],
    assignment: &Assignment,
    plan: &[WeeklyPlanEntry],
    visits: &[VisitEvent],
) -> Reconciliation {
    let by_id: FxHashMap<&str, &Location> = locations.iter().map(|l| (l.id.as_str(), l)).collect();
    let mut anomalies = VisitAnomalies::default();
    let mut tagged = Vec::with_capacity(visits.len());

    for visit in visits {
        let Some(week_idx) = calendar.week_index_for_day(visit.date) else {
            anomalies.out_of_window += 1;
            continue;
        };
        let Some(&location) = by_id.get(visit.location_id.as_str()) else {
            anomalies.unknown_location += 1;
            continue;
        };
        tagged.push(TaggedVisit {
            location,
            week: calendar.weeks[week_idx].iso,
            agent_id: visit.agent_id.as_deref(),
        });
    }

    if anomalies.unknown_location > 0 {
        warn!("Discarded {} visits to unknown locations", anomalies.unknown_location);
    }
    if anomalies.out_of_window > 0 {
        info!(
            "Ignored {} visits outside {}",
            anomalies.out_of_window,
            calendar.quarter.label()
        );
    }

    let by_city = city_records(locations, &tagged);
    let by_category = category_records(locations, &tagged);
    let by_territory_week = territory_week_records(assignment, plan, &tagged, &mut anomalies);
    let (by_location, location_weeks) = location_records(locations, &tagged);

    if anomalies.unattributed > 0 {
        warn!("{} visits could not be attributed to a territory", anomalies.unattributed);
    }

    Reconciliation {
        by_city,
        by_category,
        by_territory_week,
        by_location,
        location_weeks,
        accepted_visits: tagged.len(),
        anomalies,
    }
}

fn city_records(locations: &[Location], tagged: &[TaggedVisit<'_>]) -> Vec<ReconciliationRecord> {
    let mut actual: FxHashMap<&str, u64> = FxHashMap::default();
    for v in tagged {
        *actual.entry(v.location.city.as_str()).or_default() += 1;
    }

    cities_in_order(locations.iter().map(|l| l.city.as_str()))
        .into_iter()
        .map(|city| {
            let planned: u64 = locations
                .iter()
                .filter(|l| l.city == city)
                .map(|l| l.required_visits as u64)
                .sum();
            ReconciliationRecord::new(
                RecordKey::City { city: city.to_string() },
                planned,
                actual.get(city).copied().unwrap_or(0),
            )
        })
        .collect()
}

fn category_records(
    locations: &[Location],
    tagged: &[TaggedVisit<'_>],
) -> Vec<ReconciliationRecord> {
    Category::ALL
        .iter()
        .filter(|&&category| locations.iter().any(|l| l.category == category))
        .map(|&category| {
            let planned: u64 = locations
                .iter()
                .filter(|l| l.category == category)
                .map(|l| l.required_visits as u64)
                .sum();
            let actual = tagged.iter().filter(|v| v.location.category == category).count() as u64;
            ReconciliationRecord::new(RecordKey::Category { category }, planned, actual)
        })
        .collect()
}

fn territory_week_records(
    assignment: &Assignment,
    plan: &[WeeklyPlanEntry],
    tagged: &[TaggedVisit<'_>],
    anomalies: &mut VisitAnomalies,
) -> Vec<ReconciliationRecord> {
    let owner_of_location: FxHashMap<&str, &Territory> = assignment
        .territories
        .iter()
        .flat_map(|t| t.location_ids.iter().map(move |id| (id.as_str(), t)))
        .collect();
    let by_agent: FxHashMap<&str, (usize, &Territory)> = assignment
        .territories
        .iter()
        .enumerate()
        .map(|(i, t)| (t.agent_id.as_str(), (i, t)))
        .collect();

    // (territory index, week) -> actual
    let mut actual: BTreeMap<(usize, IsoWeekKey), u64> = BTreeMap::new();
    for v in tagged {
        let territory = match v.agent_id {
            Some(agent) => by_agent.get(agent).copied(),
            None => owner_of_location
                .get(v.location.id.as_str())
                .and_then(|t| by_agent.get(t.agent_id.as_str()).copied()),
        };
        match territory {
            Some((idx, _)) => *actual.entry((idx, v.week)).or_default() += 1,
            None => anomalies.unattributed += 1,
        }
    }

    let mut records = Vec::with_capacity(plan.len());
    for entry in plan {
        let Some(&(idx, _)) = by_agent.get(entry.agent_id.as_str()) else {
            continue;
        };
        let done = actual.remove(&(idx, entry.iso())).unwrap_or(0);
        records.push(ReconciliationRecord::new(
            RecordKey::TerritoryWeek {
                city: entry.city.clone(),
                territory: entry.territory.clone(),
                agent_id: entry.agent_id.clone(),
                iso_year: entry.iso_year,
                iso_week: entry.iso_week,
            },
            entry.planned,
            done,
        ));
    }

    // Weeks with visits but nothing planned
    for ((idx, week), done) in actual {
        let t = &assignment.territories[idx];
        records.push(ReconciliationRecord::new(
            RecordKey::TerritoryWeek {
                city: t.city.clone(),
                territory: t.label.clone(),
                agent_id: t.agent_id.clone(),
                iso_year: week.year,
                iso_week: week.week,
            },
            0,
            done,
        ));
    }

    records
}

fn location_records(
    locations: &[Location],
    tagged: &[TaggedVisit<'_>],
) -> (Vec<ReconciliationRecord>, Vec<LocationWeekActual>) {
    let index: FxHashMap<&str, usize> =
        locations.iter().enumerate().map(|(i, l)| (l.id.as_str(), i)).collect();

    let mut totals = vec![0u64; locations.len()];
    let mut weekly: BTreeMap<(usize, IsoWeekKey), u64> = BTreeMap::new();
    for v in tagged {
        if let Some(&i) = index.get(v.location.id.as_str()) {
            totals[i] += 1;
            *weekly.entry((i, v.week)).or_default() += 1;
        }
    }

    let records = locations
        .iter()
        .zip(&totals)
        .map(|(l, &actual)| {
            let planned = l.required_visits as u64;
            let mut record = ReconciliationRecord::new(
                RecordKey::Location {
                    location_id: l.id.clone(),
                    city: l.city.clone(),
                    category: l.category,
                },
                planned,
                actual,
            );
            record.met = Some(actual >= planned);
            record
        })
        .collect();

    let location_weeks = weekly
        .into_iter()
        .map(|((i, week), actual)| LocationWeekActual {
            location_id: locations[i].id.clone(),
            iso_year: week.year,
            iso_week: week.week,
            actual,
        })
        .collect();

    (records, location_weeks)
}
