//! # Planner
//!
//! Runs one planning pass over validated inputs:
//! calendar -> territories -> quotas -> boundaries -> reconciliation.
//!
//! Every stage reads the previous stage's output by value; there is no
//! shared run state. Identical inputs and config give identical output.

use crate::boundary::{generate_boundaries, Boundary};
use crate::calendar::QuarterCalendar;
use crate::config::PlannerConfig;
use crate::error::Result;
use crate::ingest::{IngestReport, PlanInputs};
use crate::models::{Agent, Location};
use crate::quota::{distribute_quotas, QuotaPlan, WeeklyPlanEntry};
use crate::reconcile::{reconcile, Reconciliation};
use crate::territory::{assign_territories, cities_in_order, Assignment};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Structural mismatch found while planning. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanWarning {
    /// City has locations but no agents; its locations get no plan
    CityWithoutAgents { city: String, location_count: usize },
    /// City has agents but no locations
    AgentsWithoutLocations { city: String, agent_ids: Vec<String> },
    /// Agent whose territory received no locations
    EmptyTerritory { city: String, territory: String, agent_id: String },
}

impl std::fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanWarning::CityWithoutAgents { city, location_count } => {
                write!(f, "city {} has {} locations but no agents", city, location_count)
            }
            PlanWarning::AgentsWithoutLocations { city, agent_ids } => {
                write!(f, "city {} has agents but no locations: {}", city, agent_ids.join(", "))
            }
            PlanWarning::EmptyTerritory { city, territory, agent_id } => {
                write!(f, "territory {} ({}) of agent {} is empty", territory, city, agent_id)
            }
        }
    }
}

/// Everything one planning run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOutput {
    pub calendar: QuarterCalendar,
    pub assignment: Assignment,
    pub quotas: QuotaPlan,
    pub weekly_plan: Vec<WeeklyPlanEntry>,
    pub boundaries: Vec<Boundary>,
    pub reconciliation: Reconciliation,
    pub ingest: IngestReport,
    pub warnings: Vec<PlanWarning>,
}

impl PlanOutput {
    pub fn planned_total(&self) -> u64 {
        self.weekly_plan.iter().map(|e| e.planned).sum()
    }

    pub fn required_total(&self) -> u64 {
        self.quotas.cities.iter().map(|c| c.total_quota).sum()
    }
}

/// Plan one quarter.
///
/// Fails only on invalid calendar settings; input validation has already
/// happened in [`crate::ingest`].
pub fn plan(inputs: &PlanInputs, config: &PlannerConfig) -> Result<PlanOutput> {
    config.validate()?;
    let calendar = QuarterCalendar::resolve(config.year, config.quarter, config.coefficients)?;

    let assignment = assign_territories(&inputs.locations, &inputs.agents);
    let quotas = distribute_quotas(&inputs.locations, &assignment, &calendar);
    let weekly_plan: Vec<WeeklyPlanEntry> = quotas.entries().cloned().collect();
    let boundaries =
        generate_boundaries(&assignment.territories, &inputs.locations, config.boundary_margin_deg);
    let reconciliation =
        reconcile(&calendar, &inputs.locations, &assignment, &weekly_plan, &inputs.visits);
    let warnings = collect_warnings(&inputs.locations, &inputs.agents, &assignment);

    let output = PlanOutput {
        calendar,
        assignment,
        quotas,
        weekly_plan,
        boundaries,
        reconciliation,
        ingest: inputs.report.clone(),
        warnings,
    };

    info!(
        "Planned {}: {} territories, {} planned visits (required {}), {} visits matched, {} warnings",
        output.calendar.quarter.label(),
        output.assignment.territories.len(),
        output.planned_total(),
        output.required_total(),
        output.reconciliation.accepted_visits,
        output.warnings.len()
    );

    Ok(output)
}

fn collect_warnings(
    locations: &[Location],
    agents: &[Agent],
    assignment: &Assignment,
) -> Vec<PlanWarning> {
    let mut warnings = Vec::new();

    for unassigned in &assignment.unassigned {
        warnings.push(PlanWarning::CityWithoutAgents {
            city: unassigned.city.clone(),
            location_count: unassigned.location_ids.len(),
        });
    }

    for city in cities_in_order(agents.iter().map(|a| a.city.as_str())) {
        if locations.iter().any(|l| l.city == city) {
            continue;
        }
        let agent_ids: Vec<String> =
            agents.iter().filter(|a| a.city == city).map(|a| a.id.clone()).collect();
        warn!("City {} has {} agents but no locations", city, agent_ids.len());
        warnings.push(PlanWarning::AgentsWithoutLocations { city: city.to_string(), agent_ids });
    }

    for t in assignment.empty_territories() {
        warnings.push(PlanWarning::EmptyTerritory {
            city: t.city.clone(),
            territory: t.label.clone(),
            agent_id: t.agent_id.clone(),
        });
    }

    warnings
}
