//! # Ingestion
//!
//! Validates the three input tables (locations, agents, visits) into typed
//! records. Column names are resolved once per table through
//! [`FieldAliases`]; nothing downstream looks at header spellings.
//!
//! Bad rows are counted in [`TableStats`] and skipped. Only a table left with
//! zero valid locations or agents aborts the run.

mod dates;
mod table;

pub use dates::parse_visit_date;
pub use table::RawTable;

use crate::config::{CanonicalField, FieldAliases, PlannerConfig};
use crate::error::{PlanError, Result};
use crate::models::{Agent, Category, Coordinates, Location, VisitEvent};
use fxhash::FxHashSet;
use serde::{Deserialize, Serialize};
use table::cell;
use tracing::{info, warn};

/// Per-table validation counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
    pub total_rows: usize,
    pub accepted: usize,
    /// Rows with an empty required cell
    pub missing_values: usize,
    /// Rows whose coordinates did not parse as numbers
    pub invalid_numbers: usize,
    /// Rows outside the supported coordinate region
    pub out_of_region: usize,
    pub invalid_dates: usize,
    /// Rows repeating an id already accepted (first occurrence wins)
    pub duplicates: usize,
    /// Rows whose category fell back to the default
    pub defaulted_categories: usize,
    /// Rows whose required-visits fell back to 1
    pub defaulted_visits: usize,
    /// Required columns absent from the header (optional tables only)
    pub missing_columns: Vec<String>,
}

impl TableStats {
    pub fn excluded(&self) -> usize {
        self.total_rows - self.accepted
    }
}

/// Validation summary of one ingestion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub locations: TableStats,
    pub agents: TableStats,
    pub visits: TableStats,
}

/// Typed, validated inputs of one planning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanInputs {
    pub locations: Vec<Location>,
    pub agents: Vec<Agent>,
    pub visits: Vec<VisitEvent>,
    pub report: IngestReport,
}

/// Resolved column indices of a table.
struct Columns {
    found: Vec<(CanonicalField, Option<usize>)>,
}

impl Columns {
    fn resolve(
        table: &RawTable,
        aliases: &FieldAliases,
        required: &[CanonicalField],
        optional: &[CanonicalField],
    ) -> std::result::Result<Self, Vec<String>> {
        let mut found = Vec::with_capacity(required.len() + optional.len());
        let mut missing = Vec::new();

        for &field in required {
            let idx = aliases.find_column(&table.headers, field);
            if idx.is_none() {
                missing.push(field.as_str().to_string());
            }
            found.push((field, idx));
        }
        for &field in optional {
            found.push((field, aliases.find_column(&table.headers, field)));
        }

        if missing.is_empty() {
            Ok(Self { found })
        } else {
            Err(missing)
        }
    }

    fn get(&self, field: CanonicalField) -> Option<usize> {
        self.found.iter().find(|(f, _)| *f == field).and_then(|(_, idx)| *idx)
    }
}

/// Parse a decimal number, accepting a comma as the decimal separator.
fn parse_decimal(raw: &str) -> Option<f64> {
    raw.replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Required-visits cell: empty, non-numeric or < 1 reads as 1.
fn parse_required_visits(raw: &str) -> (u32, bool) {
    match parse_decimal(raw) {
        Some(v) if v >= 1.0 => ((v.trunc() as u64).min(u32::MAX as u64) as u32, false),
        _ => (1, true),
    }
}

/// Validate the location table.
pub fn parse_locations(
    table: &RawTable,
    config: &PlannerConfig,
) -> Result<(Vec<Location>, TableStats)> {
    use CanonicalField as F;

    let aliases = config.aliases();
    let cols = Columns::resolve(
        table,
        &aliases,
        &[F::LocationId, F::Latitude, F::Longitude, F::City, F::Category],
        &[F::RequiredVisits, F::Name, F::Address],
    )
    .map_err(|columns| PlanError::MissingColumns { table: table.name.clone(), columns })?;

    let mut stats = TableStats { total_rows: table.len(), ..TableStats::default() };
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut locations = Vec::with_capacity(table.len());

    for row in &table.rows {
        let id = cell(row, cols.get(F::LocationId));
        let city = cell(row, cols.get(F::City));
        let (lat_raw, lon_raw) = (cell(row, cols.get(F::Latitude)), cell(row, cols.get(F::Longitude)));

        if id.is_empty() || city.is_empty() || lat_raw.is_empty() || lon_raw.is_empty() {
            stats.missing_values += 1;
            continue;
        }

        let (Some(lat), Some(lon)) = (parse_decimal(lat_raw), parse_decimal(lon_raw)) else {
            stats.invalid_numbers += 1;
            continue;
        };

        let coordinates = Coordinates::new(lat, lon);
        if !config.bounds.contains(coordinates) {
            stats.out_of_region += 1;
            continue;
        }

        if !seen.insert(id.to_string()) {
            stats.duplicates += 1;
            continue;
        }

        let category = match Category::parse(cell(row, cols.get(F::Category))) {
            Some(c) => c,
            None => {
                stats.defaulted_categories += 1;
                Category::default()
            }
        };

        let (required_visits, defaulted) = match cols.get(F::RequiredVisits) {
            Some(idx) => parse_required_visits(cell(row, Some(idx))),
            None => (1, false),
        };
        if defaulted {
            stats.defaulted_visits += 1;
        }

        let name = cell(row, cols.get(F::Name));
        locations.push(Location {
            id: id.to_string(),
            coordinates,
            city: city.to_string(),
            category,
            required_visits,
            name: if name.is_empty() { id.to_string() } else { name.to_string() },
            address: cell(row, cols.get(F::Address)).to_string(),
        });
    }

    stats.accepted = locations.len();

    if stats.out_of_region > 0 {
        warn!(
            "Skipped {} locations outside the supported region (lat {}-{}, lon {}-{})",
            stats.out_of_region,
            config.bounds.min_lat,
            config.bounds.max_lat,
            config.bounds.min_lon,
            config.bounds.max_lon
        );
    }
    if stats.excluded() > stats.out_of_region {
        warn!(
            "Skipped {} location rows (missing: {}, non-numeric: {}, duplicate: {})",
            stats.excluded() - stats.out_of_region,
            stats.missing_values,
            stats.invalid_numbers,
            stats.duplicates
        );
    }

    if locations.is_empty() {
        return Err(PlanError::NoValidLocations { excluded: stats.excluded() });
    }

    Ok((locations, stats))
}

/// Validate the agent roster.
pub fn parse_agents(table: &RawTable, aliases: &FieldAliases) -> Result<(Vec<Agent>, TableStats)> {
    use CanonicalField as F;

    let cols = Columns::resolve(table, aliases, &[F::AgentId, F::City], &[])
        .map_err(|columns| PlanError::MissingColumns { table: table.name.clone(), columns })?;

    let mut stats = TableStats { total_rows: table.len(), ..TableStats::default() };
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut agents = Vec::with_capacity(table.len());

    for row in &table.rows {
        let id = cell(row, cols.get(F::AgentId));
        let city = cell(row, cols.get(F::City));

        if id.is_empty() || city.is_empty() {
            stats.missing_values += 1;
            continue;
        }
        if !seen.insert(id.to_string()) {
            stats.duplicates += 1;
            warn!("Agent {} listed more than once; keeping the first city", id);
            continue;
        }

        agents.push(Agent::new(id, city));
    }

    stats.accepted = agents.len();

    if agents.is_empty() {
        return Err(PlanError::NoValidAgents { excluded: stats.excluded() });
    }

    Ok((agents, stats))
}

/// Validate the visit log. The table is optional, so missing columns yield an
/// empty log rather than an error.
pub fn parse_visits(table: &RawTable, aliases: &FieldAliases) -> (Vec<VisitEvent>, TableStats) {
    use CanonicalField as F;

    let mut stats = TableStats { total_rows: table.len(), ..TableStats::default() };

    let cols = match Columns::resolve(table, aliases, &[F::LocationId, F::VisitDate], &[F::AgentId]) {
        Ok(cols) => cols,
        Err(columns) => {
            warn!("Visit table '{}' is missing columns: {}", table.name, columns.join(", "));
            stats.missing_columns = columns;
            return (Vec::new(), stats);
        }
    };

    let mut visits = Vec::with_capacity(table.len());

    for row in &table.rows {
        let location_id = cell(row, cols.get(F::LocationId));
        if location_id.is_empty() {
            stats.missing_values += 1;
            continue;
        }

        let Some(date) = parse_visit_date(cell(row, cols.get(F::VisitDate))) else {
            stats.invalid_dates += 1;
            continue;
        };

        let agent = cell(row, cols.get(F::AgentId));
        visits.push(VisitEvent {
            location_id: location_id.to_string(),
            date,
            agent_id: (!agent.is_empty()).then(|| agent.to_string()),
        });
    }

    stats.accepted = visits.len();

    if stats.invalid_dates > 0 {
        warn!("Skipped {} visit records with unparseable dates", stats.invalid_dates);
    }

    (visits, stats)
}

/// Validate all three tables.
pub fn ingest(
    locations: &RawTable,
    agents: &RawTable,
    visits: Option<&RawTable>,
    config: &PlannerConfig,
) -> Result<PlanInputs> {
    let aliases = config.aliases();

    let (locations, location_stats) = parse_locations(locations, config)?;
    let (agents, agent_stats) = parse_agents(agents, &aliases)?;
    let (visits, visit_stats) = match visits {
        Some(table) => parse_visits(table, &aliases),
        None => (Vec::new(), TableStats::default()),
    };

    info!(
        "Ingested {} locations, {} agents, {} visit records",
        locations.len(),
        agents.len(),
        visits.len()
    );

    Ok(PlanInputs {
        locations,
        agents,
        visits,
        report: IngestReport {
            locations: location_stats,
            agents: agent_stats,
            visits: visit_stats,
        },
    })
}
