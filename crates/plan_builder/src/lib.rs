//! Plan Builder Library
//!
//! CSV tables → validated inputs → quarterly plan → JSON output tables
//! plus a SHA256 checksum over everything written.

pub mod tables;

use anyhow::{Context, Result};
use fv_core::{PlanOutput, PlannerConfig, STAGE_COUNT};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub use tables::{parse_csv_table, read_csv_table};

/// Output files, in checksum order.
pub const OUTPUT_FILES: [&str; 5] = [
    "territories.json",
    "weekly_plan.json",
    "boundaries.json",
    "reconciliation.json",
    "report.json",
];

/// Input files of one run.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub locations: PathBuf,
    pub agents: PathBuf,
    pub visits: Option<PathBuf>,
    pub out_dir: PathBuf,
}

/// Run metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanMetadata {
    /// fv_core version that produced the plan
    pub engine_version: String,
    /// Quarter label (e.g. "Q1 2025")
    pub quarter: String,
    /// SHA256 over all output files (hex)
    pub checksum: String,
    /// RFC3339 creation time
    pub created_at: String,
    pub locations: usize,
    pub agents: usize,
    pub visits: usize,
    pub territories: usize,
    pub planned_visits: u64,
    pub warnings: usize,
}

/// Contents of `report.json`.
#[derive(Debug, Serialize)]
struct RunReport<'a> {
    quarter: String,
    calendar: &'a fv_core::QuarterCalendar,
    quotas: &'a fv_core::QuotaPlan,
    ingest: &'a fv_core::IngestReport,
    warnings: &'a [fv_core::PlanWarning],
}

/// Parse `a,b,c,d` stage coefficients.
pub fn parse_coefficients(raw: &str) -> Result<[f64; STAGE_COUNT]> {
    let values: Vec<f64> = raw
        .split(',')
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .with_context(|| format!("Invalid coefficient '{}'", v.trim()))
        })
        .collect::<Result<_>>()?;

    values
        .try_into()
        .map_err(|v: Vec<f64>| anyhow::anyhow!("Expected {} coefficients, got {}", STAGE_COUNT, v.len()))
}

/// Config from `path`, else from `FV_CONFIG_PATH`, else defaults.
pub fn load_config(path: Option<&Path>) -> Result<PlannerConfig> {
    if let Some(path) = path {
        return PlannerConfig::from_path(path)
            .with_context(|| format!("Failed to load config: {}", path.display()));
    }
    Ok(PlannerConfig::from_env()?.unwrap_or_default())
}

/// Read the input tables and plan the configured quarter.
pub fn build_plan(request: &PlanRequest, config: &PlannerConfig) -> Result<PlanOutput> {
    let locations = read_csv_table(&request.locations, "locations")?;
    let agents = read_csv_table(&request.agents, "agents")?;
    let visits = request
        .visits
        .as_deref()
        .map(|path| read_csv_table(path, "visits"))
        .transpose()?;

    let inputs = fv_core::ingest(&locations, &agents, visits.as_ref(), config)?;
    let output = fv_core::plan(&inputs, config)?;
    Ok(output)
}

fn serialized_outputs(output: &PlanOutput) -> Result<Vec<(&'static str, String)>> {
    let report = RunReport {
        quarter: output.calendar.quarter.label(),
        calendar: &output.calendar,
        quotas: &output.quotas,
        ingest: &output.ingest,
        warnings: &output.warnings,
    };

    let contents = [
        serde_json::to_string_pretty(&output.assignment)?,
        serde_json::to_string_pretty(&output.weekly_plan)?,
        serde_json::to_string_pretty(&output.boundaries)?,
        serde_json::to_string_pretty(&output.reconciliation)?,
        serde_json::to_string_pretty(&report)?,
    ];

    Ok(OUTPUT_FILES.into_iter().zip(contents).collect())
}

fn checksum_of<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    format!("{:x}", hasher.finalize())
}

/// Write every output table into `out_dir` and describe the run.
pub fn write_outputs(output: &PlanOutput, out_dir: &Path) -> Result<PlanMetadata> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    let files = serialized_outputs(output).context("Failed to serialize plan")?;
    for (name, content) in &files {
        let path = out_dir.join(name);
        fs::write(&path, content)
            .with_context(|| format!("Failed to write output file: {}", path.display()))?;
    }

    let checksum = checksum_of(files.iter().map(|(_, c)| c.as_bytes()));
    info!("Wrote {} output files to {}", files.len(), out_dir.display());

    Ok(PlanMetadata {
        engine_version: fv_core::VERSION.to_string(),
        quarter: output.calendar.quarter.label(),
        checksum,
        created_at: chrono::Utc::now().to_rfc3339(),
        locations: output.ingest.locations.accepted,
        agents: output.ingest.agents.accepted,
        visits: output.reconciliation.accepted_visits,
        territories: output.assignment.territories.len(),
        planned_visits: output.planned_total(),
        warnings: output.warnings.len(),
    })
}

/// Build and write a plan in one go.
pub fn run_plan(request: &PlanRequest, config: &PlannerConfig) -> Result<(PlanOutput, PlanMetadata)> {
    let output = build_plan(request, config)?;
    let meta = write_outputs(&output, &request.out_dir)?;
    Ok((output, meta))
}

/// Recompute the checksum of the output files in `out_dir`.
pub fn verify_outputs(out_dir: &Path, expected_checksum: &str) -> Result<bool> {
    let mut contents = Vec::with_capacity(OUTPUT_FILES.len());
    for name in OUTPUT_FILES {
        let path = out_dir.join(name);
        let bytes = fs::read(&path)
            .with_context(|| format!("Failed to read output file: {}", path.display()))?;
        contents.push(bytes);
    }

    let actual = checksum_of(contents.iter().map(Vec::as_slice));
    Ok(actual == expected_checksum)
}
