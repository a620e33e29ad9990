//! Plan Builder CLI
//!
//! CSV exports → quarterly visit plan (JSON tables)

#[cfg(feature = "cli")]
use anyhow::Result;
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "plan_builder")]
#[command(about = "Build quarterly field-visit plans from CSV tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Build a plan and reconcile recorded visits
    Plan {
        /// Location catalog CSV
        #[arg(long)]
        locations: PathBuf,

        /// Agent roster CSV
        #[arg(long)]
        agents: PathBuf,

        /// Recorded visits CSV
        #[arg(long)]
        visits: Option<PathBuf>,

        /// Planning year (overrides config)
        #[arg(long)]
        year: Option<i32>,

        /// Quarter 1-4 (overrides config)
        #[arg(long)]
        quarter: Option<u32>,

        /// Stage coefficients "a,b,c,d" (overrides config)
        #[arg(long)]
        coefficients: Option<String>,

        /// YAML or JSON config file (default: $FV_CONFIG_PATH)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory
        #[arg(long)]
        out: PathBuf,

        /// Verify outputs after writing
        #[arg(long, default_value = "false")]
        verify: bool,

        /// Output metadata JSON file
        #[arg(long)]
        metadata: Option<PathBuf>,
    },

    /// Print the weeks and stages of a quarter
    Calendar {
        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        quarter: Option<u32>,

        /// Stage coefficients "a,b,c,d"
        #[arg(long)]
        coefficients: Option<String>,

        /// YAML or JSON config file (default: $FV_CONFIG_PATH)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[cfg(feature = "cli")]
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Plan {
            locations,
            agents,
            visits,
            year,
            quarter,
            coefficients,
            config,
            out,
            verify,
            metadata,
        } => {
            let config = resolve_config(config, year, quarter, coefficients)?;

            println!("🔨 Building visit plan...");
            println!("   Locations: {}", locations.display());
            println!("   Agents:    {}", agents.display());
            if let Some(visits) = &visits {
                println!("   Visits:    {}", visits.display());
            }
            println!("   Output:    {}", out.display());
            println!("   Quarter:   Q{} {}", config.quarter, config.year);

            let request = plan_builder::PlanRequest { locations, agents, visits, out_dir: out };
            let (output, meta) = plan_builder::run_plan(&request, &config)?;

            print_summary(&output, &meta);

            if verify {
                verify_output_integrity(&request.out_dir, &meta.checksum)?;
            }

            if let Some(metadata_path) = metadata {
                save_metadata(&metadata_path, &meta)?;
            }
        }

        Commands::Calendar { year, quarter, coefficients, config } => {
            let config = resolve_config(config, year, quarter, coefficients)?;
            let calendar = fv_core::QuarterCalendar::resolve(
                config.year,
                config.quarter,
                config.coefficients,
            )?;
            print_calendar(&calendar);
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn resolve_config(
    path: Option<PathBuf>,
    year: Option<i32>,
    quarter: Option<u32>,
    coefficients: Option<String>,
) -> Result<fv_core::PlannerConfig> {
    let mut config = plan_builder::load_config(path.as_deref())?;
    if let Some(year) = year {
        config.year = year;
    }
    if let Some(quarter) = quarter {
        config.quarter = quarter;
    }
    if let Some(raw) = coefficients {
        config.coefficients = plan_builder::parse_coefficients(&raw)?;
    }
    config.validate()?;
    Ok(config)
}

#[cfg(feature = "cli")]
fn print_summary(output: &fv_core::PlanOutput, meta: &plan_builder::PlanMetadata) {
    let recon = &output.reconciliation;

    println!("\n✅ Plan built for {}", meta.quarter);
    println!("   Locations:       {}", meta.locations);
    println!("   Agents:          {}", meta.agents);
    println!("   Territories:     {}", meta.territories);
    println!(
        "   Planned visits:  {} (required {})",
        meta.planned_visits,
        output.required_total()
    );
    println!("   Matched visits:  {}", meta.visits);
    println!(
        "   Locations met:   {}/{}",
        recon.locations_met(),
        recon.by_location.len()
    );
    for city in &recon.by_city {
        if let fv_core::RecordKey::City { city: name } = &city.key {
            println!(
                "     {:<20} {:>5}/{:<5} {:>6.1}%",
                name, city.actual, city.planned, city.completion_pct
            );
        }
    }
    let anomalies = recon.anomalies;
    if anomalies.unknown_location + anomalies.out_of_window + anomalies.unattributed > 0 {
        println!(
            "   Anomalies:       {} unknown location, {} out of quarter, {} unattributed",
            anomalies.unknown_location, anomalies.out_of_window, anomalies.unattributed
        );
    }
    for warning in &output.warnings {
        println!("   ⚠️  {}", warning);
    }
    println!("   Checksum:        {}", meta.checksum);
    println!("   Created:         {}", meta.created_at);
}

#[cfg(feature = "cli")]
fn print_calendar(calendar: &fv_core::QuarterCalendar) {
    println!("📅 {}", calendar.quarter.label());
    println!("\n   Weeks:");
    for week in &calendar.weeks {
        println!("     {}  {}", week.iso, week.label());
    }
    println!("\n   Stages:");
    for stage in &calendar.stages {
        println!(
            "     Stage {}: {} - {}  x{:.2}  ({} working days)",
            stage.index,
            stage.start_date.format("%d.%m.%Y"),
            stage.end_date.format("%d.%m.%Y"),
            stage.coefficient,
            stage.workable_days().len()
        );
    }
}

#[cfg(feature = "cli")]
fn verify_output_integrity(out_dir: &std::path::Path, checksum: &str) -> Result<()> {
    println!("\n🔍 Verifying output integrity...");
    let is_valid = plan_builder::verify_outputs(out_dir, checksum)?;

    if is_valid {
        println!("✅ Output verification passed");
        Ok(())
    } else {
        anyhow::bail!("❌ Output verification failed - checksum mismatch!")
    }
}

#[cfg(feature = "cli")]
fn save_metadata(path: &PathBuf, meta: &plan_builder::PlanMetadata) -> Result<()> {
    let metadata_json = serde_json::to_string_pretty(meta)?;
    std::fs::write(path, metadata_json)?;
    println!("\n📄 Metadata saved to: {}", path.display());
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("plan_builder CLI is not available. Enable the 'cli' feature to use it.");
    std::process::exit(1);
}
