//! # fv_core - Deterministic Field Visit Coverage Planner
//!
//! Turns a catalog of retail locations and a roster of field agents into a
//! quarterly visit plan, and measures recorded visits against it.
//!
//! ## Features
//! - Quarter calendar with ISO weeks and four weighted workload stages
//! - Per-city territory split by longitude, with approximate boundaries
//! - Integer per-agent, per-week quotas that conserve the city total
//! - Plan-vs-fact reconciliation by city, category, territory-week and location
//! - Same input, same output

// Planning APIs pass several independent tables around
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

pub mod boundary;
pub mod calendar;
pub mod config;
pub mod error;
pub mod ingest;
pub mod models;
pub mod planner;
pub mod quota;
pub mod reconcile;
pub mod territory;

pub use boundary::{generate_boundaries, Boundary, BoundaryMethod};
pub use calendar::{IsoWeekKey, Quarter, QuarterCalendar, Stage, Week, STAGE_COUNT};
pub use config::{CanonicalField, CoordinateBounds, FieldAliases, PlannerConfig};
pub use error::{PlanError, Result};
pub use ingest::{ingest, IngestReport, PlanInputs, RawTable, TableStats};
pub use models::{Agent, Category, Coordinates, Location, VisitEvent};
pub use planner::{plan, PlanOutput, PlanWarning};
pub use quota::{distribute_quotas, QuotaPlan, WeeklyPlanEntry};
pub use reconcile::{reconcile, Reconciliation, ReconciliationRecord, RecordKey};
pub use territory::{assign_territories, Assignment, Territory};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
