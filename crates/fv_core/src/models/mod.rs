//! # Input Models
//!
//! Immutable records produced by ingestion and read by every planning stage.

pub mod agent;
pub mod location;
pub mod visit;

pub use agent::Agent;
pub use location::{Category, Coordinates, Location};
pub use visit::VisitEvent;
