//! # Planner Configuration
//!
//! Every tunable of a planning run lives here.
//!
//! ```rust
//! use fv_core::config::PlannerConfig;
//!
//! let config = PlannerConfig::for_quarter(2025, 2);
//! assert!(config.validate().is_ok());
//! ```

mod aliases;

pub use aliases::{normalize_header, CanonicalField, FieldAliases};

use crate::calendar::STAGE_COUNT;
use crate::error::{PlanError, Result};
use crate::models::Coordinates;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::{env, fs};

/// Environment variable naming a config file for the CLI.
pub const CONFIG_PATH_ENV: &str = "FV_CONFIG_PATH";

/// Supported region for location coordinates (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Default for CoordinateBounds {
    fn default() -> Self {
        Self { min_lat: 41.0, max_lat: 82.0, min_lon: 19.0, max_lon: 180.0 }
    }
}

impl CoordinateBounds {
    pub fn contains(&self, c: Coordinates) -> bool {
        c.lat >= self.min_lat && c.lat <= self.max_lat && c.lon >= self.min_lon && c.lon <= self.max_lon
    }
}

/// Settings for one planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub year: i32,
    /// 1-4
    pub quarter: u32,
    /// Load coefficient per stage (positive)
    pub coefficients: [f64; STAGE_COUNT],
    /// Margin around 1- and 2-point territories, in degrees
    pub boundary_margin_deg: f64,
    pub bounds: CoordinateBounds,
    /// Additional column spellings on top of the built-in alias table
    pub extra_aliases: BTreeMap<CanonicalField, Vec<String>>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            year: 2025,
            quarter: 1,
            coefficients: [0.8, 1.0, 1.2, 0.9],
            boundary_margin_deg: 0.005,
            bounds: CoordinateBounds::default(),
            extra_aliases: BTreeMap::new(),
        }
    }
}

impl PlannerConfig {
    pub fn for_quarter(year: i32, quarter: u32) -> Self {
        Self { year, quarter, ..Self::default() }
    }

    /// Flat workload: every stage weighs the same.
    pub fn uniform(year: i32, quarter: u32) -> Self {
        Self { coefficients: [1.0; STAGE_COUNT], ..Self::for_quarter(year, quarter) }
    }

    pub fn with_coefficients(mut self, coefficients: [f64; STAGE_COUNT]) -> Self {
        self.coefficients = coefficients;
        self
    }

    /// Built-in alias table merged with `extra_aliases`.
    pub fn aliases(&self) -> FieldAliases {
        let mut aliases = FieldAliases::default();
        aliases.extend(&self.extra_aliases);
        aliases
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=4).contains(&self.quarter) {
            return Err(PlanError::InvalidQuarter { quarter: self.quarter });
        }
        for (i, &value) in self.coefficients.iter().enumerate() {
            if !value.is_finite() || value <= 0.0 {
                return Err(PlanError::InvalidCoefficient { stage: i + 1, value });
            }
        }
        if !self.boundary_margin_deg.is_finite() || self.boundary_margin_deg <= 0.0 {
            return Err(PlanError::Config(format!(
                "boundary_margin_deg must be positive, got {}",
                self.boundary_margin_deg
            )));
        }
        let b = &self.bounds;
        if b.min_lat >= b.max_lat || b.min_lon >= b.max_lon {
            return Err(PlanError::Config(format!("empty coordinate bounds: {:?}", b)));
        }
        Ok(())
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load and validate a config file; `.json` is parsed as JSON, anything
    /// else as YAML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PlanError::Config(format!("failed to read config '{}': {e}", path.display()))
        })?;

        let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
        let config = if is_json { Self::from_json(&content)? } else { Self::from_yaml(&content)? };

        config.validate()?;
        Ok(config)
    }

    /// Config named by [`CONFIG_PATH_ENV`], if the variable is set and non-empty.
    pub fn from_env() -> Result<Option<Self>> {
        let Ok(path) = env::var(CONFIG_PATH_ENV) else {
            return Ok(None);
        };

        let path = path.trim();
        if path.is_empty() {
            return Ok(None);
        }

        Self::from_path(Path::new(path)).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_is_valid() {
        let config = PlannerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.coefficients, [0.8, 1.0, 1.2, 0.9]);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_quarter = PlannerConfig::for_quarter(2025, 7);
        assert_eq!(bad_quarter.validate(), Err(PlanError::InvalidQuarter { quarter: 7 }));

        let bad_coeff = PlannerConfig::default().with_coefficients([1.0, 1.0, -0.5, 1.0]);
        assert!(matches!(
            bad_coeff.validate(),
            Err(PlanError::InvalidCoefficient { stage: 3, .. })
        ));

        let bad_margin = PlannerConfig { boundary_margin_deg: 0.0, ..PlannerConfig::default() };
        assert!(matches!(bad_margin.validate(), Err(PlanError::Config(_))));
    }

    #[test]
    fn test_yaml_partial_config_uses_defaults() {
        let yaml = "year: 2024\nquarter: 3\nextra_aliases:\n  city: [Town]\n";
        let config = PlannerConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.year, 2024);
        assert_eq!(config.quarter, 3);
        assert_eq!(config.coefficients, PlannerConfig::default().coefficients);
        let headers = vec!["town".to_string()];
        assert_eq!(config.aliases().find_column(&headers, CanonicalField::City), Some(0));
    }

    #[test]
    fn test_from_path_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"year": 2026, "quarter": 2, "coefficients": [1, 1, 1, 1]}}"#).unwrap();

        let config = PlannerConfig::from_path(file.path()).unwrap();
        assert_eq!(config.year, 2026);
        assert_eq!(config.coefficients, [1.0; 4]);
    }

    #[test]
    fn test_from_path_rejects_invalid() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "quarter: 9").unwrap();
        assert!(PlannerConfig::from_path(file.path()).is_err());
    }

    #[test]
    fn test_bounds_contains() {
        let bounds = CoordinateBounds::default();
        assert!(bounds.contains(Coordinates::new(55.75, 37.61)));
        assert!(!bounds.contains(Coordinates::new(40.0, 37.61)));
        assert!(!bounds.contains(Coordinates::new(55.0, 18.9)));
    }
}
