use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("Invalid quarter: {quarter} (expected 1-4)")]
    InvalidQuarter { quarter: u32 },

    #[error("Invalid year: {year}")]
    InvalidYear { year: i32 },

    #[error("Invalid coefficient for stage {stage}: {value}")]
    InvalidCoefficient { stage: usize, value: f64 },

    #[error("Table '{table}' is missing required columns: {}", columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },

    #[error("No valid locations remain after validation ({excluded} rows excluded)")]
    NoValidLocations { excluded: usize },

    #[error("No valid agents remain after validation ({excluded} rows excluded)")]
    NoValidAgents { excluded: usize },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PlanError {
    /// Whether the run can be retried with corrected input data.
    pub fn is_recoverable(&self) -> bool {
        match self {
            PlanError::MissingColumns { .. } => true,
            PlanError::NoValidLocations { .. } => true,
            PlanError::NoValidAgents { .. } => true,
            PlanError::Config(_) => true,
            PlanError::InvalidQuarter { .. } => false,
            PlanError::InvalidYear { .. } => false,
            PlanError::InvalidCoefficient { .. } => false,
        }
    }
}

impl From<serde_json::Error> for PlanError {
    fn from(err: serde_json::Error) -> Self {
        PlanError::Config(err.to_string())
    }
}

impl From<serde_yaml::Error> for PlanError {
    fn from(err: serde_yaml::Error) -> Self {
        PlanError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PlanError>;
