use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A recorded visit to a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitEvent {
    pub location_id: String,
    pub date: NaiveDate,
    /// Who performed the visit, when the source table records it
    #[serde(default)]
    pub agent_id: Option<String>,
}

impl VisitEvent {
    pub fn new(location_id: impl Into<String>, date: NaiveDate) -> Self {
        Self { location_id: location_id.into(), date, agent_id: None }
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }
}
