use serde::{Deserialize, Serialize};

/// A field agent working out of a single home city.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub city: String,
}

impl Agent {
    pub fn new(id: impl Into<String>, city: impl Into<String>) -> Self {
        Self { id: id.into(), city: city.into() }
    }
}
