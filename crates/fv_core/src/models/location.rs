use serde::{Deserialize, Serialize};

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Retail format of a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Convenience,
    Supermarket,
    Hypermarket,
}

impl Category {
    pub const ALL: [Category; 3] =
        [Category::Convenience, Category::Supermarket, Category::Hypermarket];

    /// Parse a free-form category value.
    ///
    /// Returns `None` for spellings outside the accepted set; ingestion maps
    /// those to [`Category::Convenience`].
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "convenience" | "convenience store" | "mini" | "мини" => Some(Category::Convenience),
            "supermarket" | "super" | "супер" => Some(Category::Supermarket),
            "hypermarket" | "hyper" | "гипер" => Some(Category::Hypermarket),
            _ => None,
        }
    }

    pub fn parse_or_default(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Convenience => "Convenience",
            Category::Supermarket => "Supermarket",
            Category::Hypermarket => "Hypermarket",
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Convenience
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A physical location that needs a number of visits within the quarter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub coordinates: Coordinates,
    pub city: String,
    pub category: Category,
    /// Visits required within the quarter (always >= 1)
    pub required_visits: u32,
    pub name: String,
    #[serde(default)]
    pub address: String,
}

impl Location {
    pub fn new(
        id: impl Into<String>,
        lat: f64,
        lon: f64,
        city: impl Into<String>,
        category: Category,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            coordinates: Coordinates::new(lat, lon),
            city: city.into(),
            category,
            required_visits: 1,
            address: String::new(),
        }
    }

    pub fn with_required_visits(mut self, visits: u32) -> Self {
        self.required_visits = visits.max(1);
        self
    }
}
