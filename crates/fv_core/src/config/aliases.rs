//! Canonical input fields and the column spellings accepted for each.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Logical column of an input table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    LocationId,
    Latitude,
    Longitude,
    City,
    Category,
    RequiredVisits,
    Name,
    Address,
    AgentId,
    VisitDate,
}

impl CanonicalField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::LocationId => "location_id",
            CanonicalField::Latitude => "latitude",
            CanonicalField::Longitude => "longitude",
            CanonicalField::City => "city",
            CanonicalField::Category => "category",
            CanonicalField::RequiredVisits => "required_visits",
            CanonicalField::Name => "name",
            CanonicalField::Address => "address",
            CanonicalField::AgentId => "agent_id",
            CanonicalField::VisitDate => "visit_date",
        }
    }

    fn default_aliases(&self) -> &'static [&'static str] {
        match self {
            CanonicalField::LocationId => {
                &["id", "point_id", "ID_Точки", "ID точки", "ID_точки"]
            }
            CanonicalField::Latitude => &["lat", "Широта"],
            CanonicalField::Longitude => &["lon", "lng", "Долгота"],
            CanonicalField::City => &["Город", "Город работы"],
            CanonicalField::Category => &["type", "Тип", "Тип точки"],
            CanonicalField::RequiredVisits => &["visits", "Кол-во_посещений"],
            CanonicalField::Name => &["Название_Точки"],
            CanonicalField::Address => &["Адрес"],
            CanonicalField::AgentId => &[
                "employee_id",
                "ID_Сотрудника",
                "ID Сотрудника",
                "ID_сотрудника",
                "Сотрудник",
            ],
            CanonicalField::VisitDate => {
                &["date", "visit date", "Дата_визита", "Дата визита", "Дата", "Дата посещения"]
            }
        }
    }

    pub const ALL: [CanonicalField; 10] = [
        CanonicalField::LocationId,
        CanonicalField::Latitude,
        CanonicalField::Longitude,
        CanonicalField::City,
        CanonicalField::Category,
        CanonicalField::RequiredVisits,
        CanonicalField::Name,
        CanonicalField::Address,
        CanonicalField::AgentId,
        CanonicalField::VisitDate,
    ];
}

/// Normalize a header cell for comparison: trim, drop a leading BOM, lowercase.
pub fn normalize_header(raw: &str) -> String {
    raw.trim().trim_start_matches('\u{feff}').trim().to_lowercase()
}

/// {canonical field -> accepted spellings}, resolved once per table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldAliases {
    map: BTreeMap<CanonicalField, Vec<String>>,
}

impl Default for FieldAliases {
    fn default() -> Self {
        let map = CanonicalField::ALL
            .iter()
            .map(|field| {
                let mut names = vec![field.as_str().to_string()];
                names.extend(field.default_aliases().iter().map(|s| s.to_string()));
                (*field, names)
            })
            .collect();
        Self { map }
    }
}

impl FieldAliases {
    /// Accepted spellings for `field`, canonical name first.
    pub fn names(&self, field: CanonicalField) -> &[String] {
        self.map.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Append extra spellings, keeping existing ones and their order.
    pub fn extend(&mut self, extra: &BTreeMap<CanonicalField, Vec<String>>) {
        for (field, names) in extra {
            let entry = self.map.entry(*field).or_default();
            for name in names {
                if !entry.iter().any(|n| normalize_header(n) == normalize_header(name)) {
                    entry.push(name.clone());
                }
            }
        }
    }

    /// Index of the first header matching any spelling of `field`.
    ///
    /// Spellings are tried in order, so the canonical name wins over aliases
    /// when a table carries both.
    pub fn find_column(&self, headers: &[String], field: CanonicalField) -> Option<usize> {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
        self.names(field).iter().find_map(|name| {
            let wanted = normalize_header(name);
            normalized.iter().position(|h| *h == wanted)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_find_column_by_alias() {
        let aliases = FieldAliases::default();
        let cols = headers(&["\u{feff}ID_Точки", "Широта", "Долгота", "Город", "Тип"]);

        assert_eq!(aliases.find_column(&cols, CanonicalField::LocationId), Some(0));
        assert_eq!(aliases.find_column(&cols, CanonicalField::Longitude), Some(2));
        assert_eq!(aliases.find_column(&cols, CanonicalField::RequiredVisits), None);
    }

    #[test]
    fn test_canonical_name_wins_over_alias() {
        let aliases = FieldAliases::default();
        let cols = headers(&["id", "Location_ID"]);
        assert_eq!(aliases.find_column(&cols, CanonicalField::LocationId), Some(1));
    }

    #[test]
    fn test_extend_adds_spellings_once() {
        let mut aliases = FieldAliases::default();
        let mut extra = BTreeMap::new();
        extra.insert(CanonicalField::City, vec!["Town".to_string(), "city".to_string()]);
        aliases.extend(&extra);

        let names = aliases.names(CanonicalField::City);
        assert_eq!(names.iter().filter(|n| normalize_header(n) == "city").count(), 1);
        assert_eq!(aliases.find_column(&headers(&["TOWN"]), CanonicalField::City), Some(0));
    }
}
