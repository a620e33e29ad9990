//! # Territory Assignment
//!
//! Partitions each city's locations across that city's agents.
//!
//! - No agents: the city's locations are reported as unassignable.
//! - One agent: the whole city is one territory, labelled with the city name.
//! - N agents: locations are sorted west to east by longitude and cut into N
//!   contiguous chunks of `count / N`; the last chunk takes the remainder.
//!   Chunks are labelled by cycling [`DIRECTION_TAGS`].

use crate::models::{Agent, Location};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Territory label suffixes, assigned in chunk order.
pub const DIRECTION_TAGS: [&str; 9] = [
    "West",
    "Center",
    "East",
    "North",
    "South",
    "North-West",
    "North-East",
    "South-West",
    "South-East",
];

/// Locations served by one agent within one city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Territory {
    pub city: String,
    pub label: String,
    pub agent_id: String,
    /// Member ids, west to east for multi-agent cities
    pub location_ids: Vec<String>,
}

impl Territory {
    pub fn is_empty(&self) -> bool {
        self.location_ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.location_ids.len()
    }
}

/// Locations of a city that has no agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnassignedCity {
    pub city: String,
    pub location_ids: Vec<String>,
}

/// Result of partitioning every city.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub territories: Vec<Territory>,
    pub unassigned: Vec<UnassignedCity>,
}

impl Assignment {
    pub fn territories_in<'a>(&'a self, city: &'a str) -> impl Iterator<Item = &'a Territory> + 'a {
        self.territories.iter().filter(move |t| t.city == city)
    }

    pub fn empty_territories(&self) -> impl Iterator<Item = &Territory> {
        self.territories.iter().filter(|t| t.is_empty())
    }

    /// Territory owned by `agent_id`.
    pub fn territory_of_agent(&self, agent_id: &str) -> Option<&Territory> {
        self.territories.iter().find(|t| t.agent_id == agent_id)
    }
}

/// Distinct cities in first-seen order.
pub(crate) fn cities_in_order<'a, I>(cities: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = Vec::new();
    for city in cities {
        if !seen.contains(&city) {
            seen.push(city);
        }
    }
    seen
}

/// Label of the `index`-th chunk of a multi-agent city.
pub fn territory_label(city: &str, index: usize) -> String {
    format!("{}-{}", city, DIRECTION_TAGS[index % DIRECTION_TAGS.len()])
}

/// Partition one city's locations across its agents.
pub fn assign_city(city: &str, locations: &[&Location], agents: &[&Agent]) -> Vec<Territory> {
    match agents.len() {
        0 => Vec::new(),
        1 => vec![Territory {
            city: city.to_string(),
            label: city.to_string(),
            agent_id: agents[0].id.clone(),
            location_ids: locations.iter().map(|l| l.id.clone()).collect(),
        }],
        n => {
            let mut sorted: Vec<&Location> = locations.to_vec();
            // Stable: equal longitudes keep input order
            sorted.sort_by(|a, b| a.coordinates.lon.total_cmp(&b.coordinates.lon));

            let chunk_size = sorted.len() / n;
            agents
                .iter()
                .enumerate()
                .map(|(i, agent)| {
                    let start = i * chunk_size;
                    let end = if i == n - 1 { sorted.len() } else { start + chunk_size };
                    Territory {
                        city: city.to_string(),
                        label: territory_label(city, i),
                        agent_id: agent.id.clone(),
                        location_ids: sorted[start..end].iter().map(|l| l.id.clone()).collect(),
                    }
                })
                .collect()
        }
    }
}

/// Partition every city. Cities are processed in parallel and collected back
/// in first-seen order of the location table.
pub fn assign_territories(locations: &[Location], agents: &[Agent]) -> Assignment {
    let cities = cities_in_order(locations.iter().map(|l| l.city.as_str()));

    let per_city: Vec<(Vec<Territory>, Option<UnassignedCity>)> = cities
        .par_iter()
        .map(|&city| {
            let city_locations: Vec<&Location> =
                locations.iter().filter(|l| l.city == city).collect();
            let city_agents: Vec<&Agent> = agents.iter().filter(|a| a.city == city).collect();

            if city_agents.is_empty() {
                warn!(
                    "City {} has no agents; {} locations left unassigned",
                    city,
                    city_locations.len()
                );
                let unassigned = UnassignedCity {
                    city: city.to_string(),
                    location_ids: city_locations.iter().map(|l| l.id.clone()).collect(),
                };
                return (Vec::new(), Some(unassigned));
            }

            let territories = assign_city(city, &city_locations, &city_agents);
            for t in territories.iter().filter(|t| t.is_empty()) {
                warn!("Agent {} in city {} received no locations", t.agent_id, city);
            }
            debug!(
                "City {}: {} locations across {} territories",
                city,
                city_locations.len(),
                territories.len()
            );
            (territories, None)
        })
        .collect();

    let mut assignment = Assignment::default();
    for (territories, unassigned) in per_city {
        assignment.territories.extend(territories);
        assignment.unassigned.extend(unassigned);
    }
    assignment
}
