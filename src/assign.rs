//! Mapping an ordered batch of files onto target coordinates.

use std::collections::HashSet;

use crate::error::GeotagError;
use crate::geo::{Coordinate, RadiusSampler, UniformSource};

/// Outcome of geocoding a list of place names.
///
/// Keeps insertion order so the fallback choice for unresolved names is
/// stable from run to run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameResolutions {
    entries: Vec<(String, Option<Coordinate>)>,
}

impl NameResolutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the result of looking up `name`. A name is recorded once;
    /// later calls for the same name are ignored.
    pub fn insert(&mut self, name: impl Into<String>, coord: Option<Coordinate>) {
        let name = name.into();
        if !self.entries.iter().any(|(n, _)| *n == name) {
            self.entries.push((name, coord));
        }
    }

    pub fn get(&self, name: &str) -> Option<Coordinate> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, c)| *c)
    }

    pub fn resolved(&self) -> impl Iterator<Item = (&str, Coordinate)> {
        self.entries
            .iter()
            .filter_map(|(n, c)| c.map(|c| (n.as_str(), c)))
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, c)| c.is_none())
            .map(|(n, _)| n.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Option<Coordinate>)> for NameResolutions {
    fn from_iter<I: IntoIterator<Item = (String, Option<Coordinate>)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (name, coord) in iter {
            out.insert(name, coord);
        }
        out
    }
}

/// How target coordinates are chosen for a batch.
#[derive(Debug, Clone)]
pub enum PlacementMode {
    /// Scatter every file independently around one pinned point.
    Pin { center: Coordinate, radius_km: f64 },
    /// Cycle through place names; duplicates in `names` are kept and
    /// drive the cycle.
    CityList {
        names: Vec<String>,
        resolved: NameResolutions,
    },
}

/// Split free-form user input into place names.
///
/// Commas and newlines both separate names; tokens are trimmed and empty
/// tokens dropped. Duplicates are preserved.
pub fn parse_place_names(text: &str) -> Result<Vec<String>, GeotagError> {
    let names: Vec<String> = text
        .split([',', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if names.is_empty() {
        return Err(GeotagError::Validation(
            "Please enter at least one city.".to_string(),
        ));
    }
    Ok(names)
}

/// De-duplicate names for lookup, keeping first-appearance order.
pub fn unique_names(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .filter(|n| seen.insert(n.as_str()))
        .cloned()
        .collect()
}

/// Produce exactly `file_count` targets, one per file by position.
pub fn assign<R: UniformSource>(
    file_count: usize,
    mode: &PlacementMode,
    sampler: &mut RadiusSampler<R>,
) -> Result<Vec<Coordinate>, GeotagError> {
    match mode {
        PlacementMode::Pin { center, radius_km } => Ok((0..file_count)
            .map(|_| sampler.sample(*center, *radius_km))
            .collect()),
        PlacementMode::CityList { names, resolved } => assign_cyclic(file_count, names, resolved),
    }
}

fn assign_cyclic(
    file_count: usize,
    names: &[String],
    resolved: &NameResolutions,
) -> Result<Vec<Coordinate>, GeotagError> {
    if names.is_empty() {
        return Err(GeotagError::Validation(
            "Please enter at least one city.".to_string(),
        ));
    }

    let fallback = names
        .iter()
        .find_map(|n| resolved.get(n))
        .or_else(|| resolved.resolved().map(|(_, c)| c).next())
        .ok_or_else(|| {
            GeotagError::Resolution(
                "Could not find coordinates for any of the given places.".to_string(),
            )
        })?;

    Ok((0..file_count)
        .map(|i| {
            let name = &names[i % names.len()];
            resolved.get(name).unwrap_or_else(|| {
                log::debug!("No coordinates for {name:?}, using fallback {fallback}");
                fallback
            })
        })
        .collect())
}
