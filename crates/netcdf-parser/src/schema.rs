//! Recognized aliases for the coordinates of reanalysis NetCDF files.
//!
//! Different CDS export pipelines name the same things differently
//! (`time` vs `valid_time`, `latitude` vs `lat`). Each logical field carries
//! an ordered alias list, resolved once per file into the name actually present.

use serde::{Deserialize, Serialize};

/// Ordered alias lists for every logical coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaAliases {
    /// Temporal coordinate names
    pub time: Vec<String>,
    /// Latitude coordinate names
    pub latitude: Vec<String>,
    /// Longitude coordinate names
    pub longitude: Vec<String>,
    /// Dimensions collapsed to their first index (ensemble member, experiment version)
    pub collapse: Vec<String>,
}

impl Default for SchemaAliases {
    fn default() -> Self {
        Self {
            time: strings(&["time", "valid_time"]),
            latitude: strings(&["latitude", "lat"]),
            longitude: strings(&["longitude", "lon"]),
            collapse: strings(&["number", "expver"]),
        }
    }
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Return the first candidate that appears in `present`.
pub fn resolve_alias<'a>(candidates: &'a [String], present: &[String]) -> Option<&'a str> {
    candidates
        .iter()
        .find(|c| present.iter().any(|p| p == *c))
        .map(|s| s.as_str())
}
