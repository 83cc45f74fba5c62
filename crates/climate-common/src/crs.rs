//! Coordinate Reference System codes for feature inputs.
//!
//! Feature collections are processed in geographic longitude/latitude. Inputs
//! in Web Mercator are converted on load; anything else is rejected.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// WGS84 semi-major axis used by spherical Web Mercator (meters).
const EARTH_RADIUS_M: f64 = 6378137.0;

/// Well-known CRS codes accepted on feature input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsCode {
    /// WGS84 Geographic (lon/lat in degrees)
    Epsg4326,
    /// NAD83 Geographic, treated as WGS84 at this resolution
    Epsg4269,
    /// Web Mercator (meters)
    Epsg3857,
}

impl CrsCode {
    /// Parse a CRS name as found in a GeoJSON `crs` member.
    ///
    /// Accepts formats like:
    /// - "EPSG:4326"
    /// - "urn:ogc:def:crs:EPSG::4326"
    /// - "urn:ogc:def:crs:OGC:1.3:CRS84"
    /// - "CRS:84"
    pub fn from_name(s: &str) -> Result<Self, CrsParseError> {
        let normalized = s.trim().to_uppercase();
        let short = normalized
            .strip_prefix("URN:OGC:DEF:CRS:")
            .unwrap_or(&normalized)
            .replace("::", ":");

        match short.as_str() {
            "EPSG:4326" | "CRS:84" | "OGC:CRS84" | "OGC:1.3:CRS84" | "CRS84" => {
                Ok(CrsCode::Epsg4326)
            }
            "EPSG:4269" => Ok(CrsCode::Epsg4269),
            "EPSG:3857" | "EPSG:900913" | "EPSG:102100" => Ok(CrsCode::Epsg3857),
            _ => Err(CrsParseError::UnsupportedCrs(s.to_string())),
        }
    }

    /// Check if this is a geographic (lat/lon) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsCode::Epsg4326 | CrsCode::Epsg4269)
    }

    /// Convert a coordinate in this CRS to `(longitude, latitude)` degrees.
    pub fn to_geographic(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            CrsCode::Epsg4326 | CrsCode::Epsg4269 => (x, y),
            CrsCode::Epsg3857 => {
                let lon = (x / EARTH_RADIUS_M).to_degrees();
                let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - PI / 2.0).to_degrees();
                (lon, lat)
            }
        }
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            CrsCode::Epsg4326 => "EPSG:4326",
            CrsCode::Epsg4269 => "EPSG:4269",
            CrsCode::Epsg3857 => "EPSG:3857",
        };
        write!(f, "{}", code)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrsParseError {
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),
}
