//! CF-convention time handling for gridded climate data.
//!
//! NetCDF time coordinates store numeric offsets from a reference epoch, e.g.
//! `hours since 1900-01-01 00:00:00.0` (classic ERA5) or
//! `seconds since 1970-01-01` (`valid_time` in newer CDS exports).

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit of a CF `<unit> since <epoch>` time coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "second" | "seconds" | "sec" | "secs" | "s" => Some(TimeUnit::Seconds),
            "minute" | "minutes" | "min" | "mins" => Some(TimeUnit::Minutes),
            "hour" | "hours" | "hr" | "hrs" | "h" => Some(TimeUnit::Hours),
            "day" | "days" | "d" => Some(TimeUnit::Days),
            _ => None,
        }
    }

    /// Length of one unit in milliseconds.
    pub fn millis(&self) -> f64 {
        match self {
            TimeUnit::Seconds => 1_000.0,
            TimeUnit::Minutes => 60_000.0,
            TimeUnit::Hours => 3_600_000.0,
            TimeUnit::Days => 86_400_000.0,
        }
    }
}

/// Calendar attached to a CF time coordinate.
///
/// Only calendars that agree with chrono's proleptic Gregorian arithmetic are
/// accepted; month grouping under `noleap` or `360_day` would silently shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Calendar {
    Standard,
    ProlepticGregorian,
}

impl Calendar {
    /// Parse the `calendar` attribute. A missing attribute means `standard`.
    pub fn parse(attr: Option<&str>) -> Result<Self, TimeParseError> {
        match attr.map(|s| s.trim().to_lowercase()) {
            None => Ok(Calendar::Standard),
            Some(name) => match name.as_str() {
                "standard" | "gregorian" => Ok(Calendar::Standard),
                "proleptic_gregorian" => Ok(Calendar::ProlepticGregorian),
                _ => Err(TimeParseError::UnsupportedCalendar(name)),
            },
        }
    }
}

/// Parsed CF time units: `<unit> since <reference>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfTimeUnits {
    pub unit: TimeUnit,
    pub reference: NaiveDateTime,
}

impl CfTimeUnits {
    /// Parse a CF `units` attribute.
    pub fn parse(units: &str) -> Result<Self, TimeParseError> {
        let (unit_str, reference_str) = units
            .split_once(" since ")
            .ok_or_else(|| TimeParseError::InvalidUnits(units.to_string()))?;

        let unit = TimeUnit::parse(unit_str.trim())
            .ok_or_else(|| TimeParseError::InvalidUnits(units.to_string()))?;
        let reference = parse_reference(reference_str.trim())
            .ok_or_else(|| TimeParseError::InvalidUnits(units.to_string()))?;

        Ok(Self { unit, reference })
    }

    /// Decode one stored offset into a timestamp.
    pub fn decode(&self, value: f64) -> Result<NaiveDateTime, TimeParseError> {
        if !value.is_finite() {
            return Err(TimeParseError::InvalidOffset(value));
        }
        let millis = (value * self.unit.millis()).round();
        if millis.abs() > i64::MAX as f64 {
            return Err(TimeParseError::InvalidOffset(value));
        }
        self.reference
            .checked_add_signed(Duration::milliseconds(millis as i64))
            .ok_or(TimeParseError::InvalidOffset(value))
    }
}

impl fmt::Display for CfTimeUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
        };
        write!(f, "{} since {}", unit, self.reference.format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Parse the reference epoch of a CF units string.
fn parse_reference(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim_end_matches('Z').trim_end_matches(" UTC").trim();

    const FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for format in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }

    // Date only
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid CF time units: '{0}'")]
    InvalidUnits(String),

    #[error("Time offset {0} cannot be decoded")]
    InvalidOffset(f64),

    #[error("Unsupported calendar: '{0}'")]
    UnsupportedCalendar(String),
}
