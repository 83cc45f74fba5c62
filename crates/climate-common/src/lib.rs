//! Common types and utilities shared across the climate aggregation workspace.

pub mod bbox;
pub mod crs;
pub mod grid;
pub mod time;
pub mod variable;

pub use bbox::BoundingBox;
pub use crs::{CrsCode, CrsParseError};
pub use grid::{Axis, GridAxes, GridPoint};
pub use time::{Calendar, CfTimeUnits, TimeParseError, TimeUnit};
pub use variable::{month_field, Reduction, UnitConversion, VariableSpec, MONTHS_PER_YEAR};
