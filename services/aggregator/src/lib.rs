//! Climate aggregation service.
//!
//! Reduces one year of ERA5 grids per configured variable to monthly values
//! and publishes them as GeoJSON for administrative regions (mean over the
//! enclosed grid cells) and settlements (nearest grid cell).

pub mod config;
pub mod pipeline;

pub use config::{load_config, AggregatorConfig};
pub use pipeline::{Pipeline, RunSummary, VariableOutput};
