//! Projection of monthly climate grids onto features.
//!
//! - [`aggregate_regions`]: mean of the grid cells whose centers lie strictly
//!   inside each administrative region
//! - [`sample_settlements`]: value of the nearest grid cell at each settlement
//!
//! Inputs are GeoJSON FeatureCollections (optionally declaring Web Mercator
//! through a legacy `crs` member); outputs are FeatureCollections with one
//! `{prefix}_{MM}` field per month, `null` where no value exists.

pub mod error;
pub mod features;
pub mod output;
pub mod regions;
pub mod settlements;

pub use error::{FeatureError, Result};
pub use features::{
    load_regions, load_settlements, read_collection, value_key, FeatureSchema, Region, Settlement,
};
pub use output::{
    region_collection, regions_file_name, settlement_collection, settlements_file_name,
    write_collection,
};
pub use regions::{aggregate_regions, region_cells, RegionStats};
pub use settlements::{sample_settlements, OutOfExtentPolicy, SettlementSample};
