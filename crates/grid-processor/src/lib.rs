//! Multi-file grid loading and monthly reduction.
//!
//! The per-month input files of one variable are discovered by name, opened
//! one by one through `netcdf-parser`, checked for identical axes and
//! concatenated along time into a [`GriddedTimeSeries`]. That series is then
//! converted to reporting units and reduced to a [`MonthlyGrid`].
//!
//! # Architecture
//!
//! ```text
//! GridLoader::load(spec, year)
//!      │
//!      ├─► discover files matching era5_{category}_{year}_*.nc
//!      │
//!      ├─► read_grid_file() per file (aliases, packing, collapse)
//!      │
//!      ├─► GriddedTimeSeries::concat (axis check, sort, year check)
//!      │
//!      └─► normalize_longitudes (0..360 -> -180..180)
//!               │
//!               ▼
//!      reduce_monthly(series, spec) -> MonthlyGrid (12 months)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use climate_common::VariableSpec;
//! use grid_processor::{reduce_monthly, GridLoader, LoaderConfig};
//!
//! let loader = GridLoader::new(LoaderConfig::default());
//! let spec = VariableSpec::precipitation();
//! let series = loader.load(&spec, 2024)?;
//! let monthly = reduce_monthly(&series, &spec);
//! ```

pub mod config;
pub mod error;
pub mod loader;
pub mod reduce;
pub mod series;

// Re-export commonly used types at crate root
pub use config::{LoaderConfig, DEFAULT_FILE_PATTERN};
pub use error::{GridProcessorError, Result};
pub use loader::{wildcard_match, GridLoader};
pub use reduce::{reduce_monthly, MonthlyGrid};
pub use series::GriddedTimeSeries;
