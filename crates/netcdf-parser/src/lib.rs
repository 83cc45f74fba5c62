//! NetCDF reader for gridded reanalysis data (ERA5 and look-alikes).
//!
//! This crate opens one NetCDF file at a time through the native `netcdf`
//! library and returns a [`GridFile`]: decoded time instants, latitude and
//! longitude axes, and a dense `(time, latitude, longitude)` value array.
//!
//! # Schema normalization
//!
//! CDS exports vary between releases:
//!
//! - the temporal coordinate is `time` (legacy) or `valid_time` (CDS-Beta)
//! - ensemble products add a `number` dimension, near-real-time mixes add `expver`
//! - data may be packed as `short` with `scale_factor`/`add_offset`
//!
//! All of these are resolved through [`SchemaAliases`] and the variable's
//! candidate list, failing with the names that *are* present when nothing
//! matches.

pub mod error;
mod native;
pub mod schema;

pub use error::{NetCdfError, NetCdfResult};
pub use native::{read_grid_file, silence_hdf5_errors, GridFile};
pub use schema::{resolve_alias, SchemaAliases};
