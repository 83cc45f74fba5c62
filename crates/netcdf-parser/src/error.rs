//! Error types for NetCDF parsing operations.

use std::path::PathBuf;

use climate_common::TimeParseError;
use thiserror::Error;

/// Result type for NetCDF parser operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF parsing.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The file could not be opened by the NetCDF library
    #[error("Failed to open NetCDF file {path:?}: {message}")]
    Open { path: PathBuf, message: String },

    /// None of the candidate data variable names is present
    #[error(
        "No recognized data variable in {path:?}: expected one of {candidates:?}, variables present: {available:?}"
    )]
    UnrecognizedVariable {
        path: PathBuf,
        candidates: Vec<String>,
        available: Vec<String>,
    },

    /// None of the candidate time coordinate names is present
    #[error(
        "No recognized time coordinate in {path:?}: expected one of {candidates:?}, variables present: {available:?}"
    )]
    UnrecognizedTimeCoordinate {
        path: PathBuf,
        candidates: Vec<String>,
        available: Vec<String>,
    },

    /// None of the candidate names for a spatial axis is present
    #[error(
        "No recognized {axis} coordinate in {path:?}: expected one of {candidates:?}, variables present: {available:?}"
    )]
    UnrecognizedAxis {
        axis: &'static str,
        path: PathBuf,
        candidates: Vec<String>,
        available: Vec<String>,
    },

    /// The data variable has a non-degenerate dimension that is not time,
    /// latitude, longitude or a configured collapsible dimension
    #[error("Unexpected dimension '{dimension}' (length {len}) on variable '{variable}' in {path:?}")]
    UnexpectedDimension {
        path: PathBuf,
        variable: String,
        dimension: String,
        len: usize,
    },

    /// Time coordinate could not be decoded
    #[error("Invalid time coordinate in {path:?}: {source}")]
    Time {
        path: PathBuf,
        #[source]
        source: TimeParseError,
    },

    /// Missing required variable or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}
