//! Error types for grid loading and reduction.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use netcdf_parser::NetCdfError;
use thiserror::Error;

/// Errors that can occur while loading or reducing a gridded time series.
#[derive(Error, Debug)]
pub enum GridProcessorError {
    /// No input file matched the expected pattern.
    #[error("no input files match {pattern}")]
    MissingInput { pattern: String },

    /// A file could not be opened or its schema was not recognized.
    #[error(transparent)]
    Schema(#[from] NetCdfError),

    /// A file's latitude or longitude axis differs from the first file's.
    #[error("{axis} axis of {} differs from {}", path.display(), reference.display())]
    AxisMismatch {
        axis: &'static str,
        path: PathBuf,
        reference: PathBuf,
    },

    /// The same instant is present more than once across the inputs.
    #[error("instant {instant} appears in both {} and {}", first.display(), second.display())]
    DuplicateInstant {
        instant: NaiveDateTime,
        first: PathBuf,
        second: PathBuf,
    },

    /// An instant does not belong to the year being processed.
    #[error("instant {instant} in {} is outside year {year}", path.display())]
    InstantOutsideYear {
        instant: NaiveDateTime,
        year: i32,
        path: PathBuf,
    },

    /// The input directory could not be scanned.
    #[error("failed to scan input directory {}: {message}", dir.display())]
    Discovery { dir: PathBuf, message: String },

    /// Array dimensions do not agree with the grid axes.
    #[error("invalid grid shape: {0}")]
    InvalidShape(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl GridProcessorError {
    /// Create a MissingInput error.
    pub fn missing_input(pattern: impl Into<String>) -> Self {
        Self::MissingInput {
            pattern: pattern.into(),
        }
    }
}

/// Result type for grid processor operations.
pub type Result<T> = std::result::Result<T, GridProcessorError>;
