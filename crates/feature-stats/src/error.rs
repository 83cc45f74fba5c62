//! Error types for feature input, aggregation and output.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading, aggregating or writing features.
#[derive(Error, Debug)]
pub enum FeatureError {
    /// Reading or writing a file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid GeoJSON or not a FeatureCollection.
    #[error("invalid GeoJSON in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// The collection declares a coordinate reference that cannot be converted.
    #[error("unsupported CRS '{name}' in {}", path.display())]
    UnsupportedCrs { path: PathBuf, name: String },

    /// A feature geometry is missing or of the wrong kind.
    #[error("invalid geometry for feature {feature} in {}: {reason}", path.display())]
    InvalidGeometry {
        path: PathBuf,
        feature: String,
        reason: String,
    },

    /// A required property is absent.
    #[error("feature {feature} in {} has no '{property}' property", path.display())]
    MissingProperty {
        path: PathBuf,
        feature: String,
        property: String,
    },

    /// Two features share an identifier.
    #[error("duplicate identifier {id} in {}", path.display())]
    DuplicateId { path: PathBuf, id: String },

    /// A settlement lies outside the grid coverage.
    #[error("settlement {id} at ({lon}, {lat}) is outside the grid coverage")]
    OutOfExtent { id: String, lon: f64, lat: f64 },

    /// The grid has no cells to sample.
    #[error("grid has no cells")]
    EmptyGrid,

    /// Serializing an output collection failed.
    #[error("failed to serialize {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for feature operations.
pub type Result<T> = std::result::Result<T, FeatureError>;
