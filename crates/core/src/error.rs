//! Error types for polyclean

use thiserror::Error;

/// Main error type for polyclean operations.
///
/// Variants group into fatal kinds (configuration, source dataset,
/// destination dataset, geometry type) plus I/O plumbing.
/// Per-feature conditions (missing geometry, no touching neighbor, ...)
/// are never errors; they are logged and counted in the run summary.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration
    #[error("No victims specified: provide a filter expression or a feature-ID list")]
    NoVictimsSpecified,

    #[error("Conflicting victim specification: give either a filter expression or an ID list, not both")]
    ConflictingVictimSpec,

    #[error("Invalid minimum area {0}: must be greater than zero")]
    InvalidMinArea(f64),

    #[error("Cannot determine output driver for '{0}'")]
    UnknownDriver(String),

    #[error("Invalid attribute filter '{expression}': {reason}")]
    InvalidFilter { expression: String, reason: String },

    // Source dataset
    #[error("Cannot open source dataset '{0}'")]
    OpenFailed(String),

    #[error("Layer '{0}' not found")]
    LayerNotFound(String),

    #[error("Source has {0} layers; a layer name must be given")]
    AmbiguousLayer(usize),

    #[error("Source layer has no geometry column")]
    MissingGeometryColumn,

    #[error("Source layer has {0} geometry columns; only one is supported")]
    MultipleGeometryColumns(usize),

    // Destination dataset
    #[error("Cannot create destination dataset '{0}'")]
    CreateFailed(String),

    #[error("Cannot create field '{0}' on destination layer")]
    FieldCreateFailed(String),

    #[error("Failed writing feature to destination layer: {0}")]
    WriteFailed(String),

    // Geometry
    #[error("Unsupported geometry type '{0}'")]
    UnsupportedGeometryType(String),

    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(String),

    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "gdal")]
impl From<gdal::errors::GdalError> for Error {
    fn from(e: gdal::errors::GdalError) -> Self {
        Error::Gdal(e.to_string())
    }
}

/// Result type alias for polyclean operations
pub type Result<T> = std::result::Result<T, Error>;
