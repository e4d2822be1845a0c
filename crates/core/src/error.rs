//! Error types for landchange core

use thiserror::Error;

/// Main error type for raster, band-stack and I/O operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Band count mismatch: expected {expected}, got {actual}")]
    BandCountMismatch { expected: usize, actual: usize },

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Geotransform mismatch: {0:?} vs {1:?}")]
    TransformMismatch([f64; 6], [f64; 6]),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error describes misaligned before/after inputs
    /// (size, band count, CRS or geotransform disagreement).
    pub fn is_alignment(&self) -> bool {
        matches!(
            self,
            Error::SizeMismatch { .. }
                | Error::BandCountMismatch { .. }
                | Error::CrsMismatch(..)
                | Error::TransformMismatch(..)
        )
    }
}

/// Result type alias for landchange core operations
pub type Result<T> = std::result::Result<T, Error>;
