//! Error types for urbano

use thiserror::Error;

/// Main error type for urbano raster and stack operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// Grids that must share a pixel index space do not.
    #[error("Shape mismatch in {context}: expected ({er}, {ec}), got ({ar}, {ac})")]
    ShapeMismatch {
        context: String,
        er: usize,
        ec: usize,
        ar: usize,
        ac: usize,
    },

    #[error("Georeferencing mismatch in {context}")]
    GeoreferenceMismatch { context: String },

    #[error("Year {year} outside stack range {first}..={last}")]
    YearOutOfRange { year: i32, first: i32, last: i32 },

    #[error("Invalid year range: {first}..={last}")]
    InvalidYearRange { first: i32, last: i32 },

    #[error("Raster stack has no layers")]
    EmptyStack,

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error aborts a whole stage rather than a single unit
    pub fn is_fatal_for_stage(&self) -> bool {
        matches!(
            self,
            Error::ShapeMismatch { .. } | Error::GeoreferenceMismatch { .. }
        )
    }
}

/// Result type alias for urbano operations
pub type Result<T> = std::result::Result<T, Error>;
