//! Error types shared by selection, compression and raster I/O.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type RefineResult<T> = Result<T, RefineError>;

/// Errors raised while deriving a refinement region.
///
/// A capped flood fill is not an error; see
/// [`FloodOutcome::IterationLimitReached`](crate::selection::FloodOutcome).
#[derive(Error, Debug)]
pub enum RefineError {
    /// Elevation band with `low > high` or a NaN endpoint.
    #[error("invalid elevation bounds: low {low} > high {high}")]
    InvalidBounds { low: f64, high: f64 },

    /// A mask whose shape differs from the grid (or mask) it is combined with.
    #[error("dimension mismatch: expected {expected:?} (rows, cols), found {found:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Grid geometry that violates the raster invariants.
    #[error("invalid grid geometry: {0}")]
    InvalidGeometry(String),

    /// Malformed raster file.
    #[error("{}:{line}: {message}", .path.display())]
    GridFormat {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Source file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Destination could not be written or published.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Pipeline configuration that cannot be parsed or used.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RefineError {
    pub(crate) fn mismatch(expected: (usize, usize), found: (usize, usize)) -> Self {
        Self::DimensionMismatch { expected, found }
    }
}
