use crate::grid::Pixel;
use thiserror::Error;

/// Reasons a pair of seed sets is rejected by `segment`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeedError {
    #[error("no object seeds given")]
    EmptyObject,

    #[error("no background seeds given")]
    EmptyBackground,

    #[error("pixel {0} is seeded as both object and background")]
    Overlap(Pixel),

    #[error("seed {pixel} lies outside the {width}x{height} grid")]
    OutOfBounds {
        pixel: Pixel,
        width: usize,
        height: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SegmentationError {
    /// Seeds are empty, overlapping or out of bounds. The previous labeling stays valid.
    #[error("invalid seed set: {0}")]
    InvalidSeedSet(#[from] SeedError),

    #[error("invalid configuration: {parameter} must be finite and > 0, got {value}")]
    InvalidConfig { parameter: &'static str, value: f64 },

    #[error("grid size mismatch: expected {expected} intensities, got {actual}")]
    GridSize { expected: usize, actual: usize },

    #[error("grid must have at least one pixel")]
    EmptyGrid,

    /// Internal consistency fault in the flow graph; never caused by user input.
    #[error("min-cut solver failure: {0}")]
    SolverFailure(&'static str),
}

pub type Result<T> = std::result::Result<T, SegmentationError>;
