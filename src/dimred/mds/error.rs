use thiserror::Error;

/// Configuration and input errors raised before any iteration runs.
///
/// Numerical trouble inside the optimization loop is never reported through this type;
/// degenerate moves are dropped and non-convergence is reported via
/// [`Termination`](super::Termination).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MdsError {
    #[error("input contains no points")]
    EmptyInput,

    #[error("point {row} has a non-finite coordinate in column {col}")]
    NonFinite { row: usize, col: usize },

    #[error("target dimension {target} must be between 1 and the original dimension {original}")]
    InvalidTargetDim { target: usize, original: usize },

    #[error("points per turn must satisfy 0 < min <= max <= 1, got min {min} and max {max}")]
    InvalidPointRatio { min: f64, max: f64 },

    #[error("{name} must be {expected}, got {value}")]
    InvalidParameter {
        name: &'static str,
        expected: &'static str,
        value: f64,
    },

    #[error("radius must be strictly positive and finite, got {0}")]
    InvalidRadius(f64),

    #[error("initial embedding has shape {got:?}, expected {expected:?}")]
    InitShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
}
