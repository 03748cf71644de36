//! Error types for colocalization runs.

use thiserror::Error;

/// Errors surfaced before the round loop starts.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Input images are empty")]
    EmptyImage,

    #[error("At least one round is required")]
    NoRounds,

    #[error("Growth factor must be finite and >= 1.0, got {0}")]
    InvalidGrowthFactor(f64),

    #[error("Output scale must be finite, got {0}")]
    InvalidOutputScale(f64),

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] serde_yml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
