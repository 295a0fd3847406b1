//! Error taxonomy for the drift engine.
//!
//! Everything the engine rejects is an [`InvalidInputError`]: the caller handed
//! it something it cannot compute on. Non-fatal conditions (degraded binning)
//! are diagnostics, not errors, and live next to the code that detects them.

use std::path::PathBuf;

use thiserror::Error;

use crate::sample::SampleRole;

/// Inputs the engine refuses to compute on.
///
/// Always surfaced synchronously; the engine never substitutes a default.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInputError {
    #[error("Input arrays must not be empty ({0} sample has no observations)")]
    EmptySample(SampleRole),

    #[error("{role} sample has a non-finite observation at index {index}")]
    NonFiniteObservation { role: SampleRole, index: usize },

    #[error("bucket count must be at least 1, got {0}")]
    BucketCount(usize),

    #[error("PSI score must be finite to classify, got {0}")]
    NonFiniteScore(f64),

    #[error("epsilon must be finite and within (0, 1), got {0}")]
    Epsilon(f64),

    #[error("drift thresholds must satisfy 0 <= possible < likely, got possible={possible} likely={likely}")]
    Thresholds { possible: f64, likely: f64 },

    #[error("window capacity and check interval must be at least 1")]
    WindowCapacity,

    #[error("row has {got} values, expected one per feature ({expected})")]
    RowWidth { expected: usize, got: usize },
}

/// Errors loading an [`EvaluationConfig`](crate::config::EvaluationConfig) from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(#[from] InvalidInputError),
}
