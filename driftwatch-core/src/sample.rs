//! Sample validation.
//!
//! A sample is a plain `&[f64]` of one feature's observations. The engine only
//! requires it to be non-empty and finite; order and duplicates are irrelevant.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InvalidInputError;

/// Which side of a comparison a sample is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleRole {
    /// Baseline distribution; bucket edges are derived from it.
    Reference,
    /// Data being checked for drift.
    Current,
}

impl fmt::Display for SampleRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleRole::Reference => f.write_str("reference"),
            SampleRole::Current => f.write_str("current"),
        }
    }
}

/// Reject empty samples and samples with NaN or infinite observations.
pub fn validate_sample(values: &[f64], role: SampleRole) -> Result<(), InvalidInputError> {
    if values.is_empty() {
        return Err(InvalidInputError::EmptySample(role));
    }
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        return Err(InvalidInputError::NonFiniteObservation { role, index });
    }
    Ok(())
}
