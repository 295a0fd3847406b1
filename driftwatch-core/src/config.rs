//! Evaluation configuration.
//!
//! ```toml
//! bucket_count = 10
//! binning = "quantile"
//! epsilon = 1e-6
//!
//! [thresholds]
//! possible = 0.10
//! likely = 0.25
//! ```
//!
//! Every field is optional; omitted fields take the defaults above.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::binning::BinningMode;
use crate::classify::DriftThresholds;
use crate::error::{ConfigError, InvalidInputError};
use crate::psi::{check_epsilon, DEFAULT_BUCKET_COUNT, DEFAULT_EPSILON};

/// Parameters of one drift evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub bucket_count: usize,
    pub binning: BinningMode,
    pub epsilon: f64,
    pub thresholds: DriftThresholds,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            bucket_count: DEFAULT_BUCKET_COUNT,
            binning: BinningMode::Quantile,
            epsilon: DEFAULT_EPSILON,
            thresholds: DriftThresholds::default(),
        }
    }
}

impl EvaluationConfig {
    /// Load from a TOML file and validate.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML string and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), InvalidInputError> {
        if self.bucket_count < 1 {
            return Err(InvalidInputError::BucketCount(self.bucket_count));
        }
        check_epsilon(self.epsilon)?;
        self.thresholds.validate()
    }
}
