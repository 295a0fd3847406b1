//! Evaluation records: the immutable output of one drift evaluation.

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::{DriftThresholds, DriftTier};
use crate::error::InvalidInputError;

/// Decimal places kept for persisted PSI scores.
pub const PSI_DECIMALS: i32 = 4;

/// Round a PSI score to [`PSI_DECIMALS`] places.
pub fn round_psi(psi: f64) -> f64 {
    let scale = 10f64.powi(PSI_DECIMALS);
    (psi * scale).round() / scale
}

/// `{timestamp, psi_score, drift_tier}` for one evaluation.
///
/// The timestamp is truncated to whole seconds and the score rounded to four
/// decimals at construction, so a record survives the drift log unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub timestamp: DateTime<Utc>,
    pub psi_score: f64,
    pub drift_tier: DriftTier,
}

impl EvaluationRecord {
    pub fn new(timestamp: DateTime<Utc>, psi_score: f64, drift_tier: DriftTier) -> Self {
        Self {
            timestamp: timestamp.with_nanosecond(0).unwrap_or(timestamp),
            psi_score: round_psi(psi_score),
            drift_tier,
        }
    }

    /// Classify the unrounded score, then build the record.
    pub fn from_score(
        timestamp: DateTime<Utc>,
        psi: f64,
        thresholds: &DriftThresholds,
    ) -> Result<Self, InvalidInputError> {
        let tier = thresholds.classify(psi)?;
        Ok(Self::new(timestamp, psi, tier))
    }

    /// ISO-8601 timestamp, e.g. `2024-05-01T12:30:00Z`.
    pub fn timestamp_iso(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Score formatted with exactly four decimals.
    pub fn psi_display(&self) -> String {
        format!("{:.4}", self.psi_score)
    }
}
