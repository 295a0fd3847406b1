//! Drift classification: maps a PSI score onto a severity tier.
//!
//! | PSI | Tier |
//! | --- | --- |
//! | `< 0.10` | No Drift |
//! | `0.10 ..< 0.25` | Possible Drift |
//! | `>= 0.25` | Likely Drift |
//!
//! Each higher tier is closed on its lower bound.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InvalidInputError;

/// Severity tier derived from a PSI score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DriftTier {
    #[serde(rename = "No Drift")]
    NoDrift,
    #[serde(rename = "Possible Drift")]
    PossibleDrift,
    #[serde(rename = "Likely Drift")]
    LikelyDrift,
}

impl DriftTier {
    pub const ALL: [DriftTier; 3] = [
        DriftTier::NoDrift,
        DriftTier::PossibleDrift,
        DriftTier::LikelyDrift,
    ];

    /// Display label, as written to the drift log.
    pub fn label(&self) -> &'static str {
        match self {
            DriftTier::NoDrift => "No Drift",
            DriftTier::PossibleDrift => "Possible Drift",
            DriftTier::LikelyDrift => "Likely Drift",
        }
    }

    /// Whether this tier should raise an alert.
    pub fn is_drift(&self) -> bool {
        !matches!(self, DriftTier::NoDrift)
    }
}

impl fmt::Display for DriftTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DriftTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "nodrift" => Ok(DriftTier::NoDrift),
            "possibledrift" => Ok(DriftTier::PossibleDrift),
            "likelydrift" => Ok(DriftTier::LikelyDrift),
            _ => Err(format!("unknown drift status '{s}'")),
        }
    }
}

/// Lower bounds of the `PossibleDrift` and `LikelyDrift` tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftThresholds {
    pub possible: f64,
    pub likely: f64,
}

impl Default for DriftThresholds {
    fn default() -> Self {
        Self {
            possible: 0.10,
            likely: 0.25,
        }
    }
}

impl DriftThresholds {
    pub fn validate(&self) -> Result<(), InvalidInputError> {
        let ordered = self.possible.is_finite()
            && self.likely.is_finite()
            && self.possible >= 0.0
            && self.possible < self.likely;
        if ordered {
            Ok(())
        } else {
            Err(InvalidInputError::Thresholds {
                possible: self.possible,
                likely: self.likely,
            })
        }
    }

    /// Classify a PSI score. NaN and infinities are rejected.
    pub fn classify(&self, psi: f64) -> Result<DriftTier, InvalidInputError> {
        if !psi.is_finite() {
            return Err(InvalidInputError::NonFiniteScore(psi));
        }
        self.validate()?;
        Ok(if psi < self.possible {
            DriftTier::NoDrift
        } else if psi < self.likely {
            DriftTier::PossibleDrift
        } else {
            DriftTier::LikelyDrift
        })
    }
}

/// Classify with the standard 0.10 / 0.25 thresholds.
pub fn classify(psi: f64) -> Result<DriftTier, InvalidInputError> {
    DriftThresholds::default().classify(psi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_boundaries() {
        assert_eq!(classify(0.0).unwrap(), DriftTier::NoDrift);
        assert_eq!(classify(0.0999999).unwrap(), DriftTier::NoDrift);
        assert_eq!(classify(0.10).unwrap(), DriftTier::PossibleDrift);
        assert_eq!(classify(0.2499999).unwrap(), DriftTier::PossibleDrift);
        assert_eq!(classify(0.25).unwrap(), DriftTier::LikelyDrift);
        assert_eq!(classify(7.3).unwrap(), DriftTier::LikelyDrift);
    }

    #[test]
    fn legacy_threshold_examples() {
        assert_eq!(classify(0.05).unwrap(), DriftTier::NoDrift);
        assert_eq!(classify(0.15).unwrap(), DriftTier::PossibleDrift);
        assert_eq!(classify(0.3).unwrap(), DriftTier::LikelyDrift);
    }

    #[test]
    fn non_finite_scores_rejected() {
        assert!(matches!(
            classify(f64::NAN),
            Err(InvalidInputError::NonFiniteScore(_))
        ));
        assert_eq!(
            classify(f64::INFINITY),
            Err(InvalidInputError::NonFiniteScore(f64::INFINITY))
        );
    }

    #[test]
    fn custom_thresholds() {
        let t = DriftThresholds {
            possible: 0.2,
            likely: 0.5,
        };
        assert_eq!(t.classify(0.15).unwrap(), DriftTier::NoDrift);
        assert_eq!(t.classify(0.2).unwrap(), DriftTier::PossibleDrift);
        assert_eq!(t.classify(0.5).unwrap(), DriftTier::LikelyDrift);
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let t = DriftThresholds {
            possible: 0.3,
            likely: 0.1,
        };
        assert!(t.validate().is_err());
        assert!(t.classify(0.2).is_err());
    }

    #[test]
    fn labels_round_trip_through_from_str() {
        for tier in DriftTier::ALL {
            assert_eq!(tier.label().parse::<DriftTier>().unwrap(), tier);
        }
        assert_eq!(
            "likely_drift".parse::<DriftTier>().unwrap(),
            DriftTier::LikelyDrift
        );
        assert!("drifty".parse::<DriftTier>().is_err());
    }

    #[test]
    fn serde_uses_display_labels() {
        let json = serde_json::to_string(&DriftTier::PossibleDrift).unwrap();
        assert_eq!(json, "\"Possible Drift\"");
    }

    #[test]
    fn only_no_drift_is_quiet() {
        assert!(!DriftTier::NoDrift.is_drift());
        assert!(DriftTier::PossibleDrift.is_drift());
        assert!(DriftTier::LikelyDrift.is_drift());
    }
}
