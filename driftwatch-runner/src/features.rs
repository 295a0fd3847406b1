//! Multi-feature evaluation.
//!
//! Scores every column present in both frames, in parallel, and summarises
//! the batch by the arithmetic mean PSI. Columns present in only one frame
//! are skipped and reported.

use rayon::prelude::*;
use serde::Serialize;
use tracing::warn;

use driftwatch_core::{
    DegradedBinning, DriftTier, EvaluationConfig, InvalidInputError, PsiCalculator, SampleRole,
};

use crate::cache::EdgeCache;

/// Named numeric columns, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureFrame {
    columns: Vec<(String, Vec<f64>)>,
}

impl FeatureFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column, replacing any existing column with the same name.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        let name = name.into();
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = values,
            None => self.columns.push((name, values)),
        }
    }

    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.insert(name, values);
        self
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// PSI and tier for one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureScore {
    pub name: String,
    pub psi: f64,
    pub tier: DriftTier,
    pub degradation: Option<DegradedBinning>,
}

/// A column found in only one of the two frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingFeature {
    pub column: String,
    pub missing_from: SampleRole,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureReport {
    /// Scored columns, in reference-frame order.
    pub features: Vec<FeatureScore>,
    pub mean_psi: f64,
    /// Tier of the unrounded mean.
    pub tier: DriftTier,
    pub skipped: Vec<MissingFeature>,
}

impl FeatureReport {
    /// Columns whose own tier is not `No Drift`.
    pub fn drifted(&self) -> impl Iterator<Item = &FeatureScore> {
        self.features.iter().filter(|f| f.tier.is_drift())
    }
}

/// Score every column shared by `reference` and `current`.
pub fn evaluate_features(
    reference: &FeatureFrame,
    current: &FeatureFrame,
    config: &EvaluationConfig,
) -> Result<FeatureReport, InvalidInputError> {
    config.validate()?;
    score_features(reference, current, config, None)
}

pub(crate) fn score_features(
    reference: &FeatureFrame,
    current: &FeatureFrame,
    config: &EvaluationConfig,
    cache: Option<&EdgeCache>,
) -> Result<FeatureReport, InvalidInputError> {
    let mut skipped = Vec::new();
    let mut shared: Vec<(&str, &[f64], &[f64])> = Vec::new();

    for (name, ref_values) in reference.iter() {
        match current.column(name) {
            Some(cur_values) => shared.push((name, ref_values, cur_values)),
            None => skipped.push(MissingFeature {
                column: name.to_string(),
                missing_from: SampleRole::Current,
            }),
        }
    }
    for name in current.names() {
        if reference.column(name).is_none() {
            skipped.push(MissingFeature {
                column: name.to_string(),
                missing_from: SampleRole::Reference,
            });
        }
    }

    for missing in &skipped {
        warn!(
            event = "features.skipped",
            column = %missing.column,
            missing_from = %missing.missing_from,
        );
    }

    if shared.is_empty() {
        let role = if reference.is_empty() {
            SampleRole::Reference
        } else {
            SampleRole::Current
        };
        return Err(InvalidInputError::EmptySample(role));
    }

    let calculator = PsiCalculator::from_config(config);
    let features = shared
        .par_iter()
        .map(|&(name, ref_values, cur_values)| -> Result<FeatureScore, InvalidInputError> {
            let breakdown = match cache {
                Some(cache) => {
                    let edges = cache.get_or_compute(ref_values, &calculator)?;
                    calculator.breakdown_with_edges(&edges, ref_values, cur_values)?
                }
                None => calculator.breakdown(ref_values, cur_values)?,
            };
            Ok(FeatureScore {
                name: name.to_string(),
                psi: breakdown.score,
                tier: config.thresholds.classify(breakdown.score)?,
                degradation: breakdown.degradation(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mean_psi = features.iter().map(|f| f.psi).sum::<f64>() / features.len() as f64;
    let tier = config.thresholds.classify(mean_psi)?;

    Ok(FeatureReport {
        features,
        mean_psi,
        tier,
        skipped,
    })
}
