//! Population Stability Index.
//!
//! ```text
//! PSI = Σ_i (ref_pct[i] - cur_pct[i]) * ln(ref_pct[i] / cur_pct[i])
//! ```
//!
//! Edges always come from the reference sample, so the statistic is
//! asymmetric: `psi(a, b)` and `psi(b, a)` generally differ. Zero proportions
//! are replaced with a single epsilon (default `1e-6`) before the logarithm.

use serde::{Deserialize, Serialize};

use crate::binning::{compute_edges, BinningMode, BucketEdges, DegradedBinning};
use crate::config::EvaluationConfig;
use crate::error::InvalidInputError;
use crate::sample::{validate_sample, SampleRole};

/// Smoothing value substituted for empty buckets.
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// Bucket count used when the caller does not pick one.
pub const DEFAULT_BUCKET_COUNT: usize = 10;

/// Share of a sample's observations falling in each bucket.
///
/// Sums to 1.0 (within rounding) for a non-empty sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketDistribution {
    proportions: Vec<f64>,
}

impl BucketDistribution {
    /// Bucket `values` with `edges` and normalise by the sample size.
    pub fn from_sample(edges: &BucketEdges, values: &[f64]) -> Self {
        let total = values.len() as f64;
        let proportions = edges
            .counts(values)
            .into_iter()
            .map(|count| if total > 0.0 { count as f64 / total } else { 0.0 })
            .collect();
        Self { proportions }
    }

    pub fn proportions(&self) -> &[f64] {
        &self.proportions
    }

    pub fn total(&self) -> f64 {
        self.proportions.iter().sum()
    }

    /// Proportions with every zero replaced by `epsilon`.
    pub fn stabilized(&self, epsilon: f64) -> Vec<f64> {
        self.proportions
            .iter()
            .map(|&p| if p == 0.0 { epsilon } else { p })
            .collect()
    }
}

/// One bucket's share of the PSI total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketContribution {
    pub index: usize,
    pub lower: f64,
    pub upper: f64,
    /// Reference proportion after epsilon substitution.
    pub reference_pct: f64,
    /// Current proportion after epsilon substitution.
    pub current_pct: f64,
    pub contribution: f64,
}

/// PSI score with the per-bucket table that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PsiBreakdown {
    pub score: f64,
    pub edges: BucketEdges,
    pub buckets: Vec<BucketContribution>,
}

impl PsiBreakdown {
    pub fn degradation(&self) -> Option<DegradedBinning> {
        self.edges.degradation()
    }
}

/// PSI calculator with a fixed bucket count, binning mode, and epsilon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PsiCalculator {
    bucket_count: usize,
    mode: BinningMode,
    epsilon: f64,
}

impl Default for PsiCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKET_COUNT)
    }
}

impl PsiCalculator {
    /// Quantile binning with the default epsilon.
    pub fn new(bucket_count: usize) -> Self {
        Self {
            bucket_count,
            mode: BinningMode::Quantile,
            epsilon: DEFAULT_EPSILON,
        }
    }

    pub fn from_config(config: &EvaluationConfig) -> Self {
        Self {
            bucket_count: config.bucket_count,
            mode: config.binning,
            epsilon: config.epsilon,
        }
    }

    pub fn with_mode(mut self, mode: BinningMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    pub fn mode(&self) -> BinningMode {
        self.mode
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Derive edges from `reference` with this calculator's settings.
    pub fn edges(&self, reference: &[f64]) -> Result<BucketEdges, InvalidInputError> {
        compute_edges(reference, self.bucket_count, self.mode)
    }

    /// PSI of `current` against `reference`.
    pub fn calculate(&self, reference: &[f64], current: &[f64]) -> Result<f64, InvalidInputError> {
        self.breakdown(reference, current).map(|b| b.score)
    }

    /// PSI plus the per-bucket table.
    pub fn breakdown(
        &self,
        reference: &[f64],
        current: &[f64],
    ) -> Result<PsiBreakdown, InvalidInputError> {
        validate_sample(reference, SampleRole::Reference)?;
        validate_sample(current, SampleRole::Current)?;
        check_epsilon(self.epsilon)?;
        let edges = self.edges(reference)?;
        Ok(self.aggregate(edges, reference, current))
    }

    /// PSI against edges computed earlier (e.g. cached for a stable reference).
    pub fn calculate_with_edges(
        &self,
        edges: &BucketEdges,
        reference: &[f64],
        current: &[f64],
    ) -> Result<f64, InvalidInputError> {
        self.breakdown_with_edges(edges, reference, current)
            .map(|b| b.score)
    }

    pub fn breakdown_with_edges(
        &self,
        edges: &BucketEdges,
        reference: &[f64],
        current: &[f64],
    ) -> Result<PsiBreakdown, InvalidInputError> {
        validate_sample(reference, SampleRole::Reference)?;
        validate_sample(current, SampleRole::Current)?;
        check_epsilon(self.epsilon)?;
        Ok(self.aggregate(edges.clone(), reference, current))
    }

    fn aggregate(&self, edges: BucketEdges, reference: &[f64], current: &[f64]) -> PsiBreakdown {
        let ref_pct = BucketDistribution::from_sample(&edges, reference).stabilized(self.epsilon);
        let cur_pct = BucketDistribution::from_sample(&edges, current).stabilized(self.epsilon);

        let buckets: Vec<BucketContribution> = ref_pct
            .iter()
            .zip(&cur_pct)
            .enumerate()
            .map(|(index, (&r, &c))| {
                let (lower, upper) = edges.bounds(index).unwrap_or((f64::NAN, f64::NAN));
                BucketContribution {
                    index,
                    lower,
                    upper,
                    reference_pct: r,
                    current_pct: c,
                    contribution: psi_term(r, c),
                }
            })
            .collect();

        let score = psi_from_proportions(&ref_pct, &cur_pct, self.epsilon);
        PsiBreakdown {
            score,
            edges,
            buckets,
        }
    }
}

/// PSI of `current` against `reference` using quantile buckets and the
/// default epsilon.
pub fn calculate_psi(
    reference: &[f64],
    current: &[f64],
    bucket_count: usize,
) -> Result<f64, InvalidInputError> {
    PsiCalculator::new(bucket_count).calculate(reference, current)
}

/// PSI over two already-bucketed proportion vectors.
///
/// Zeros are replaced with `epsilon`; vectors are paired up to the shorter length.
pub fn psi_from_proportions(reference_pct: &[f64], current_pct: &[f64], epsilon: f64) -> f64 {
    let stabilize = |p: f64| if p == 0.0 { epsilon } else { p };
    let total = reference_pct
        .iter()
        .zip(current_pct)
        .map(|(&r, &c)| psi_term(stabilize(r), stabilize(c)))
        .sum();
    clamp_non_negative(total)
}

fn psi_term(reference_pct: f64, current_pct: f64) -> f64 {
    (reference_pct - current_pct) * (reference_pct / current_pct).ln()
}

// Every term is non-negative in exact arithmetic.
fn clamp_non_negative(score: f64) -> f64 {
    if score < 0.0 {
        0.0
    } else {
        score
    }
}

pub(crate) fn check_epsilon(epsilon: f64) -> Result<(), InvalidInputError> {
    if epsilon.is_finite() && epsilon > 0.0 && epsilon < 1.0 {
        Ok(())
    } else {
        Err(InvalidInputError::Epsilon(epsilon))
    }
}
