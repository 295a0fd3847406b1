//! Binning strategy: derives reusable bucket edges from a reference sample.
//!
//! Two modes:
//! - **Quantile** (default): `bucket_count + 1` percentile points from the 0th
//!   to the 100th percentile, linearly interpolated between order statistics.
//!   Equal-frequency buckets hold up on skewed data.
//! - **EqualWidth**: `bucket_count` equal-width intervals spanning
//!   `min(reference)..=max(reference)`.
//!
//! Repeated observations can produce duplicate quantile points. Duplicates are
//! collapsed, so the effective bucket count can fall below the requested one;
//! that is reported as a [`DegradedBinning`] diagnostic and a `warn!` event.
//!
//! Assignment follows histogram conventions: bucket `i` is `[e_i, e_{i+1})`
//! except the last, which is closed. Values below the first edge clamp into
//! bucket 0 and values above the last edge clamp into the last bucket.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::InvalidInputError;
use crate::sample::{validate_sample, SampleRole};

/// How bucket edges are laid over the reference sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinningMode {
    /// Equal-frequency buckets from reference percentiles.
    #[default]
    Quantile,
    /// Equal-width buckets between the reference min and max.
    EqualWidth,
}

impl BinningMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinningMode::Quantile => "quantile",
            BinningMode::EqualWidth => "equal_width",
        }
    }
}

impl fmt::Display for BinningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BinningMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quantile" | "equal_frequency" | "equal-frequency" => Ok(BinningMode::Quantile),
            "equal_width" | "equal-width" | "histogram" => Ok(BinningMode::EqualWidth),
            other => Err(format!(
                "unknown binning mode '{other}' (expected 'quantile' or 'equal-width')"
            )),
        }
    }
}

/// Fewer effective buckets than requested, caused by duplicate edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedBinning {
    pub requested: usize,
    pub effective: usize,
}

impl fmt::Display for DegradedBinning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "only {} unique buckets out of {} requested (duplicate edges collapsed)",
            self.effective, self.requested
        )
    }
}

/// Strictly increasing bucket boundaries derived from one reference sample.
///
/// Holds `effective + 1` edges, except for a constant reference where the
/// single distinct value is the only edge and one bucket absorbs everything.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketEdges {
    edges: Vec<f64>,
    requested: usize,
    mode: BinningMode,
}

impl BucketEdges {
    /// The boundary values, strictly increasing.
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Number of buckets these edges actually partition the domain into.
    pub fn bucket_count(&self) -> usize {
        self.edges.len().saturating_sub(1).max(1)
    }

    /// Bucket count the caller asked for.
    pub fn requested(&self) -> usize {
        self.requested
    }

    pub fn mode(&self) -> BinningMode {
        self.mode
    }

    /// `Some` when duplicate edges reduced the bucket count.
    pub fn degradation(&self) -> Option<DegradedBinning> {
        let effective = self.bucket_count();
        (effective < self.requested).then_some(DegradedBinning {
            requested: self.requested,
            effective,
        })
    }

    /// Bucket index for a value, clamping out-of-range values into the
    /// boundary buckets.
    pub fn bucket_index(&self, value: f64) -> usize {
        if self.edges.len() <= 2 {
            return 0;
        }
        let interior = &self.edges[1..self.edges.len() - 1];
        interior.partition_point(|&edge| edge <= value)
    }

    /// `(lower, upper)` boundary values of bucket `index`.
    pub fn bounds(&self, index: usize) -> Option<(f64, f64)> {
        if index >= self.bucket_count() {
            return None;
        }
        match self.edges.as_slice() {
            [only] => Some((*only, *only)),
            edges => Some((edges[index], edges[index + 1])),
        }
    }

    /// Per-bucket observation counts.
    pub fn counts(&self, values: &[f64]) -> Vec<usize> {
        let mut counts = vec![0usize; self.bucket_count()];
        for &value in values {
            counts[self.bucket_index(value)] += 1;
        }
        counts
    }
}

/// Derive bucket edges from `reference`.
///
/// Fails when `reference` is empty or non-finite, or when `bucket_count` is 0.
pub fn compute_edges(
    reference: &[f64],
    bucket_count: usize,
    mode: BinningMode,
) -> Result<BucketEdges, InvalidInputError> {
    validate_sample(reference, SampleRole::Reference)?;
    if bucket_count < 1 {
        return Err(InvalidInputError::BucketCount(bucket_count));
    }

    let points = match mode {
        BinningMode::Quantile => quantile_points(reference, bucket_count),
        BinningMode::EqualWidth => equal_width_points(reference, bucket_count),
    };

    let edges = BucketEdges {
        edges: collapse_duplicates(points),
        requested: bucket_count,
        mode,
    };

    if let Some(degraded) = edges.degradation() {
        warn!(
            event = "binning.degraded",
            requested = degraded.requested,
            effective = degraded.effective,
            mode = %mode,
            "not enough unique breakpoints, reducing bucket count"
        );
    }

    Ok(edges)
}

/// `bucket_count + 1` percentile points with linear interpolation between
/// neighbouring order statistics.
fn quantile_points(values: &[f64], bucket_count: usize) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let last = (sorted.len() - 1) as f64;
    (0..=bucket_count)
        .map(|i| {
            let rank = last * i as f64 / bucket_count as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            lerp(sorted[lo], sorted[hi], frac).min(sorted[hi])
        })
        .collect()
}

fn equal_width_points(values: &[f64], bucket_count: usize) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let n = bucket_count as f64;
    let width = (max - min) / n;

    let mut points: Vec<f64> = (0..bucket_count)
        .map(|i| {
            let point = if width.is_finite() {
                min + width * i as f64
            } else {
                lerp(min, max, i as f64 / n)
            };
            point.min(max)
        })
        .collect();
    points.push(max);
    points
}

/// Point `t` of the way from `lo` to `hi`.
///
/// `hi - lo` overflows when the operands straddle zero near `f64::MAX`; the
/// weighted form stays finite for any finite endpoints.
fn lerp(lo: f64, hi: f64, t: f64) -> f64 {
    let span = hi - lo;
    if span.is_finite() {
        lo + span * t
    } else {
        lo * (1.0 - t) + hi * t
    }
}

/// Keep only values strictly greater than the previously kept one.
fn collapse_duplicates(points: Vec<f64>) -> Vec<f64> {
    let mut edges: Vec<f64> = Vec::with_capacity(points.len());
    for point in points {
        match edges.last() {
            Some(&prev) if point <= prev => {}
            _ => edges.push(point),
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_to(n: usize) -> Vec<f64> {
        (1..=n).map(|i| i as f64).collect()
    }

    #[test]
    fn quantile_edges_span_min_to_max() {
        let edges = compute_edges(&one_to(11), 10, BinningMode::Quantile).unwrap();
        assert_eq!(edges.edges().len(), 11);
        assert_eq!(edges.edges()[0], 1.0);
        assert_eq!(edges.edges()[10], 11.0);
        assert_eq!(edges.bucket_count(), 10);
        assert!(edges.degradation().is_none());
    }

    #[test]
    fn quantile_edges_interpolate() {
        // 0..=3 at quartiles: ranks 0, 0.75, 1.5, 2.25, 3
        let edges = compute_edges(&[0.0, 1.0, 2.0, 3.0], 4, BinningMode::Quantile).unwrap();
        let expected = [0.0, 0.75, 1.5, 2.25, 3.0];
        for (got, want) in edges.edges().iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "got {got}, want {want}");
        }
    }

    #[test]
    fn equal_width_edges_are_evenly_spaced() {
        let edges = compute_edges(&[0.0, 10.0, 3.0], 5, BinningMode::EqualWidth).unwrap();
        assert_eq!(edges.edges(), &[0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
    }

    #[test]
    fn duplicate_quantiles_collapse_and_report_degradation() {
        let mut reference = vec![1.0; 90];
        reference.extend((0..10).map(|i| 2.0 + i as f64));
        let edges = compute_edges(&reference, 10, BinningMode::Quantile).unwrap();

        assert!(edges.bucket_count() < 10);
        let degraded = edges.degradation().expect("should be degraded");
        assert_eq!(degraded.requested, 10);
        assert_eq!(degraded.effective, edges.bucket_count());
        assert!(edges.edges().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn constant_reference_yields_single_bucket() {
        let edges = compute_edges(&[5.0; 20], 10, BinningMode::Quantile).unwrap();
        assert_eq!(edges.edges(), &[5.0]);
        assert_eq!(edges.bucket_count(), 1);
        assert_eq!(edges.bucket_index(-100.0), 0);
        assert_eq!(edges.bucket_index(100.0), 0);
        assert_eq!(edges.bounds(0), Some((5.0, 5.0)));
    }

    #[test]
    fn constant_reference_equal_width() {
        let edges = compute_edges(&[2.0, 2.0], 4, BinningMode::EqualWidth).unwrap();
        assert_eq!(edges.bucket_count(), 1);
        assert_eq!(
            edges.degradation(),
            Some(DegradedBinning {
                requested: 4,
                effective: 1
            })
        );
    }

    #[test]
    fn bucket_index_half_open_with_closed_last_bucket() {
        let edges = compute_edges(&[0.0, 10.0], 5, BinningMode::EqualWidth).unwrap();
        assert_eq!(edges.bucket_index(0.0), 0);
        assert_eq!(edges.bucket_index(1.999), 0);
        assert_eq!(edges.bucket_index(2.0), 1);
        assert_eq!(edges.bucket_index(9.999), 4);
        assert_eq!(edges.bucket_index(10.0), 4);
    }

    #[test]
    fn out_of_range_values_clamp_to_boundary_buckets() {
        let edges = compute_edges(&[0.0, 10.0], 5, BinningMode::EqualWidth).unwrap();
        assert_eq!(edges.bucket_index(-1e9), 0);
        assert_eq!(edges.bucket_index(1e9), 4);
    }

    #[test]
    fn counts_cover_every_observation() {
        let reference = one_to(100);
        let edges = compute_edges(&reference, 10, BinningMode::Quantile).unwrap();
        let counts = edges.counts(&reference);
        assert_eq!(counts.len(), 10);
        assert_eq!(counts.iter().sum::<usize>(), 100);
        assert!(counts.iter().all(|c| (9..=11).contains(c)), "{counts:?}");
    }

    #[test]
    fn rejects_empty_reference() {
        assert_eq!(
            compute_edges(&[], 10, BinningMode::Quantile),
            Err(InvalidInputError::EmptySample(SampleRole::Reference))
        );
    }

    #[test]
    fn rejects_zero_buckets() {
        assert_eq!(
            compute_edges(&[1.0, 2.0], 0, BinningMode::Quantile),
            Err(InvalidInputError::BucketCount(0))
        );
    }

    #[test]
    fn single_bucket_request() {
        let edges = compute_edges(&[3.0, 1.0, 2.0], 1, BinningMode::Quantile).unwrap();
        assert_eq!(edges.edges(), &[1.0, 3.0]);
        assert_eq!(edges.bucket_count(), 1);
        assert!(edges.degradation().is_none());
    }

    #[test]
    fn extreme_finite_range_keeps_every_bucket() {
        for mode in [BinningMode::Quantile, BinningMode::EqualWidth] {
            for reference in [vec![-1e308, 0.0, 1e308], vec![-1e308, 1e308]] {
                let edges = compute_edges(&reference, 4, mode).unwrap();
                assert_eq!(edges.bucket_count(), edges.requested(), "{mode}: {:?}", edges.edges());
                assert!(edges.edges().iter().all(|e| e.is_finite()));
                assert!(edges.edges().windows(2).all(|w| w[0] < w[1]));
                assert_eq!(edges.edges()[0], -1e308);
                assert_eq!(edges.edges()[4], 1e308);
            }
        }
    }

    #[test]
    fn extreme_range_equal_width_is_even() {
        let edges = compute_edges(&[-1e308, 1e308], 4, BinningMode::EqualWidth).unwrap();
        let expected = [-1e308, -5e307, 0.0, 5e307, 1e308];
        for (got, want) in edges.edges().iter().zip(expected) {
            assert!((got - want).abs() <= 1e293, "got {got}, want {want}");
        }
        assert_eq!(edges.bucket_index(-1e308), 0);
        assert_eq!(edges.bucket_index(1e308), 3);
    }

    #[test]
    fn binning_mode_parses_cli_spellings() {
        assert_eq!("quantile".parse::<BinningMode>(), Ok(BinningMode::Quantile));
        assert_eq!("equal-width".parse::<BinningMode>(), Ok(BinningMode::EqualWidth));
        assert_eq!("EQUAL_WIDTH".parse::<BinningMode>(), Ok(BinningMode::EqualWidth));
        assert!("kmeans".parse::<BinningMode>().is_err());
    }
}
