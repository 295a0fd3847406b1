//! Seeded synthetic samples for demos and reproducible tests.
//!
//! Normal variates come from the Box-Muller transform over a seeded `StdRng`,
//! so the same seed always yields the same sample.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seeded RNG used for every synthetic sample.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// `n` draws from Normal(`mean`, `std_dev`).
pub fn normal_sample<R: Rng + ?Sized>(rng: &mut R, n: usize, mean: f64, std_dev: f64) -> Vec<f64> {
    (0..n)
        .map(|_| {
            // u1 in (0, 1] keeps ln() finite
            let u1: f64 = 1.0 - rng.gen::<f64>();
            let u2: f64 = rng.gen();
            let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
            mean + std_dev * z
        })
        .collect()
}

/// A reference/current pair drawn from two normals with a shared spread.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedPair {
    pub reference: Vec<f64>,
    pub current: Vec<f64>,
}

/// Draw `n` reference and `n` current observations from one seeded stream.
pub fn simulate_pair(
    seed: u64,
    n: usize,
    reference_mean: f64,
    current_mean: f64,
    std_dev: f64,
) -> SimulatedPair {
    let mut rng = seeded_rng(seed);
    let reference = normal_sample(&mut rng, n, reference_mean, std_dev);
    let current = normal_sample(&mut rng, n, current_mean, std_dev);
    SimulatedPair { reference, current }
}

/// Drift written into the current half of a simulated feature set.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriftInjection {
    /// Added to every current observation of the first feature.
    pub shift_first: f64,
    /// Redraws the second feature from Normal(mean, std_dev).
    pub replace_second: Option<(f64, f64)>,
}

impl DriftInjection {
    /// No injected drift: current rows come from the reference distributions.
    pub fn none() -> Self {
        Self::default()
    }

    /// `feature1` shifted by +50 and `feature2` replaced by Normal(1000, 10).
    pub fn strong() -> Self {
        Self {
            shift_first: 50.0,
            replace_second: Some((1000.0, 10.0)),
        }
    }

    pub fn is_none(&self) -> bool {
        self.shift_first == 0.0 && self.replace_second.is_none()
    }
}

/// Column-major reference and current samples for `feature1..=featureN`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedFeatures {
    pub names: Vec<String>,
    pub reference: Vec<Vec<f64>>,
    pub current: Vec<Vec<f64>>,
}

impl SimulatedFeatures {
    /// Observations per column.
    pub fn rows(&self) -> usize {
        self.reference.first().map_or(0, Vec::len)
    }
}

/// `features` columns of `n` rows each, reference then current, from one
/// seeded stream.
///
/// Feature `k` (1-based) is Normal(k - 1, 1 + (k - 1) / 4) in both halves
/// before `drift` is applied to the current half.
pub fn simulate_features(
    seed: u64,
    n: usize,
    features: usize,
    drift: DriftInjection,
) -> SimulatedFeatures {
    let mut rng = seeded_rng(seed);
    let params: Vec<(f64, f64)> = (0..features)
        .map(|k| (k as f64, 1.0 + k as f64 / 4.0))
        .collect();

    let reference = params
        .iter()
        .map(|&(mean, sd)| normal_sample(&mut rng, n, mean, sd))
        .collect();
    let mut current: Vec<Vec<f64>> = params
        .iter()
        .map(|&(mean, sd)| normal_sample(&mut rng, n, mean, sd))
        .collect();

    if let Some(first) = current.get_mut(0) {
        first.iter_mut().for_each(|v| *v += drift.shift_first);
    }
    if let (Some(second), Some((mean, sd))) = (current.get_mut(1), drift.replace_second) {
        *second = normal_sample(&mut rng, n, mean, sd);
    }

    SimulatedFeatures {
        names: (1..=features).map(|k| format!("feature{k}")).collect(),
        reference,
        current,
    }
}
