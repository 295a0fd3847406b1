//! driftwatch core: the numerical drift-detection engine.
//!
//! This crate is pure computation with no I/O:
//! - Sample validation (non-empty, finite)
//! - Binning strategy: quantile or equal-width bucket edges from a reference
//! - PSI calculator with epsilon-stabilised empty buckets
//! - Drift classifier: PSI score to `No Drift` / `Possible Drift` / `Likely Drift`
//! - Evaluation records, configuration, sliding windows, reference fingerprints
//!
//! Every function is safe to call concurrently; nothing here holds shared state.

pub mod binning;
pub mod classify;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod psi;
pub mod record;
pub mod sample;
pub mod synthetic;
pub mod window;

pub use binning::{compute_edges, BinningMode, BucketEdges, DegradedBinning};
pub use classify::{classify, DriftThresholds, DriftTier};
pub use config::EvaluationConfig;
pub use error::{ConfigError, InvalidInputError};
pub use fingerprint::ReferenceFingerprint;
pub use psi::{
    calculate_psi, psi_from_proportions, BucketContribution, BucketDistribution, PsiBreakdown,
    PsiCalculator, DEFAULT_BUCKET_COUNT, DEFAULT_EPSILON,
};
pub use record::{round_psi, EvaluationRecord};
pub use sample::{validate_sample, SampleRole};
pub use window::SlidingWindow;
