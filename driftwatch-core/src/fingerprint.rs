//! Reference fingerprints: content hashes that key cached bucket edges.
//!
//! Two references with the same values (in the same order), bucket count, and
//! binning mode produce the same fingerprint, so their edges are
//! interchangeable.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::binning::BinningMode;

/// BLAKE3 hex digest over a reference sample and its binning parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceFingerprint(pub String);

impl ReferenceFingerprint {
    pub fn of(reference: &[f64], bucket_count: usize, mode: BinningMode) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(mode.as_str().as_bytes());
        hasher.update(&(bucket_count as u64).to_le_bytes());
        hasher.update(&(reference.len() as u64).to_le_bytes());
        for value in reference {
            hasher.update(&value.to_bits().to_le_bytes());
        }
        Self(hasher.finalize().to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for ReferenceFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
