//! In-memory cache of bucket edges keyed by reference fingerprint.
//!
//! Edges for a stable reference are derived once and shared. The key covers
//! the reference values, bucket count, and binning mode, so a changed
//! reference or configuration never hits a stale entry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;

use driftwatch_core::{BucketEdges, InvalidInputError, PsiCalculator, ReferenceFingerprint};

#[derive(Debug, Default)]
pub struct EdgeCache {
    entries: RwLock<HashMap<ReferenceFingerprint, Arc<BucketEdges>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl EdgeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached edges for `reference`, computing and storing them on a miss.
    pub fn get_or_compute(
        &self,
        reference: &[f64],
        calculator: &PsiCalculator,
    ) -> Result<Arc<BucketEdges>, InvalidInputError> {
        let key = ReferenceFingerprint::of(reference, calculator.bucket_count(), calculator.mode());

        if let Some(edges) = self.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(event = "edge_cache.hit", fingerprint = %key.short());
            return Ok(edges);
        }

        let edges = Arc::new(calculator.edges(reference)?);
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(
            event = "edge_cache.miss",
            fingerprint = %key.short(),
            buckets = edges.bucket_count(),
        );

        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries.entry(key).or_insert(edges).clone())
    }

    pub fn get(&self, key: &ReferenceFingerprint) -> Option<Arc<BucketEdges>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(hits, misses)` since construction.
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}
