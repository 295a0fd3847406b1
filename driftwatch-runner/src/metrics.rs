//! In-memory drift metrics.
//!
//! Counters are bumped on every observed evaluation. Call
//! [`InMemoryMetrics::flush`] to emit the current values as a single
//! `tracing::info!` event. The caller constructs and owns the sink; there is
//! no process-wide registry.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use driftwatch_core::{DriftTier, EvaluationRecord};

use crate::sinks::{MetricsSink, SinkError};

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub evaluations: u64,
    pub no_drift: u64,
    pub possible_drift: u64,
    pub likely_drift: u64,
    /// Evaluations classified as drift, whether or not an alert was delivered.
    pub drift_events: u64,
    /// Score of the most recent evaluation.
    pub last_psi: Option<f64>,
}

impl MetricsSnapshot {
    pub fn tier_count(&self, tier: DriftTier) -> u64 {
        match tier {
            DriftTier::NoDrift => self.no_drift,
            DriftTier::PossibleDrift => self.possible_drift,
            DriftTier::LikelyDrift => self.likely_drift,
        }
    }
}

/// Atomic counters plus a last-PSI gauge.
#[derive(Debug)]
pub struct InMemoryMetrics {
    evaluations: AtomicU64,
    tiers: [AtomicU64; 3],
    drift_events: AtomicU64,
    last_psi_bits: AtomicU64,
}

impl Default for InMemoryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn tier_slot(tier: DriftTier) -> usize {
    match tier {
        DriftTier::NoDrift => 0,
        DriftTier::PossibleDrift => 1,
        DriftTier::LikelyDrift => 2,
    }
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self {
            evaluations: AtomicU64::new(0),
            tiers: [AtomicU64::new(0), AtomicU64::new(0), AtomicU64::new(0)],
            drift_events: AtomicU64::new(0),
            last_psi_bits: AtomicU64::new(f64::NAN.to_bits()),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let last = f64::from_bits(self.last_psi_bits.load(Ordering::Relaxed));
        MetricsSnapshot {
            evaluations: self.evaluations.load(Ordering::Relaxed),
            no_drift: self.tiers[0].load(Ordering::Relaxed),
            possible_drift: self.tiers[1].load(Ordering::Relaxed),
            likely_drift: self.tiers[2].load(Ordering::Relaxed),
            drift_events: self.drift_events.load(Ordering::Relaxed),
            last_psi: (!last.is_nan()).then_some(last),
        }
    }

    /// Emit all current values as one `info!` event.
    ///
    /// Call at natural boundaries (end of a batch, monitor tick) rather than
    /// after every evaluation.
    pub fn flush(&self) {
        let snap = self.snapshot();
        tracing::info!(
            metric = "flush",
            evaluations = snap.evaluations,
            no_drift = snap.no_drift,
            possible_drift = snap.possible_drift,
            likely_drift = snap.likely_drift,
            drift_events = snap.drift_events,
            last_psi = snap.last_psi.unwrap_or(f64::NAN),
        );
    }
}

impl MetricsSink for InMemoryMetrics {
    fn observe(&self, record: &EvaluationRecord) -> Result<(), SinkError> {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        self.tiers[tier_slot(record.drift_tier)].fetch_add(1, Ordering::Relaxed);
        if record.drift_tier.is_drift() {
            self.drift_events.fetch_add(1, Ordering::Relaxed);
        }
        self.last_psi_bits
            .store(record.psi_score.to_bits(), Ordering::Relaxed);
        tracing::trace!(metric = "psi_score", value = record.psi_score, "gauge set");
        Ok(())
    }
}
