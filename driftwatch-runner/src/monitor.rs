//! Streaming monitors: sliding windows of live observations checked against
//! a fixed reference every `check_interval` observations.
//!
//! - [`StreamMonitor`] watches one numeric series.
//! - [`FeatureStreamMonitor`] watches multi-feature rows, keeping one window
//!   per reference column and scoring the batch by its mean PSI.
//!
//! Windows are snapshotted before each check, so the PSI calculation never
//! sees a window that is still changing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use driftwatch_core::{InvalidInputError, PsiCalculator, SampleRole, SlidingWindow};

use crate::cache::EdgeCache;
use crate::features::FeatureFrame;
use crate::session::{EvaluationOutcome, EvaluationSession, FeatureOutcome};

/// Window and cadence of a [`StreamMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Maximum observations held; oldest are evicted first.
    pub window_size: usize,
    /// Evaluate on every n-th observation.
    pub check_interval: usize,
    /// Skip checks until the window holds this many observations
    /// (capped at `window_size`).
    pub min_observations: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window_size: 1000,
            check_interval: 100,
            min_observations: 100,
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), InvalidInputError> {
        if self.window_size == 0 || self.check_interval == 0 {
            return Err(InvalidInputError::WindowCapacity);
        }
        Ok(())
    }

    /// Whether the `seen`-th observation triggers a check of a window
    /// currently holding `window_len` observations.
    fn check_due(&self, seen: u64, window_len: usize) -> bool {
        if seen % self.check_interval as u64 != 0 {
            return false;
        }
        let needed = self.min_observations.min(self.window_size);
        if window_len < needed {
            debug!(
                event = "monitor.check_skipped",
                window = window_len,
                needed = needed,
            );
            return false;
        }
        true
    }
}

/// Give `session` an edge cache if it has none, so reference edges are
/// derived once for a monitor's lifetime.
fn with_cache(session: EvaluationSession) -> EvaluationSession {
    match session.edge_cache() {
        Some(_) => session,
        None => session.with_edge_cache(Arc::new(EdgeCache::new())),
    }
}

pub struct StreamMonitor {
    session: EvaluationSession,
    reference: Vec<f64>,
    window: SlidingWindow,
    config: MonitorConfig,
    seen: u64,
}

impl StreamMonitor {
    /// Validates the reference and derives its edges up front.
    ///
    /// A session without an edge cache is given one so edges are computed
    /// only once for the monitor's lifetime.
    pub fn new(
        session: EvaluationSession,
        reference: Vec<f64>,
        config: MonitorConfig,
    ) -> Result<Self, InvalidInputError> {
        config.validate()?;
        let session = with_cache(session);
        if let Some(cache) = session.edge_cache() {
            cache.get_or_compute(&reference, &PsiCalculator::from_config(session.config()))?;
        }

        Ok(Self {
            session,
            reference,
            window: SlidingWindow::new(config.window_size)?,
            config,
            seen: 0,
        })
    }

    /// Add one observation; returns an outcome when this observation
    /// triggered a check.
    pub fn push(&mut self, value: f64) -> Result<Option<EvaluationOutcome>, InvalidInputError> {
        if !value.is_finite() {
            return Err(InvalidInputError::NonFiniteObservation {
                role: SampleRole::Current,
                index: self.seen as usize,
            });
        }

        self.window.push(value);
        self.seen += 1;

        if !self.config.check_due(self.seen, self.window.len()) {
            return Ok(None);
        }

        let snapshot = self.window.snapshot();
        self.session.evaluate(&self.reference, &snapshot).map(Some)
    }

    /// Observations pushed so far, including evicted ones.
    pub fn observations_seen(&self) -> u64 {
        self.seen
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn session(&self) -> &EvaluationSession {
        &self.session
    }
}

/// Multi-feature rows checked against a reference frame.
///
/// Rows carry one value per reference column, in the reference frame's
/// column order.
pub struct FeatureStreamMonitor {
    session: EvaluationSession,
    reference: FeatureFrame,
    windows: Vec<(String, SlidingWindow)>,
    config: MonitorConfig,
    seen: u64,
}

impl FeatureStreamMonitor {
    /// Validates every reference column and derives its edges up front.
    pub fn new(
        session: EvaluationSession,
        reference: FeatureFrame,
        config: MonitorConfig,
    ) -> Result<Self, InvalidInputError> {
        config.validate()?;
        if reference.is_empty() {
            return Err(InvalidInputError::EmptySample(SampleRole::Reference));
        }
        let session = with_cache(session);
        if let Some(cache) = session.edge_cache() {
            let calculator = PsiCalculator::from_config(session.config());
            for (_, values) in reference.iter() {
                cache.get_or_compute(values, &calculator)?;
            }
        }

        let windows = reference
            .names()
            .map(|name| SlidingWindow::new(config.window_size).map(|w| (name.to_string(), w)))
            .collect::<Result<Vec<_>, InvalidInputError>>()?;

        Ok(Self {
            session,
            reference,
            windows,
            config,
            seen: 0,
        })
    }

    /// Column names a row must supply, in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.windows.iter().map(|(name, _)| name.as_str())
    }

    /// Add one row; returns an outcome when this row triggered a check.
    ///
    /// A row of the wrong width or with a non-finite value is rejected whole
    /// and does not count as an observation.
    pub fn push_row(&mut self, row: &[f64]) -> Result<Option<FeatureOutcome>, InvalidInputError> {
        if row.len() != self.windows.len() {
            return Err(InvalidInputError::RowWidth {
                expected: self.windows.len(),
                got: row.len(),
            });
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(InvalidInputError::NonFiniteObservation {
                role: SampleRole::Current,
                index: self.seen as usize,
            });
        }

        for ((_, window), &value) in self.windows.iter_mut().zip(row) {
            window.push(value);
        }
        self.seen += 1;

        if !self.config.check_due(self.seen, self.window_len()) {
            return Ok(None);
        }

        let snapshot = self
            .windows
            .iter()
            .fold(FeatureFrame::new(), |frame, (name, window)| {
                frame.with_column(name.as_str(), window.snapshot())
            });
        self.session
            .evaluate_features(&self.reference, &snapshot)
            .map(Some)
    }

    /// Rows pushed so far, including evicted ones.
    pub fn observations_seen(&self) -> u64 {
        self.seen
    }

    /// Rows currently held; every column window holds the same number.
    pub fn window_len(&self) -> usize {
        self.windows.first().map_or(0, |(_, w)| w.len())
    }

    pub fn session(&self) -> &EvaluationSession {
        &self.session
    }
}
