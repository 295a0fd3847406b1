//! Drift evaluation session.
//!
//! One call to [`EvaluationSession::evaluate`] derives edges from the
//! reference, scores the current sample, classifies the score, and builds an
//! [`EvaluationRecord`]. It then hands the record to the injected
//! collaborators, each exactly once and in this order:
//!
//! 1. log appender: `append(record)`
//! 2. metrics sink: `observe(record)`
//! 3. notifier: `notify(alert)`, only when the tier is not `No Drift`
//!
//! Invalid input aborts before any collaborator is called. Collaborator
//! failures never abort: each is logged with `warn!` and returned to the
//! caller as a [`Diagnostic`] next to the record.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, info_span, warn};

use driftwatch_core::{
    DegradedBinning, EvaluationConfig, EvaluationRecord, InvalidInputError, PsiBreakdown,
    PsiCalculator,
};

use crate::alerts::DriftAlert;
use crate::cache::EdgeCache;
use crate::features::{score_features, FeatureFrame, FeatureReport, MissingFeature};
use crate::sinks::{LogAppender, MetricsSink, Notifier, SinkError};

/// Which collaborator a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collaborator {
    Log,
    Metrics,
    Notifier,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Collaborator::Log => "log",
            Collaborator::Metrics => "metrics",
            Collaborator::Notifier => "notifier",
        })
    }
}

/// Non-fatal condition raised during an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    DegradedBinning {
        feature: Option<String>,
        degraded: DegradedBinning,
    },
    CollaboratorFailure {
        collaborator: Collaborator,
        message: String,
    },
    MissingFeature(MissingFeature),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DegradedBinning {
                feature: Some(name),
                degraded,
            } => write!(f, "degraded binning for '{name}': {degraded}"),
            Diagnostic::DegradedBinning {
                feature: None,
                degraded,
            } => write!(f, "degraded binning: {degraded}"),
            Diagnostic::CollaboratorFailure {
                collaborator,
                message,
            } => write!(f, "{collaborator} failed: {message}"),
            Diagnostic::MissingFeature(missing) => write!(
                f,
                "column '{}' missing from {} frame, skipped",
                missing.column, missing.missing_from
            ),
        }
    }
}

/// A single-sample evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationOutcome {
    pub record: EvaluationRecord,
    pub breakdown: PsiBreakdown,
    pub warnings: Vec<Diagnostic>,
}

/// A multi-feature evaluation; the record carries the mean PSI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureOutcome {
    pub record: EvaluationRecord,
    pub report: FeatureReport,
    pub warnings: Vec<Diagnostic>,
}

/// Evaluation settings plus the collaborators that receive each record.
///
/// Every collaborator is optional; a missing one is simply not called.
pub struct EvaluationSession {
    config: EvaluationConfig,
    calculator: PsiCalculator,
    log: Option<Arc<dyn LogAppender>>,
    metrics: Option<Arc<dyn MetricsSink>>,
    notifier: Option<Arc<dyn Notifier>>,
    edge_cache: Option<Arc<EdgeCache>>,
}

impl EvaluationSession {
    /// Fails when `config` is invalid.
    pub fn new(config: EvaluationConfig) -> Result<Self, InvalidInputError> {
        config.validate()?;
        Ok(Self {
            config,
            calculator: PsiCalculator::from_config(&config),
            log: None,
            metrics: None,
            notifier: None,
            edge_cache: None,
        })
    }

    pub fn with_log(mut self, log: Arc<dyn LogAppender>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Reuse edges for references seen before.
    pub fn with_edge_cache(mut self, cache: Arc<EdgeCache>) -> Self {
        self.edge_cache = Some(cache);
        self
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    pub fn edge_cache(&self) -> Option<&EdgeCache> {
        self.edge_cache.as_deref()
    }

    /// Evaluate `current` against `reference`, stamped with the current time.
    pub fn evaluate(
        &self,
        reference: &[f64],
        current: &[f64],
    ) -> Result<EvaluationOutcome, InvalidInputError> {
        self.evaluate_at(reference, current, Utc::now())
    }

    pub fn evaluate_at(
        &self,
        reference: &[f64],
        current: &[f64],
        timestamp: DateTime<Utc>,
    ) -> Result<EvaluationOutcome, InvalidInputError> {
        let span = info_span!(
            "driftwatch.evaluate",
            reference_len = reference.len(),
            current_len = current.len(),
            bucket_count = self.config.bucket_count,
            binning = %self.config.binning,
        );
        let _enter = span.enter();

        let breakdown = match &self.edge_cache {
            Some(cache) => {
                let edges = cache.get_or_compute(reference, &self.calculator)?;
                self.calculator
                    .breakdown_with_edges(&edges, reference, current)?
            }
            None => self.calculator.breakdown(reference, current)?,
        };
        let record = EvaluationRecord::from_score(timestamp, breakdown.score, &self.config.thresholds)?;

        let mut warnings = Vec::new();
        if let Some(degraded) = breakdown.degradation() {
            warnings.push(Diagnostic::DegradedBinning {
                feature: None,
                degraded,
            });
        }

        info!(
            event = "evaluation.completed",
            psi_score = record.psi_score,
            drift_tier = %record.drift_tier,
            buckets = breakdown.edges.bucket_count(),
        );

        self.dispatch(&record, &mut warnings);
        Ok(EvaluationOutcome {
            record,
            breakdown,
            warnings,
        })
    }

    /// Score every shared column and record the mean PSI.
    pub fn evaluate_features(
        &self,
        reference: &FeatureFrame,
        current: &FeatureFrame,
    ) -> Result<FeatureOutcome, InvalidInputError> {
        self.evaluate_features_at(reference, current, Utc::now())
    }

    pub fn evaluate_features_at(
        &self,
        reference: &FeatureFrame,
        current: &FeatureFrame,
        timestamp: DateTime<Utc>,
    ) -> Result<FeatureOutcome, InvalidInputError> {
        let span = info_span!(
            "driftwatch.evaluate",
            features = reference.len(),
            bucket_count = self.config.bucket_count,
            binning = %self.config.binning,
        );
        let _enter = span.enter();

        let report = score_features(reference, current, &self.config, self.edge_cache())?;
        let record = EvaluationRecord::new(timestamp, report.mean_psi, report.tier);

        let mut warnings: Vec<Diagnostic> = report
            .skipped
            .iter()
            .cloned()
            .map(Diagnostic::MissingFeature)
            .collect();
        for feature in &report.features {
            if let Some(degraded) = feature.degradation {
                warnings.push(Diagnostic::DegradedBinning {
                    feature: Some(feature.name.clone()),
                    degraded,
                });
            }
        }
        info!(
            event = "evaluation.completed",
            psi_score = record.psi_score,
            drift_tier = %record.drift_tier,
            features = report.features.len(),
        );

        self.dispatch(&record, &mut warnings);
        Ok(FeatureOutcome {
            record,
            report,
            warnings,
        })
    }

    fn dispatch(&self, record: &EvaluationRecord, warnings: &mut Vec<Diagnostic>) {
        if let Some(log) = &self.log {
            if let Err(e) = log.append(record) {
                warnings.push(collaborator_failed(Collaborator::Log, &e));
            }
        }
        if let Some(metrics) = &self.metrics {
            if let Err(e) = metrics.observe(record) {
                warnings.push(collaborator_failed(Collaborator::Metrics, &e));
            }
        }
        if record.drift_tier.is_drift() {
            if let Some(notifier) = &self.notifier {
                if let Err(e) = notifier.notify(&DriftAlert::from(record)) {
                    warnings.push(collaborator_failed(Collaborator::Notifier, &e));
                }
            }
        }
    }
}

fn collaborator_failed(collaborator: Collaborator, error: &SinkError) -> Diagnostic {
    warn!(
        event = "collaborator.failed",
        collaborator = %collaborator,
        error = %error,
    );
    Diagnostic::CollaboratorFailure {
        collaborator,
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftwatch_core::DriftTier;

    #[test]
    fn invalid_config_is_rejected() {
        let config = EvaluationConfig {
            bucket_count: 0,
            ..EvaluationConfig::default()
        };
        assert_eq!(
            EvaluationSession::new(config).err(),
            Some(InvalidInputError::BucketCount(0))
        );
    }

    #[test]
    fn bare_session_returns_record() {
        let session = EvaluationSession::new(EvaluationConfig::default()).unwrap();
        let reference: Vec<f64> = (0..100).map(f64::from).collect();
        let outcome = session.evaluate(&reference, &reference).unwrap();
        assert_eq!(outcome.record.psi_score, 0.0);
        assert_eq!(outcome.record.drift_tier, DriftTier::NoDrift);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn degraded_binning_is_surfaced() {
        let session = EvaluationSession::new(EvaluationConfig::default()).unwrap();
        let outcome = session.evaluate(&[1.0; 50], &[1.0, 2.0, 3.0]).unwrap();
        assert!(matches!(
            outcome.warnings.as_slice(),
            [Diagnostic::DegradedBinning { feature: None, degraded }] if degraded.effective == 1
        ));
    }

    #[test]
    fn diagnostics_display() {
        let d = Diagnostic::CollaboratorFailure {
            collaborator: Collaborator::Notifier,
            message: "timeout".into(),
        };
        assert_eq!(d.to_string(), "notifier failed: timeout");
    }
}
