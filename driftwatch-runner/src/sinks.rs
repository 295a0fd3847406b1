//! Collaborator capabilities injected into an evaluation session.
//!
//! Each capability is a single-method trait. Implementations own their own
//! transport and resource cleanup; the session only calls them and turns any
//! failure into a warning.

use std::io;

use thiserror::Error;

use driftwatch_core::EvaluationRecord;

use crate::alerts::DriftAlert;

/// A collaborator failed to persist, notify, or record.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Rejected(String),
}

/// Appends evaluation records to an append-only log.
pub trait LogAppender: Send + Sync {
    fn append(&self, record: &EvaluationRecord) -> Result<(), SinkError>;
}

/// Hands a drift alert to an external channel.
pub trait Notifier: Send + Sync {
    fn notify(&self, alert: &DriftAlert) -> Result<(), SinkError>;
}

/// Records one evaluation as metrics.
pub trait MetricsSink: Send + Sync {
    fn observe(&self, record: &EvaluationRecord) -> Result<(), SinkError>;
}
