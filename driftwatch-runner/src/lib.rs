//! driftwatch runner: evaluation sessions and their collaborators.
//!
//! This crate builds on `driftwatch-core` to provide:
//! - The evaluation session: score, classify, then log / observe / notify
//! - CSV drift log with the `timestamp,psi_score,drift_status` format
//! - Alert notifiers (tracing, JSONL outbox, fan-out)
//! - In-memory metrics sink
//! - Edge cache keyed by reference fingerprint
//! - Multi-feature evaluation and CSV data loading
//! - Streaming monitors over sliding windows (single series or feature rows)
//! - TOML settings and tracing initialisation

pub mod alerts;
pub mod cache;
pub mod data_loader;
pub mod drift_log;
pub mod features;
pub mod metrics;
pub mod monitor;
pub mod session;
pub mod settings;
pub mod sinks;
pub mod telemetry;

pub use alerts::{DriftAlert, FanoutNotifier, JsonlAlertOutbox, TracingNotifier};
pub use cache::EdgeCache;
pub use data_loader::{load_column, load_frame, LoadError};
pub use drift_log::{CsvDriftLog, DEFAULT_LOG_PATH, LOG_HEADER};
pub use features::{evaluate_features, FeatureFrame, FeatureReport, FeatureScore, MissingFeature};
pub use metrics::{InMemoryMetrics, MetricsSnapshot};
pub use monitor::{FeatureStreamMonitor, MonitorConfig, StreamMonitor};
pub use session::{Collaborator, Diagnostic, EvaluationOutcome, EvaluationSession, FeatureOutcome};
pub use settings::{AlertSettings, LogSettings, Settings};
pub use sinks::{LogAppender, MetricsSink, Notifier, SinkError};
