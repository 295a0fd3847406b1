//! Drift alerts and the stock notifiers.
//!
//! An alert is raised for every evaluation whose tier is not `No Drift`.
//! Transport (webhooks, chat) is not done here: the JSONL outbox is the
//! hand-off point for whatever delivers alerts.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use driftwatch_core::{DriftTier, EvaluationRecord};

use crate::sinks::{Notifier, SinkError};

/// What a notifier receives: `{psi_score, drift_tier, timestamp}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftAlert {
    pub psi_score: f64,
    pub drift_tier: DriftTier,
    pub timestamp: DateTime<Utc>,
}

impl DriftAlert {
    /// One-line human summary.
    pub fn summary(&self) -> String {
        format!(
            "{} detected (PSI={:.4}) at {}",
            self.drift_tier,
            self.psi_score,
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

impl From<&EvaluationRecord> for DriftAlert {
    fn from(record: &EvaluationRecord) -> Self {
        Self {
            psi_score: record.psi_score,
            drift_tier: record.drift_tier,
            timestamp: record.timestamp,
        }
    }
}

/// Emits each alert as a `warn!` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, alert: &DriftAlert) -> Result<(), SinkError> {
        warn!(
            event = "drift.alert",
            psi_score = alert.psi_score,
            drift_tier = %alert.drift_tier,
            timestamp = %alert.timestamp,
            "{}",
            alert.summary()
        );
        Ok(())
    }
}

/// Appends one JSON object per alert to a file.
pub struct JsonlAlertOutbox {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlAlertOutbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every alert in the outbox. Malformed lines are skipped.
    pub fn read_all(&self) -> io::Result<Vec<DriftAlert>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = io::BufReader::new(fs::File::open(&self.path)?);
        let mut alerts = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(alert) = serde_json::from_str::<DriftAlert>(&line) {
                alerts.push(alert);
            }
        }
        Ok(alerts)
    }
}

impl Notifier for JsonlAlertOutbox {
    fn notify(&self, alert: &DriftAlert) -> Result<(), SinkError> {
        let json = serde_json::to_string(alert)?;
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{json}")?;
        file.flush()?;
        Ok(())
    }
}

/// Forwards each alert to every inner notifier.
///
/// All notifiers are attempted; the first failure is returned.
#[derive(Default)]
pub struct FanoutNotifier {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl Notifier for FanoutNotifier {
    fn notify(&self, alert: &DriftAlert) -> Result<(), SinkError> {
        let mut first_error = None;
        for notifier in &self.notifiers {
            if let Err(e) = notifier.notify(alert) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
