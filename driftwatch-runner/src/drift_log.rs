//! CSV drift log: the append-only history dashboards render.
//!
//! ```text
//! timestamp,psi_score,drift_status
//! 2024-05-01T12:30:00Z,0.1832,Possible Drift
//! ```
//!
//! The header is written once, when the file is missing or empty. Every
//! append opens the file, writes one row, and closes it again, so no handle
//! outlives a call. The parent directory is created on demand.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use driftwatch_core::{DriftTier, EvaluationRecord};

use crate::sinks::{LogAppender, SinkError};

/// Column names, in file order.
pub const LOG_HEADER: [&str; 3] = ["timestamp", "psi_score", "drift_status"];

/// Default location, relative to the working directory.
pub const DEFAULT_LOG_PATH: &str = "logs/psi_drift_log.csv";

pub struct CsvDriftLog {
    path: PathBuf,
    // Serialises the header check with the append.
    write_lock: Mutex<()>,
}

#[derive(Debug, Deserialize)]
struct LogRow {
    timestamp: String,
    psi_score: f64,
    drift_status: String,
}

impl CsvDriftLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record back.
    ///
    /// A missing file is an empty log. Rows that do not parse are skipped
    /// with a warning.
    pub fn read_all(&self) -> Result<Vec<EvaluationRecord>, SinkError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut records = Vec::new();

        for (line, row) in reader.deserialize::<LogRow>().enumerate() {
            let parsed = row
                .map_err(|e| e.to_string())
                .and_then(|row| parse_row(&row));
            match parsed {
                Ok(record) => records.push(record),
                Err(reason) => warn!(
                    event = "drift_log.malformed_row",
                    path = %self.path.display(),
                    line = line + 2,
                    reason = %reason,
                ),
            }
        }

        Ok(records)
    }

    /// The last `n` records, oldest first.
    pub fn tail(&self, n: usize) -> Result<Vec<EvaluationRecord>, SinkError> {
        let mut records = self.read_all()?;
        let skip = records.len().saturating_sub(n);
        Ok(records.split_off(skip))
    }
}

impl LogAppender for CsvDriftLog {
    fn append(&self, record: &EvaluationRecord) -> Result<(), SinkError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let needs_header = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(e.into()),
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record(LOG_HEADER)?;
        }
        writer.write_record([
            record.timestamp_iso(),
            record.psi_display(),
            record.drift_tier.label().to_string(),
        ])?;
        writer.flush()?;

        debug!(
            event = "drift_log.appended",
            path = %self.path.display(),
            psi_score = record.psi_score,
            drift_status = %record.drift_tier,
        );
        Ok(())
    }
}

fn parse_row(row: &LogRow) -> Result<EvaluationRecord, String> {
    let timestamp = parse_timestamp(&row.timestamp)?;
    let tier: DriftTier = row.drift_status.parse()?;
    Ok(EvaluationRecord::new(timestamp, row.psi_score, tier))
}

/// RFC 3339, or a naive `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DDTHH:MM:SS[.f]` read as UTC.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| format!("unrecognised timestamp '{raw}'"))
}
