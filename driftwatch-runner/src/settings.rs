//! Runner settings, loaded from TOML.
//!
//! ```toml
//! [evaluation]
//! bucket_count = 10
//! binning = "quantile"
//! epsilon = 1e-6
//! [evaluation.thresholds]
//! possible = 0.10
//! likely = 0.25
//!
//! [log]
//! path = "logs/psi_drift_log.csv"
//!
//! [alerts]
//! outbox = "logs/alerts.jsonl"
//!
//! [monitor]
//! window_size = 1000
//! check_interval = 100
//! min_observations = 100
//! ```
//!
//! Every section and field is optional.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use driftwatch_core::{ConfigError, EvaluationConfig};

use crate::drift_log::DEFAULT_LOG_PATH;
use crate::monitor::MonitorConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub path: PathBuf,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_LOG_PATH),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertSettings {
    /// JSONL outbox for an external alert transport; alerts only go to the
    /// tracing log when unset.
    pub outbox: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub evaluation: EvaluationConfig,
    pub log: LogSettings,
    pub alerts: AlertSettings,
    pub monitor: MonitorConfig,
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.evaluation.validate()?;
        self.monitor.validate()?;
        Ok(())
    }
}
