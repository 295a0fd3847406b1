//! Sample loading from headed CSV files.
//!
//! - [`load_column`] reads one named numeric column.
//! - [`load_frame`] reads every column whose cells all parse as `f64`;
//!   anything else (timestamps, labels) is ignored.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::features::FeatureFrame;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("column '{column}' not found in {path} (available: {})", available.join(", "))]
    MissingColumn {
        path: PathBuf,
        column: String,
        available: Vec<String>,
    },

    #[error("column '{column}' row {row}: '{value}' is not a number")]
    InvalidCell {
        column: String,
        row: usize,
        value: String,
    },

    #[error("no numeric columns in {path}")]
    NoNumericColumns { path: PathBuf },
}

fn open(path: &Path) -> Result<csv::Reader<std::fs::File>, LoadError> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })
}

/// Every value of `column`, in file order.
pub fn load_column(path: &Path, column: &str) -> Result<Vec<f64>, LoadError> {
    let mut reader = open(path)?;
    let headers = reader.headers()?.clone();

    let index = headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
            available: headers.iter().map(str::to_string).collect(),
        })?;

    let mut values = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let cell = record.get(index).unwrap_or_default();
        let value = cell.parse::<f64>().map_err(|_| LoadError::InvalidCell {
            column: column.to_string(),
            row: row + 1,
            value: cell.to_string(),
        })?;
        values.push(value);
    }

    debug!(
        event = "data.column_loaded",
        path = %path.display(),
        column = column,
        rows = values.len(),
    );
    Ok(values)
}

/// All fully numeric columns, in header order.
pub fn load_frame(path: &Path) -> Result<FeatureFrame, LoadError> {
    let mut reader = open(path)?;
    let headers = reader.headers()?.clone();
    let mut columns: Vec<Option<Vec<f64>>> = vec![Some(Vec::new()); headers.len()];

    for record in reader.records() {
        let record = record?;
        for (slot, cell) in columns.iter_mut().zip(record.iter()) {
            let parsed = slot
                .as_mut()
                .and_then(|values| cell.parse::<f64>().ok().map(|v| values.push(v)));
            if parsed.is_none() {
                *slot = None;
            }
        }
    }

    let mut frame = FeatureFrame::new();
    for (name, values) in headers.iter().zip(columns) {
        if let Some(values) = values {
            frame.insert(name, values);
        }
    }

    if frame.is_empty() {
        return Err(LoadError::NoNumericColumns {
            path: path.to_path_buf(),
        });
    }
    debug!(
        event = "data.frame_loaded",
        path = %path.display(),
        columns = frame.len(),
    );
    Ok(frame)
}
