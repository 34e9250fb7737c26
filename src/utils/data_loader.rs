//! Data loading utilities

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Number of rows shown in the load summary
const SAMPLE_ROWS: usize = 5;

/// An in-memory table together with the source it was read from
#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
    source: String,
}

impl Dataset {
    /// Wrap an existing DataFrame
    pub fn new(frame: DataFrame, source: impl Into<String>) -> Self {
        Self {
            frame,
            source: source.into(),
        }
    }

    /// Underlying DataFrame
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Where the data came from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn n_rows(&self) -> usize {
        self.frame.height()
    }

    pub fn n_cols(&self) -> usize {
        self.frame.width()
    }

    /// Column names in stored order
    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Shape and column summary
    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            source: self.source.clone(),
            n_rows: self.n_rows(),
            n_cols: self.n_cols(),
            columns: self.column_names(),
        }
    }

    /// First rows rendered as a table
    pub fn preview(&self) -> String {
        self.frame.head(Some(SAMPLE_ROWS)).to_string()
    }
}

/// Row/column counts and column names of a loaded dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub source: String,
    pub n_rows: usize,
    pub n_cols: usize,
    pub columns: Vec<String>,
}

/// CSV loader
#[derive(Debug, Clone, Default)]
pub struct DataLoader;

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self
    }

    /// Load a CSV file with a header row.
    ///
    /// Column types are inferred from every row, so a decimal value deep in
    /// an otherwise integral column widens it to `Float64`.
    ///
    /// A missing file is reported as [`PipelineError::NotFound`]; anything
    /// else that stops the table from being read is [`PipelineError::Load`].
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Dataset> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let start = Instant::now();

        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => PipelineError::NotFound { path: display.clone() },
            _ => PipelineError::Load {
                path: display.clone(),
                reason: e.to_string(),
            },
        })?;

        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| PipelineError::Load {
                path: display.clone(),
                reason: e.to_string(),
            })?;

        if frame.height() == 0 {
            return Err(PipelineError::Load {
                path: display,
                reason: "file contains no data rows".to_string(),
            });
        }

        let dataset = Dataset::new(frame, display);
        let summary = dataset.summary();
        info!(
            source = %summary.source,
            rows = summary.n_rows,
            cols = summary.n_cols,
            columns = ?summary.columns,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Data loaded"
        );
        debug!("First rows:\n{}", dataset.preview());

        Ok(dataset)
    }
}
