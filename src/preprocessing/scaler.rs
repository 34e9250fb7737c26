//! Standard scaling of numeric columns

use super::numeric_values;
use crate::error::{PipelineError, Result};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Per-column population statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub mean: f64,
    /// Population standard deviation, 1.0 when the column is constant
    pub scale: f64,
}

/// Standard scaler: (x - mean) / std with ddof = 0
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    columns: Vec<String>,
    stats: Vec<ColumnStats>,
    is_fitted: bool,
}

impl StandardScaler {
    /// Create an unfitted scaler
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn mean and standard deviation of `columns` from `df`
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        let mut stats = Vec::with_capacity(columns.len());
        for col in columns {
            let values = numeric_values(df, col)?;
            if values.is_empty() {
                return Err(PipelineError::ValidationError(format!(
                    "cannot fit scaler on empty column '{}'",
                    col
                )));
            }
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            let scale = if std > 0.0 && std.is_finite() { std } else { 1.0 };

            debug!(column = %col, mean, scale, "Scaler statistics");
            stats.push(ColumnStats { mean, scale });
        }

        self.columns = columns.to_vec();
        self.stats = stats;
        self.is_fitted = true;
        Ok(self)
    }

    /// Scale the fitted columns of `df` into an `(n_rows, n_columns)` matrix
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PipelineError::NotFitted);
        }

        let n_rows = df.height();
        let mut out = Array2::zeros((n_rows, self.columns.len()));
        for (j, (col, stats)) in self.columns.iter().zip(&self.stats).enumerate() {
            let values = numeric_values(df, col)?;
            for (i, v) in values.into_iter().enumerate() {
                out[[i, j]] = (v - stats.mean) / stats.scale;
            }
        }
        Ok(out)
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Fitted statistics for `column`
    pub fn stats(&self, column: &str) -> Option<&ColumnStats> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.stats[i])
    }
}
