//! Data preprocessing module
//!
//! Provides the preprocessing stage of the training pipeline:
//! - Seeded train/test split
//! - Standard scaling of numeric features
//! - One-hot encoding of categorical features

mod config;
mod encoder;
mod pipeline;
mod scaler;
mod split;

pub use config::DatasetSchema;
pub use encoder::OneHotEncoder;
pub use pipeline::{ColumnTransformer, Preprocessor};
pub use scaler::{ColumnStats, StandardScaler};
pub use split::{train_test_split, TrainTestSplit};

use crate::error::{PipelineError, Result};
use polars::prelude::*;

/// Values of `name` as `f64`. Nulls and values that do not parse as numbers are an error.
pub(crate) fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::FeatureNotFound(name.to_string()))?;
    let series = column.as_materialized_series().cast(&DataType::Float64)?;
    let ca = series.f64()?;

    let missing = ca.null_count();
    if missing > 0 {
        return Err(PipelineError::DataError(format!(
            "column '{}' has {} missing or non-numeric values",
            name, missing
        )));
    }
    Ok(ca.into_no_null_iter().collect())
}

/// Values of `name` as strings, nulls preserved
pub(crate) fn categorical_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::FeatureNotFound(name.to_string()))?;
    let series = column.as_materialized_series().cast(&DataType::String)?;
    let ca = series.str()?;
    Ok(ca.into_iter().map(|v| v.map(str::to_string)).collect())
}
