//! Column roles for the input table

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Which columns are the target, numeric features and categorical features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSchema {
    /// Regression target
    pub target: String,

    /// Features that are standardized
    pub numeric_features: Vec<String>,

    /// Features that are one-hot encoded
    pub categorical_features: Vec<String>,
}

impl Default for DatasetSchema {
    fn default() -> Self {
        Self::insurance()
    }
}

impl DatasetSchema {
    /// The medical insurance charges table
    pub fn insurance() -> Self {
        Self {
            target: "charges".to_string(),
            numeric_features: vec!["age".into(), "bmi".into(), "children".into()],
            categorical_features: vec!["sex".into(), "smoker".into(), "region".into()],
        }
    }

    /// Builder method to set the target column
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Builder method to set the numeric feature columns
    pub fn with_numeric_features<S: Into<String>>(mut self, cols: impl IntoIterator<Item = S>) -> Self {
        self.numeric_features = cols.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method to set the categorical feature columns
    pub fn with_categorical_features<S: Into<String>>(mut self, cols: impl IntoIterator<Item = S>) -> Self {
        self.categorical_features = cols.into_iter().map(Into::into).collect();
        self
    }

    /// Numeric then categorical feature names
    pub fn feature_columns(&self) -> Vec<String> {
        self.numeric_features
            .iter()
            .chain(self.categorical_features.iter())
            .cloned()
            .collect()
    }

    /// Check the schema itself is usable
    pub fn validate(&self) -> Result<()> {
        if self.target.is_empty() {
            return Err(PipelineError::ConfigError("target column name is empty".into()));
        }
        if self.numeric_features.is_empty() && self.categorical_features.is_empty() {
            return Err(PipelineError::ConfigError("schema declares no feature columns".into()));
        }
        let features = self.feature_columns();
        if features.iter().any(|f| f == &self.target) {
            return Err(PipelineError::ConfigError(format!(
                "target '{}' is also listed as a feature",
                self.target
            )));
        }
        for (i, name) in features.iter().enumerate() {
            if features[..i].contains(name) {
                return Err(PipelineError::ConfigError(format!(
                    "column '{}' is declared more than once",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Fail with `FeatureNotFound` for the first declared column the frame lacks
    pub fn check_columns(&self, frame: &DataFrame) -> Result<()> {
        let present = frame.get_column_names();
        std::iter::once(&self.target)
            .chain(self.numeric_features.iter())
            .chain(self.categorical_features.iter())
            .try_for_each(|name| {
                if present.iter().any(|c| c.as_str() == name) {
                    Ok(())
                } else {
                    Err(PipelineError::FeatureNotFound(name.clone()))
                }
            })
    }
}
