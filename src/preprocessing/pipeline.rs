//! Split plus fitted column transform

use super::{
    config::DatasetSchema,
    encoder::OneHotEncoder,
    scaler::StandardScaler,
    split::{train_test_split, TrainTestSplit},
};
use crate::error::{PipelineError, Result};
use crate::utils::Dataset;
use ndarray::{concatenate, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Scales numeric columns and one-hot encodes categorical columns.
///
/// Output layout is the numeric block followed by the categorical block,
/// each in declared column order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnTransformer {
    numeric_columns: Vec<String>,
    categorical_columns: Vec<String>,
    scaler: StandardScaler,
    encoder: OneHotEncoder,
    is_fitted: bool,
}

impl ColumnTransformer {
    /// Unfitted transformer for the feature roles in `schema`
    pub fn new(schema: &DatasetSchema) -> Self {
        Self {
            numeric_columns: schema.numeric_features.clone(),
            categorical_columns: schema.categorical_features.clone(),
            scaler: StandardScaler::new(),
            encoder: OneHotEncoder::new(),
            is_fitted: false,
        }
    }

    /// Learn statistics and vocabularies from `df`
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        self.scaler.fit(df, &self.numeric_columns)?;
        self.encoder.fit(df, &self.categorical_columns)?;
        self.is_fitted = true;
        Ok(self)
    }

    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PipelineError::NotFitted);
        }
        let numeric = self.scaler.transform(df)?;
        let categorical = self.encoder.transform(df)?;
        Ok(concatenate(Axis(1), &[numeric.view(), categorical.view()])?)
    }

    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<Array2<f64>> {
        self.fit(df)?;
        self.transform(df)
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }

    /// Names of the output columns
    pub fn feature_names(&self) -> Result<Vec<String>> {
        if !self.is_fitted {
            return Err(PipelineError::NotFitted);
        }
        let mut names = self.numeric_columns.clone();
        names.extend(self.encoder.feature_names());
        Ok(names)
    }

    pub fn n_features_out(&self) -> usize {
        self.numeric_columns.len() + self.encoder.n_outputs()
    }
}

/// Preprocessing stage: partitions the data and owns the fitted transform
#[derive(Debug, Clone)]
pub struct Preprocessor {
    schema: DatasetSchema,
    test_fraction: f64,
    seed: u64,
    transformer: Option<ColumnTransformer>,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(DatasetSchema::insurance())
    }
}

impl Preprocessor {
    /// Create a preprocessor with an 80/20 split and seed 34
    pub fn new(schema: DatasetSchema) -> Self {
        Self {
            schema,
            test_fraction: 0.2,
            seed: 34,
            transformer: None,
        }
    }

    /// Builder method to set the held-out fraction
    pub fn with_test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self
    }

    /// Builder method to set the shuffle seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn schema(&self) -> &DatasetSchema {
        &self.schema
    }

    /// Partition `dataset` into train and test halves
    pub fn split(&self, dataset: &Dataset) -> Result<TrainTestSplit> {
        train_test_split(dataset.frame(), &self.schema, self.test_fraction, self.seed)
    }

    /// Create the unfitted column transform
    pub fn build_pipeline(&mut self) -> &ColumnTransformer {
        debug!(
            numeric = ?self.schema.numeric_features,
            categorical = ?self.schema.categorical_features,
            "Column transform built"
        );
        self.transformer.insert(ColumnTransformer::new(&self.schema))
    }

    /// Fit the transform on `x_train` and apply it to both halves
    pub fn fit_transform(
        &mut self,
        x_train: &DataFrame,
        x_test: &DataFrame,
    ) -> Result<(Array2<f64>, Array2<f64>)> {
        let start = Instant::now();
        let transformer = self.transformer.as_mut().ok_or(PipelineError::NotFitted)?;

        let train = transformer.fit_transform(x_train)?;
        let test = transformer.transform(x_test)?;

        info!(
            train_shape = ?train.dim(),
            test_shape = ?test.dim(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Features transformed"
        );
        Ok((train, test))
    }

    /// The transform, once built
    pub fn transformer(&self) -> Option<&ColumnTransformer> {
        self.transformer.as_ref()
    }

    pub fn feature_names(&self) -> Result<Vec<String>> {
        self.transformer
            .as_ref()
            .ok_or(PipelineError::NotFitted)?
            .feature_names()
    }
}
