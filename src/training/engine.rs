//! Training engine implementation

use super::config::{ModelConfiguration, ModelFamily};
use super::linear_models::LinearRegression;
use super::models::Regressor;
use super::random_forest::RandomForest;
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Fitted estimator variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Estimator {
    LinearRegression(LinearRegression),
    RandomForestRegressor(RandomForest),
}

impl Estimator {
    /// Unfitted estimator for `config`
    pub fn from_configuration(config: &ModelConfiguration) -> Result<Self> {
        config.validate()?;
        Ok(match config {
            ModelConfiguration::Linear => Estimator::LinearRegression(LinearRegression::new()),
            ModelConfiguration::RandomForest { n_estimators, max_depth, random_state } => {
                Estimator::RandomForestRegressor(
                    RandomForest::new(*n_estimators)
                        .with_max_depth(*max_depth)
                        .with_random_state(*random_state),
                )
            }
        })
    }

    fn as_regressor(&self) -> &dyn Regressor {
        match self {
            Estimator::LinearRegression(m) => m,
            Estimator::RandomForestRegressor(m) => m,
        }
    }

    fn as_regressor_mut(&mut self) -> &mut dyn Regressor {
        match self {
            Estimator::LinearRegression(m) => m,
            Estimator::RandomForestRegressor(m) => m,
        }
    }
}

impl Regressor for Estimator {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.as_regressor_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.as_regressor().predict(x)
    }

    fn is_fitted(&self) -> bool {
        self.as_regressor().is_fitted()
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.as_regressor().feature_importances()
    }
}

/// A configuration together with its fitted estimator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    pub configuration: ModelConfiguration,
    estimator: Estimator,
    pub n_features: usize,
    pub n_samples: usize,
    pub training_time_secs: f64,
}

impl TrainedModel {
    pub fn family(&self) -> ModelFamily {
        self.configuration.family()
    }

    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.n_features {
            return Err(PipelineError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        self.estimator.predict(x)
    }

    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        self.estimator.feature_importances()
    }

    /// Serialize the model to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Fits a model configuration on the full training set
#[derive(Debug, Clone, Default)]
pub struct ModelTrainer;

impl ModelTrainer {
    pub fn new() -> Self {
        Self
    }

    /// Build the estimator for `config` and fit it on all of `x_train`
    pub fn train(
        &self,
        config: &ModelConfiguration,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
    ) -> Result<TrainedModel> {
        if x_train.nrows() != y_train.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("y length = {}", x_train.nrows()),
                actual: format!("y length = {}", y_train.len()),
            });
        }

        let start = Instant::now();
        let mut estimator = Estimator::from_configuration(config)?;
        estimator.fit(x_train, y_train)?;
        let training_time_secs = start.elapsed().as_secs_f64();

        debug!(elapsed_secs = training_time_secs, "Estimator fitted");
        info!(
            model = %config,
            rows = x_train.nrows(),
            features = x_train.ncols(),
            "Model trained"
        );

        Ok(TrainedModel {
            configuration: config.clone(),
            estimator,
            n_features: x_train.ncols(),
            n_samples: x_train.nrows(),
            training_time_secs,
        })
    }
}
