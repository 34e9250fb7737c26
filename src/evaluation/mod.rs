//! Regression metrics for held-out evaluation

use crate::error::{PipelineError, Result};
use crate::training::TrainedModel;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;

/// Name of the root mean squared error entry
pub const RMSE: &str = "rmse";
/// Name of the mean absolute error entry
pub const MAE: &str = "mae";
/// Name of the mean squared error entry
pub const MSE: &str = "mse";
/// Name of the coefficient of determination entry
pub const R2_SCORE: &str = "r2_score";
/// Name of the sample count entry
pub const N_SAMPLES: &str = "n_samples";

/// Metric name to value, ordered by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricsReport(BTreeMap<String, f64>);

impl MetricsReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.0.insert(name.into(), value)
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn rmse(&self) -> Option<f64> {
        self.get(RMSE)
    }

    pub fn mae(&self) -> Option<f64> {
        self.get(MAE)
    }

    pub fn r2_score(&self) -> Option<f64> {
        self.get(R2_SCORE)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{}={:.4}", k, v)).collect();
        write!(f, "{}", parts.join(", "))
    }
}

fn check_lengths(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(PipelineError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(PipelineError::ValidationError(
            "cannot compute metrics on zero samples".to_string(),
        ));
    }
    Ok(())
}

/// sqrt(mean((y_true - y_pred)^2))
pub fn root_mean_squared_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let mse = (y_true - y_pred).mapv(|e| e * e).mean().unwrap_or(0.0);
    Ok(mse.sqrt())
}

/// rmse, mse, mae, r2_score and n_samples for one set of predictions.
///
/// When the targets are constant, r2_score is 1.0 for a perfect fit and 0.0 otherwise.
pub fn regression_metrics(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<MetricsReport> {
    check_lengths(y_true, y_pred)?;

    let n = y_true.len() as f64;
    let errors = y_true - y_pred;

    let mse = errors.mapv(|e| e * e).sum() / n;
    let mae = errors.mapv(f64::abs).sum() / n;

    let y_mean = y_true.sum() / n;
    let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
    let ss_res: f64 = errors.iter().map(|e| e.powi(2)).sum();
    let r2 = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    };

    Ok(MetricsReport::new()
        .with(RMSE, mse.sqrt())
        .with(MSE, mse)
        .with(MAE, mae)
        .with(R2_SCORE, r2)
        .with(N_SAMPLES, n))
}

/// Evaluation stage: scores a trained model on held-out data
#[derive(Debug, Clone, Default)]
pub struct RegressionEvaluator;

impl RegressionEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(
        &self,
        model: &TrainedModel,
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
    ) -> Result<MetricsReport> {
        if x_test.nrows() != y_test.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("{} targets", x_test.nrows()),
                actual: format!("{} targets", y_test.len()),
            });
        }
        let predictions = model.predict(x_test)?;
        let report = regression_metrics(y_test, &predictions)?;

        info!(
            model = %model.configuration,
            rmse = report.rmse(),
            mae = report.mae(),
            r2_score = report.r2_score(),
            samples = y_test.len(),
            "Model evaluated"
        );
        Ok(report)
    }
}
