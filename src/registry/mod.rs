//! Quality gate and model registration

use crate::error::{PipelineError, Result};
use crate::evaluation::{MetricsReport, RMSE};
use crate::training::TrainedModel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{info, warn};

/// Default acceptance threshold on held-out RMSE
pub const DEFAULT_RMSE_THRESHOLD: f64 = 5000.0;

/// Result of applying the gate to a metrics report
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum RegistrationDecision {
    Accepted { rmse: f64, threshold: f64 },
    Rejected { rmse: f64, threshold: f64 },
}

impl RegistrationDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, RegistrationDecision::Accepted { .. })
    }
}

/// An accepted model with the evidence it was accepted on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredModel {
    pub model: TrainedModel,
    pub metrics: MetricsReport,
    pub rmse_threshold: f64,
    pub registered_at: DateTime<Utc>,
    /// SHA-256 of the fitted estimator's JSON serialization
    pub fingerprint: String,
}

impl RegisteredModel {
    /// Write the record as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Hex SHA-256 of `data`
pub fn compute_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Registration stage: accepts a model only if its RMSE is within the threshold
#[derive(Debug, Clone)]
pub struct ModelRegistrar {
    rmse_threshold: f64,
}

impl Default for ModelRegistrar {
    fn default() -> Self {
        Self::new(DEFAULT_RMSE_THRESHOLD)
    }
}

impl ModelRegistrar {
    pub fn new(rmse_threshold: f64) -> Self {
        Self { rmse_threshold }
    }

    pub fn rmse_threshold(&self) -> f64 {
        self.rmse_threshold
    }

    /// Apply the gate without touching the model.
    ///
    /// A missing `rmse` is an error; a non-finite one is a rejection.
    pub fn decide(&self, metrics: &MetricsReport) -> Result<RegistrationDecision> {
        let rmse = metrics.get(RMSE).ok_or_else(|| PipelineError::MissingMetric {
            name: RMSE.to_string(),
        })?;
        let threshold = self.rmse_threshold;

        if !rmse.is_finite() || rmse > threshold {
            Ok(RegistrationDecision::Rejected { rmse, threshold })
        } else {
            Ok(RegistrationDecision::Accepted { rmse, threshold })
        }
    }

    /// Return `model` unchanged if accepted, otherwise `RejectedModel`
    pub fn register(&self, model: TrainedModel, metrics: &MetricsReport) -> Result<TrainedModel> {
        match self.decide(metrics)? {
            RegistrationDecision::Accepted { rmse, threshold } => {
                info!(rmse, threshold, model = %model.configuration, "Model accepted");
                Ok(model)
            }
            RegistrationDecision::Rejected { rmse, threshold } => {
                warn!(rmse, threshold, model = %model.configuration, "Model rejected");
                Err(PipelineError::RejectedModel { rmse, threshold })
            }
        }
    }

    /// Gate the model and stamp it with a timestamp and fingerprint
    pub fn register_record(&self, model: TrainedModel, metrics: &MetricsReport) -> Result<RegisteredModel> {
        let model = self.register(model, metrics)?;
        let fingerprint = compute_sha256(serde_json::to_string(model.estimator())?.as_bytes());

        Ok(RegisteredModel {
            model,
            metrics: metrics.clone(),
            rmse_threshold: self.rmse_threshold,
            registered_at: Utc::now(),
            fingerprint,
        })
    }
}
