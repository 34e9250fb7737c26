//! Error types for the insurance training pipeline

use crate::pipeline::PipelineStage;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Data source not found: {path}")]
    NotFound { path: String },

    #[error("Failed to load {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("Transform or model used before it was fitted")]
    NotFitted,

    #[error("Metric '{name}' missing from evaluation report")]
    MissingMetric { name: String },

    #[error("Model rejected: RMSE {rmse:.2} exceeds threshold {threshold:.2}")]
    RejectedModel { rmse: f64, threshold: f64 },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Optimization error: {0}")]
    OptimizationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: PipelineStage,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Wrap this error with the stage it came from.
    ///
    /// Already-wrapped errors keep their original stage.
    pub fn in_stage(self, stage: PipelineStage) -> Self {
        match self {
            err @ PipelineError::Stage { .. } => err,
            other => PipelineError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The underlying error, with any stage wrapper removed
    pub fn root(&self) -> &PipelineError {
        match self {
            PipelineError::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Stage that failed, if the error went through the orchestrator
    pub fn failed_stage(&self) -> Option<PipelineStage> {
        match self {
            PipelineError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// True when the quality gate rejected the model.
    ///
    /// A rejection is an expected outcome of a run, not an infrastructure failure.
    pub fn is_rejection(&self) -> bool {
        matches!(self.root(), PipelineError::RejectedModel { .. })
    }
}

impl From<polars::error::PolarsError> for PipelineError {
    fn from(err: polars::error::PolarsError) -> Self {
        PipelineError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PipelineError {
    fn from(err: ndarray::ShapeError) -> Self {
        PipelineError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
