//! Insurance charges training pipeline
//!
//! Trains a regression model that predicts medical insurance charges from
//! demographic and lifestyle attributes, and registers it only if its
//! held-out error is acceptable.
//!
//! # Modules
//!
//! ## Stages
//! - [`utils`] - CSV loading into a [`Dataset`](utils::Dataset)
//! - [`preprocessing`] - Train/test split, scaling and one-hot encoding
//! - [`optimizer`] - Model family and hyperparameter search (TPE, random)
//! - [`training`] - Linear regression and random forest estimators
//! - [`evaluation`] - RMSE, MAE and R² on held-out data
//! - [`registry`] - RMSE quality gate and model records
//!
//! ## Orchestration
//! - [`pipeline`] - Runs the stages in order under one run id
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Stages
pub mod utils;
pub mod preprocessing;
pub mod optimizer;
pub mod training;
pub mod evaluation;
pub mod registry;

// Orchestration
pub mod pipeline;
pub mod cli;

pub use error::{PipelineError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{PipelineError, Result};

    // Loading
    pub use crate::utils::{DataLoader, Dataset};

    // Preprocessing
    pub use crate::preprocessing::{DatasetSchema, Preprocessor, TrainTestSplit};

    // Selection
    pub use crate::optimizer::{ModelSelection, ModelSelector, SamplerType};

    // Training
    pub use crate::training::{ModelConfiguration, ModelFamily, ModelTrainer, TrainedModel};

    // Evaluation and registration
    pub use crate::evaluation::{MetricsReport, RegressionEvaluator};
    pub use crate::registry::{ModelRegistrar, RegisteredModel};

    // Orchestration
    pub use crate::pipeline::{PipelineConfig, PipelineOutcome, PipelineStage, TrainingPipeline};
}
