//! Run configuration

use crate::error::{PipelineError, Result};
use crate::optimizer::SamplerType;
use crate::preprocessing::DatasetSchema;
use crate::registry::DEFAULT_RMSE_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything one pipeline run needs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// CSV file to train on
    pub file_path: PathBuf,

    /// Fraction of rows held out for evaluation
    pub test_fraction: f64,

    /// Seed of the train/test shuffle
    pub split_seed: u64,

    /// Number of search trials
    pub trial_budget: usize,

    /// Largest held-out RMSE that is still accepted
    pub rmse_threshold: f64,

    /// Folds used to score each trial
    pub cv_folds: usize,

    /// Seed given to every random forest
    pub model_seed: u64,

    /// Seed of the search sampler
    pub search_seed: u64,

    pub sampler: SamplerType,

    /// Column roles
    pub schema: DatasetSchema,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            file_path: PathBuf::from("data/insurance.csv"),
            test_fraction: 0.2,
            split_seed: 34,
            trial_budget: 30,
            rmse_threshold: DEFAULT_RMSE_THRESHOLD,
            cv_folds: 5,
            model_seed: 42,
            search_seed: 42,
            sampler: SamplerType::Tpe,
            schema: DatasetSchema::insurance(),
        }
    }
}

impl PipelineConfig {
    /// Default configuration for `file_path`
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            ..Self::default()
        }
    }

    /// Read a JSON configuration; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&json).map_err(|e| {
            PipelineError::ConfigError(format!("invalid config {}: {}", path.display(), e))
        })
    }

    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = path.into();
        self
    }

    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }

    pub fn with_split_seed(mut self, seed: u64) -> Self {
        self.split_seed = seed;
        self
    }

    pub fn with_trial_budget(mut self, trials: usize) -> Self {
        self.trial_budget = trials;
        self
    }

    pub fn with_rmse_threshold(mut self, threshold: f64) -> Self {
        self.rmse_threshold = threshold;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_model_seed(mut self, seed: u64) -> Self {
        self.model_seed = seed;
        self
    }

    pub fn with_search_seed(mut self, seed: u64) -> Self {
        self.search_seed = seed;
        self
    }

    pub fn with_sampler(mut self, sampler: SamplerType) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn with_schema(mut self, schema: DatasetSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Check ranges before anything runs
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(PipelineError::ConfigError(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.trial_budget == 0 {
            return Err(PipelineError::ConfigError("trial_budget must be at least 1".into()));
        }
        if self.cv_folds < 2 {
            return Err(PipelineError::ConfigError(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        if !(self.rmse_threshold.is_finite() && self.rmse_threshold > 0.0) {
            return Err(PipelineError::ConfigError(format!(
                "rmse_threshold must be a positive number, got {}",
                self.rmse_threshold
            )));
        }
        self.schema.validate()
    }
}
