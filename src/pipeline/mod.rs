//! End-to-end training run
//!
//! Chains the stages in a fixed order:
//!
//! ```text
//! load -> preprocess -> select -> train -> evaluate -> register
//! ```
//!
//! Each stage runs inside a tracing span tagged with the run id, and any
//! error it raises is wrapped with the stage name before it leaves the run.

mod config;

pub use config::PipelineConfig;

use crate::error::{PipelineError, Result};
use crate::evaluation::{MetricsReport, RegressionEvaluator};
use crate::optimizer::{ModelSelection, ModelSelector};
use crate::preprocessing::Preprocessor;
use crate::registry::{ModelRegistrar, RegisteredModel};
use crate::training::ModelTrainer;
use crate::utils::{DataLoader, Dataset, DatasetSummary, Timer};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, info_span};
use uuid::Uuid;

/// The steps of a run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Load,
    Preprocess,
    Select,
    Train,
    Evaluate,
    Register,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 6] = [
        PipelineStage::Load,
        PipelineStage::Preprocess,
        PipelineStage::Select,
        PipelineStage::Train,
        PipelineStage::Evaluate,
        PipelineStage::Register,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PipelineStage::Load => "load",
            PipelineStage::Preprocess => "preprocess",
            PipelineStage::Select => "select",
            PipelineStage::Train => "train",
            PipelineStage::Evaluate => "evaluate",
            PipelineStage::Register => "register",
        }
    }

    /// Whether the stage output depends only on its inputs.
    ///
    /// Registration stamps a timestamp, so it is never reused. The runner
    /// keeps no cache; the flag is recorded on each stage span for callers
    /// that memoize runs.
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, PipelineStage::Register)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Wall-clock time spent in one stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: PipelineStage,
    pub elapsed_secs: f64,
}

/// Everything a successful run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub run_id: String,
    pub dataset: DatasetSummary,
    /// Names of the transformed feature columns
    pub feature_names: Vec<String>,
    pub selection: ModelSelection,
    /// Held-out metrics of the registered model
    pub metrics: MetricsReport,
    pub registered: RegisteredModel,
    pub timings: Vec<StageTiming>,
}

impl PipelineOutcome {
    pub fn total_secs(&self) -> f64 {
        self.timings.iter().map(|t| t.elapsed_secs).sum()
    }

    /// Write the outcome as pretty JSON
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Orchestrates one training run
#[derive(Debug, Clone)]
pub struct TrainingPipeline {
    config: PipelineConfig,
    run_id: Uuid,
}

impl TrainingPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Load `config.file_path` and run every stage on it
    pub fn run(&self) -> Result<PipelineOutcome> {
        self.config.validate()?;
        let mut timings = Vec::with_capacity(PipelineStage::ALL.len());

        let dataset = self.stage(PipelineStage::Load, &mut timings, || {
            DataLoader::new().load(&self.config.file_path)
        })?;

        self.run_stages(&dataset, timings)
    }

    /// Run every stage after loading on an in-memory dataset
    pub fn run_on_dataset(&self, dataset: &Dataset) -> Result<PipelineOutcome> {
        self.config.validate()?;
        self.run_stages(dataset, Vec::with_capacity(PipelineStage::ALL.len()))
    }

    fn run_stages(&self, dataset: &Dataset, mut timings: Vec<StageTiming>) -> Result<PipelineOutcome> {
        let config = &self.config;
        info!(
            run_id = %self.run_id,
            source = dataset.source(),
            rows = dataset.n_rows(),
            "Pipeline run started"
        );

        let (x_train, x_test, y_train, y_test, feature_names) =
            self.stage(PipelineStage::Preprocess, &mut timings, || {
                let mut preprocessor = Preprocessor::new(config.schema.clone())
                    .with_test_fraction(config.test_fraction)
                    .with_seed(config.split_seed);
                let split = preprocessor.split(dataset)?;
                preprocessor.build_pipeline();
                let (x_train, x_test) = preprocessor.fit_transform(&split.x_train, &split.x_test)?;
                let names = preprocessor.feature_names()?;
                Ok((x_train, x_test, split.y_train, split.y_test, names))
            })?;

        let selection = self.stage(PipelineStage::Select, &mut timings, || {
            ModelSelector::new()
                .with_trial_budget(config.trial_budget)
                .with_cv_folds(config.cv_folds)
                .with_model_seed(config.model_seed)
                .with_search_seed(config.search_seed)
                .with_sampler(config.sampler)
                .optimize(&x_train, &y_train)
        })?;

        let model = self.stage(PipelineStage::Train, &mut timings, || {
            ModelTrainer::new().train(&selection.configuration, &x_train, &y_train)
        })?;

        let metrics = self.stage(PipelineStage::Evaluate, &mut timings, || {
            RegressionEvaluator::new().evaluate(&model, &x_test, &y_test)
        })?;

        let registered = self.stage(PipelineStage::Register, &mut timings, || {
            ModelRegistrar::new(config.rmse_threshold).register_record(model, &metrics)
        })?;

        let outcome = PipelineOutcome {
            run_id: self.run_id.to_string(),
            dataset: dataset.summary(),
            feature_names,
            selection,
            metrics,
            registered,
            timings,
        };

        info!(
            run_id = %self.run_id,
            model = %outcome.registered.model.configuration,
            rmse = outcome.metrics.rmse(),
            total_secs = outcome.total_secs(),
            "Pipeline run finished"
        );
        Ok(outcome)
    }

    fn stage<T>(
        &self,
        stage: PipelineStage,
        timings: &mut Vec<StageTiming>,
        f: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let span = info_span!(
            "stage",
            run_id = %self.run_id,
            stage = stage.name(),
            cacheable = stage.is_cacheable()
        );
        let _enter = span.enter();

        let timer = Timer::start();
        let result = f().map_err(|e: PipelineError| e.in_stage(stage));
        timings.push(StageTiming {
            stage,
            elapsed_secs: timer.elapsed_secs(),
        });
        result
    }
}
