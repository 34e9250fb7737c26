//! Model family and hyperparameter selection

use super::{
    config::{OptimizationConfig, OptimizeDirection},
    optimizer::{HyperOptX, Study},
    samplers::SamplerType,
    search_space::{Parameter, SearchSpace, TrialParams},
};
use crate::error::{PipelineError, Result};
use crate::evaluation::root_mean_squared_error;
use crate::training::{CrossValidator, Estimator, ModelConfiguration, ModelFamily, Regressor};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Range searched for the number of trees
pub const N_ESTIMATORS_RANGE: (i64, i64) = (50, 300);
/// Range searched for the tree depth
pub const MAX_DEPTH_RANGE: (i64, i64) = (3, 20);

/// Outcome of the search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSelection {
    /// Best configuration, not yet trained
    pub configuration: ModelConfiguration,
    pub best_params: TrialParams,
    /// Mean cross-validated negative RMSE of the best trial
    pub best_score: f64,
    pub study: Study,
}

impl ModelSelection {
    /// Cross-validated RMSE of the chosen configuration
    pub fn cv_rmse(&self) -> f64 {
        -self.best_score
    }

    pub fn n_trials(&self) -> usize {
        self.study.trials.len()
    }
}

/// Searches model family and hyperparameters by k-fold cross-validation
#[derive(Debug, Clone)]
pub struct ModelSelector {
    trial_budget: usize,
    cv_folds: usize,
    model_seed: u64,
    search_seed: u64,
    sampler: SamplerType,
    n_startup_trials: usize,
}

impl Default for ModelSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelSelector {
    pub fn new() -> Self {
        Self {
            trial_budget: 30,
            cv_folds: 5,
            model_seed: 42,
            search_seed: 42,
            sampler: SamplerType::Tpe,
            n_startup_trials: 10,
        }
    }

    pub fn with_trial_budget(mut self, trials: usize) -> Self {
        self.trial_budget = trials;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    /// Seed given to every forest the search builds
    pub fn with_model_seed(mut self, seed: u64) -> Self {
        self.model_seed = seed;
        self
    }

    /// Seed of the sampler
    pub fn with_search_seed(mut self, seed: u64) -> Self {
        self.search_seed = seed;
        self
    }

    pub fn with_sampler(mut self, sampler: SamplerType) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn with_n_startup_trials(mut self, n: usize) -> Self {
        self.n_startup_trials = n;
        self
    }

    /// `model` in {linear, random-forest}; forest size and depth only for forests
    pub fn search_space() -> SearchSpace {
        let rf = ModelFamily::RandomForest.as_str();
        SearchSpace::new()
            .add(Parameter::categorical(
                "model",
                ModelFamily::ALL.iter().map(|f| f.as_str()).collect(),
            ))
            .add(Parameter::int("n_estimators", N_ESTIMATORS_RANGE.0, N_ESTIMATORS_RANGE.1).when("model", rf))
            .add(Parameter::int("max_depth", MAX_DEPTH_RANGE.0, MAX_DEPTH_RANGE.1).when("model", rf))
    }

    /// Turn sampled parameters into an untrained configuration
    pub fn configuration_from_params(&self, params: &TrialParams) -> Result<ModelConfiguration> {
        let family: ModelFamily = params
            .get("model")
            .and_then(|v| v.as_string())
            .ok_or_else(|| missing("model"))?
            .parse()?;

        let config = match family {
            ModelFamily::Linear => ModelConfiguration::Linear,
            ModelFamily::RandomForest => {
                let int_param = |name: &str| -> Result<usize> {
                    let v = params
                        .get(name)
                        .and_then(|v| v.as_int())
                        .ok_or_else(|| missing(name))?;
                    usize::try_from(v).map_err(|_| PipelineError::InvalidParameter {
                        name: name.to_string(),
                        value: v.to_string(),
                        reason: "must be non-negative".to_string(),
                    })
                };
                ModelConfiguration::RandomForest {
                    n_estimators: int_param("n_estimators")?,
                    max_depth: int_param("max_depth")?,
                    random_state: self.model_seed,
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Mean negative RMSE of `config` over unshuffled k folds of the training data
    pub fn score_configuration(
        &self,
        config: &ModelConfiguration,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
    ) -> Result<f64> {
        let cv = CrossValidator::new(self.cv_folds);
        let results = cv.cross_validate(x_train, y_train, |x_fit, y_fit, x_val, y_val| {
            let mut estimator = Estimator::from_configuration(config)?;
            estimator.fit(x_fit, y_fit)?;
            let pred = estimator.predict(x_val)?;
            Ok(-root_mean_squared_error(y_val, &pred)?)
        })?;
        Ok(results.mean_score)
    }

    /// Run the search and return the best configuration found
    pub fn optimize(&self, x_train: &Array2<f64>, y_train: &Array1<f64>) -> Result<ModelSelection> {
        if self.trial_budget == 0 {
            return Err(PipelineError::InvalidParameter {
                name: "trial_budget".to_string(),
                value: "0".to_string(),
                reason: "at least one trial is required".to_string(),
            });
        }

        let config = OptimizationConfig::new()
            .with_n_trials(self.trial_budget)
            .with_direction(OptimizeDirection::Maximize)
            .with_sampler(self.sampler)
            .with_n_startup_trials(self.n_startup_trials)
            .with_random_state(self.search_seed);

        info!(
            trials = self.trial_budget,
            folds = self.cv_folds,
            sampler = %self.sampler,
            rows = x_train.nrows(),
            features = x_train.ncols(),
            "Starting model search"
        );

        let mut optimizer = HyperOptX::new(config, Self::search_space());
        optimizer.optimize(|params| {
            let config = self.configuration_from_params(params)?;
            self.score_configuration(&config, x_train, y_train)
        })?;

        let study = optimizer.into_study();
        let best = study
            .best_trial()
            .ok_or_else(|| PipelineError::OptimizationError("no completed trial".to_string()))?;
        let best_params = best.params.clone();
        let best_score = best
            .value
            .ok_or_else(|| PipelineError::OptimizationError("best trial has no value".to_string()))?;
        let configuration = self.configuration_from_params(&best_params)?;

        info!(
            model = %configuration,
            cv_rmse = -best_score,
            pruned = study.n_pruned(),
            elapsed_secs = study.total_duration_secs,
            "Model search finished"
        );

        Ok(ModelSelection {
            configuration,
            best_params,
            best_score,
            study,
        })
    }
}

fn missing(name: &str) -> PipelineError {
    PipelineError::InvalidParameter {
        name: name.to_string(),
        value: "<missing>".to_string(),
        reason: "not present in trial parameters".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::ParameterValue;

    fn linear_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((50, 3), |(i, j)| ((i * 7 + j * 3) % 11) as f64);
        let y = x.column(0).mapv(|v| 2.0 * v) - x.column(1) + x.column(2).mapv(|v| 0.5 * v) + 10.0;
        (x, y)
    }

    #[test]
    fn test_configuration_from_params() {
        let selector = ModelSelector::new().with_model_seed(7);

        let mut params = TrialParams::new();
        params.insert("model".into(), ParameterValue::String("linear".into()));
        assert_eq!(
            selector.configuration_from_params(&params).unwrap(),
            ModelConfiguration::Linear
        );

        params.insert("model".into(), ParameterValue::String("random-forest".into()));
        params.insert("n_estimators".into(), ParameterValue::Int(120));
        params.insert("max_depth".into(), ParameterValue::Int(5));
        assert_eq!(
            selector.configuration_from_params(&params).unwrap(),
            ModelConfiguration::RandomForest {
                n_estimators: 120,
                max_depth: 5,
                random_state: 7,
            }
        );
    }

    #[test]
    fn test_forest_without_depth_is_invalid() {
        let mut params = TrialParams::new();
        params.insert("model".into(), ParameterValue::String("random-forest".into()));
        params.insert("n_estimators".into(), ParameterValue::Int(60));
        assert!(ModelSelector::new().configuration_from_params(&params).is_err());
    }

    #[test]
    fn test_search_space_shape() {
        let space = ModelSelector::search_space();
        assert!(space.validate().is_ok());
        assert_eq!(space.param_names(), vec!["model", "n_estimators", "max_depth"]);
    }

    #[test]
    fn test_linear_wins_on_linear_data() {
        let (x, y) = linear_data();
        let selection = ModelSelector::new()
            .with_trial_budget(6)
            .with_n_startup_trials(6)
            .with_sampler(SamplerType::Random)
            .with_search_seed(1)
            .optimize(&x, &y)
            .unwrap();

        assert_eq!(selection.n_trials(), 6);
        let best = selection.best_score;
        for trial in selection.study.completed_trials() {
            assert!(trial.value.map_or(false, |v| best >= v));
        }
        // the exact relation is recovered by least squares
        if selection.study.trials.iter().any(|t| t.params["model"].as_string() == Some("linear")) {
            assert_eq!(selection.configuration, ModelConfiguration::Linear);
            assert!(selection.cv_rmse() < 1e-3);
        }
    }

    #[test]
    fn test_zero_budget() {
        let (x, y) = linear_data();
        assert!(ModelSelector::new().with_trial_budget(0).optimize(&x, &y).is_err());
    }

    #[test]
    fn test_too_few_rows_for_folds_fails_search() {
        let x = Array2::zeros((3, 2));
        let y = Array1::zeros(3);
        let err = ModelSelector::new().with_trial_budget(2).optimize(&x, &y).unwrap_err();
        assert!(matches!(err, PipelineError::OptimizationError(_)));
    }
}
