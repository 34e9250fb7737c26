//! HyperOptX - Main hyperparameter optimizer

use super::{
    config::{OptimizationConfig, OptimizeDirection},
    samplers::{create_sampler, Sampler},
    search_space::{SearchSpace, TrialParams},
};
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// Result of a single trial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    /// Trial number
    pub trial_id: usize,
    /// Parameters used
    pub params: TrialParams,
    /// Objective value; `None` for pruned trials
    pub value: Option<f64>,
    /// Trial duration in seconds
    pub duration_secs: f64,
    /// Whether trial was pruned
    pub pruned: bool,
    /// Why the objective failed, for pruned trials
    pub error: Option<String>,
}

/// Study containing all trials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Study {
    /// All trial results
    pub trials: Vec<TrialResult>,
    /// Best trial index
    pub best_trial_idx: Option<usize>,
    /// Total duration
    pub total_duration_secs: f64,
    /// Optimization direction
    pub direction: OptimizeDirection,
}

impl Study {
    /// Create a new study
    pub fn new(direction: OptimizeDirection) -> Self {
        Self {
            trials: Vec::new(),
            best_trial_idx: None,
            total_duration_secs: 0.0,
            direction,
        }
    }

    /// Get the best trial
    pub fn best_trial(&self) -> Option<&TrialResult> {
        self.best_trial_idx.map(|idx| &self.trials[idx])
    }

    /// Get the best value
    pub fn best_value(&self) -> Option<f64> {
        self.best_trial().and_then(|t| t.value)
    }

    /// Get the best parameters
    pub fn best_params(&self) -> Option<&TrialParams> {
        self.best_trial().map(|t| &t.params)
    }

    /// Trials whose objective succeeded
    pub fn completed_trials(&self) -> impl Iterator<Item = &TrialResult> {
        self.trials.iter().filter(|t| !t.pruned)
    }

    pub fn n_pruned(&self) -> usize {
        self.trials.iter().filter(|t| t.pruned).count()
    }

    /// Add a trial result.
    ///
    /// The best trial only changes on a strict improvement, so the earliest
    /// trial reaching the optimum is kept.
    pub fn add_trial(&mut self, result: TrialResult) {
        let idx = self.trials.len();

        let is_better = match (result.value, self.best_value()) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(value), Some(best_val)) => match self.direction {
                OptimizeDirection::Minimize => value < best_val,
                OptimizeDirection::Maximize => value > best_val,
            },
        };

        if is_better {
            self.best_trial_idx = Some(idx);
        }

        self.trials.push(result);
    }
}

/// Main hyperparameter optimizer
pub struct HyperOptX {
    config: OptimizationConfig,
    search_space: SearchSpace,
    sampler: Box<dyn Sampler>,
    study: Study,
}

impl HyperOptX {
    /// Create a new optimizer
    pub fn new(config: OptimizationConfig, search_space: SearchSpace) -> Self {
        let sampler = create_sampler(
            config.sampler,
            config.random_state,
            config.direction,
            config.n_startup_trials,
        );
        let study = Study::new(config.direction);

        Self {
            config,
            search_space,
            sampler,
            study,
        }
    }

    /// Run optimization with an objective function.
    ///
    /// A failing objective marks the trial as pruned and the search goes on.
    /// Fails with `OptimizationError` when no trial completes.
    pub fn optimize<F>(&mut self, objective: F) -> Result<&Study>
    where
        F: Fn(&TrialParams) -> Result<f64>,
    {
        self.search_space.validate()?;

        let start = Instant::now();
        let mut history: Vec<(TrialParams, f64)> = Vec::new();

        for trial_id in 0..self.config.n_trials {
            let trial_start = Instant::now();
            let params = self.sampler.sample(&self.search_space, &history);

            let outcome = objective(&params).and_then(|value| {
                if value.is_finite() {
                    Ok(value)
                } else {
                    Err(PipelineError::ComputationError(format!(
                        "objective returned {}",
                        value
                    )))
                }
            });

            let result = match outcome {
                Ok(value) => {
                    history.push((params.clone(), value));
                    TrialResult {
                        trial_id,
                        params,
                        value: Some(value),
                        duration_secs: trial_start.elapsed().as_secs_f64(),
                        pruned: false,
                        error: None,
                    }
                }
                Err(e) => {
                    warn!(trial = trial_id, error = %e, "Trial failed, marked as pruned");
                    TrialResult {
                        trial_id,
                        params,
                        value: None,
                        duration_secs: trial_start.elapsed().as_secs_f64(),
                        pruned: true,
                        error: Some(e.to_string()),
                    }
                }
            };

            debug!(
                trial = trial_id,
                value = ?result.value,
                pruned = result.pruned,
                params = ?result.params,
                best = ?self.study.best_value(),
                "Trial finished"
            );

            self.study.add_trial(result);
        }

        self.study.total_duration_secs = start.elapsed().as_secs_f64();

        if self.study.best_trial_idx.is_none() {
            return Err(PipelineError::OptimizationError(format!(
                "all {} trials failed",
                self.study.trials.len()
            )));
        }

        Ok(&self.study)
    }

    /// Get the study results
    pub fn study(&self) -> &Study {
        &self.study
    }

    /// Consume the optimizer and return its study
    pub fn into_study(self) -> Study {
        self.study
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::SamplerType;

    fn quadratic_objective(params: &TrialParams) -> Result<f64> {
        let x = params.get("x").and_then(|p| p.as_float()).unwrap_or(0.0);
        let y = params.get("y").and_then(|p| p.as_float()).unwrap_or(0.0);
        Ok(x * x + y * y)
    }

    #[test]
    fn test_optimization() {
        let config = OptimizationConfig::new()
            .with_n_trials(20)
            .with_direction(OptimizeDirection::Minimize);
        let space = SearchSpace::new().float("x", -5.0, 5.0).float("y", -5.0, 5.0);

        let mut optimizer = HyperOptX::new(config, space);
        let study = optimizer.optimize(quadratic_objective).unwrap();

        assert_eq!(study.trials.len(), 20);
        assert!(study.best_value().unwrap() < 25.0);
    }

    #[test]
    fn test_runs_exact_budget_on_flat_objective() {
        let config = OptimizationConfig::new().with_n_trials(12);
        let space = SearchSpace::new().float("x", 0.0, 1.0);

        let mut optimizer = HyperOptX::new(config, space);
        let study = optimizer.optimize(|_| Ok(1.0)).unwrap();
        assert_eq!(study.trials.len(), 12);
    }

    #[test]
    fn test_first_maximum_wins() {
        let config = OptimizationConfig::new()
            .with_n_trials(10)
            .with_sampler(SamplerType::Random);
        let space = SearchSpace::new().float("x", 0.0, 1.0);

        let mut optimizer = HyperOptX::new(config, space);
        let study = optimizer.optimize(|_| Ok(-3.0)).unwrap();
        assert_eq!(study.best_trial().unwrap().trial_id, 0);
    }

    #[test]
    fn test_failed_trials_are_pruned() {
        let config = OptimizationConfig::new()
            .with_n_trials(30)
            .with_sampler(SamplerType::Random);
        let space = SearchSpace::new().categorical("model", vec!["good", "bad"]);

        let mut optimizer = HyperOptX::new(config, space);
        let study = optimizer
            .optimize(|p| match p["model"].as_string() {
                Some("good") => Ok(1.0),
                _ => Err(PipelineError::ComputationError("diverged".into())),
            })
            .unwrap();

        assert!(study.n_pruned() > 0);
        assert_eq!(study.best_params().unwrap()["model"].as_string(), Some("good"));
        assert!(study
            .trials
            .iter()
            .filter(|t| t.pruned)
            .all(|t| t.error.is_some() && t.value.is_none()));
    }

    #[test]
    fn test_study_with_pruned_trials_round_trips_through_json() {
        let config = OptimizationConfig::new()
            .with_n_trials(6)
            .with_sampler(SamplerType::Random);
        let space = SearchSpace::new().float("x", 0.0, 1.0);

        let mut optimizer = HyperOptX::new(config, space);
        optimizer
            .optimize(|p| match p["x"].as_float() {
                Some(x) if x < 0.5 => Ok(x),
                _ => Err(PipelineError::ComputationError("diverged".into())),
            })
            .ok();
        let study = optimizer.into_study();

        let json = serde_json::to_string(&study).unwrap();
        let restored: Study = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.trials.len(), 6);
        assert_eq!(restored.n_pruned(), study.n_pruned());
        assert_eq!(restored.best_trial_idx, study.best_trial_idx);
        for (a, b) in study.trials.iter().zip(restored.trials.iter()) {
            match (a.value, b.value) {
                (Some(x), Some(y)) => assert!((x - y).abs() < 1e-12),
                (None, None) => assert!(b.pruned),
                _ => panic!("trial {} changed state", a.trial_id),
            }
        }
    }

    #[test]
    fn test_pruned_trial_never_becomes_best() {
        let mut study = Study::new(OptimizeDirection::Minimize);
        study.add_trial(TrialResult {
            trial_id: 0,
            params: TrialParams::new(),
            value: None,
            duration_secs: 0.0,
            pruned: true,
            error: Some("diverged".into()),
        });
        assert!(study.best_trial().is_none());

        study.add_trial(TrialResult {
            trial_id: 1,
            params: TrialParams::new(),
            value: Some(3.0),
            duration_secs: 0.0,
            pruned: false,
            error: None,
        });
        assert_eq!(study.best_value(), Some(3.0));
    }

    #[test]
    fn test_all_trials_failing() {
        let config = OptimizationConfig::new().with_n_trials(4);
        let space = SearchSpace::new().float("x", 0.0, 1.0);

        let mut optimizer = HyperOptX::new(config, space);
        let err = optimizer
            .optimize(|_| Err(PipelineError::ComputationError("nope".into())))
            .unwrap_err();
        assert!(matches!(err, PipelineError::OptimizationError(_)));
        assert_eq!(optimizer.study().n_pruned(), 4);
    }

    #[test]
    fn test_non_finite_objective_is_pruned() {
        let config = OptimizationConfig::new().with_n_trials(3);
        let space = SearchSpace::new().float("x", 0.0, 1.0);

        let mut optimizer = HyperOptX::new(config, space);
        assert!(optimizer.optimize(|_| Ok(f64::NAN)).is_err());
    }
}
