//! Optimization configuration

use super::samplers::SamplerType;
use serde::{Deserialize, Serialize};

/// Direction of optimization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizeDirection {
    Minimize,
    Maximize,
}

/// Configuration for hyperparameter optimization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationConfig {
    /// Number of trials to run
    pub n_trials: usize,

    /// Optimization direction
    pub direction: OptimizeDirection,

    /// Sampler type
    pub sampler: SamplerType,

    /// Number of initial random samples before optimization
    pub n_startup_trials: usize,

    /// Random seed
    pub random_state: u64,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            n_trials: 30,
            direction: OptimizeDirection::Maximize,
            sampler: SamplerType::Tpe,
            n_startup_trials: 10,
            random_state: 42,
        }
    }
}

impl OptimizationConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set number of trials
    pub fn with_n_trials(mut self, n: usize) -> Self {
        self.n_trials = n;
        self
    }

    /// Builder method to set direction
    pub fn with_direction(mut self, direction: OptimizeDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Builder method to set sampler
    pub fn with_sampler(mut self, sampler: SamplerType) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn with_n_startup_trials(mut self, n: usize) -> Self {
        self.n_startup_trials = n;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }
}
