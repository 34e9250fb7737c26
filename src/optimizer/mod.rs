//! Hyperparameter optimization module (HyperOptX)
//!
//! Provides the model selection stage:
//! - Search spaces with conditional parameters
//! - Tree-structured Parzen Estimators (TPE) and random search
//! - A study that records every trial, pruning the ones that fail
//! - `ModelSelector`, which scores candidates by k-fold cross-validation

mod config;
mod optimizer;
mod samplers;
mod search_space;
pub mod selector;

pub use config::{OptimizationConfig, OptimizeDirection};
pub use optimizer::{HyperOptX, Study, TrialResult};
pub use samplers::{create_sampler, RandomSampler, Sampler, SamplerType, TPESampler};
pub use search_space::{Condition, Parameter, ParameterType, ParameterValue, SearchSpace, TrialParams};
pub use selector::{ModelSelection, ModelSelector};
