//! Model training module
//!
//! Provides the estimators the model search chooses between:
//! - Ordinary least squares linear regression
//! - Regression trees and random forests
//! - K-fold cross-validation

mod config;
mod engine;
mod models;
pub mod cross_validation;
pub mod decision_tree;
pub mod linear_models;
pub mod random_forest;

pub use config::{ModelConfiguration, ModelFamily};
pub use cross_validation::{CVResults, CVSplit, CrossValidator};
pub use decision_tree::{DecisionTree, TreeNode};
pub use engine::{Estimator, ModelTrainer, TrainedModel};
pub use linear_models::LinearRegression;
pub use models::Regressor;
pub use random_forest::RandomForest;
