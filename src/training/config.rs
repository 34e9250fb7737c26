//! Model configuration

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Model family explored by the search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelFamily {
    /// Ordinary least squares
    Linear,
    /// Bagged regression trees
    RandomForest,
}

impl ModelFamily {
    /// Every family, in search order
    pub const ALL: [ModelFamily; 2] = [ModelFamily::Linear, ModelFamily::RandomForest];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::Linear => "linear",
            ModelFamily::RandomForest => "random-forest",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelFamily {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linear" => Ok(ModelFamily::Linear),
            "random-forest" | "rf" => Ok(ModelFamily::RandomForest),
            other => Err(PipelineError::InvalidParameter {
                name: "model".to_string(),
                value: other.to_string(),
                reason: "expected 'linear' or 'random-forest'".to_string(),
            }),
        }
    }
}

/// An untrained model: family plus hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "kebab-case")]
pub enum ModelConfiguration {
    Linear,
    RandomForest {
        n_estimators: usize,
        max_depth: usize,
        random_state: u64,
    },
}

impl ModelConfiguration {
    pub fn family(&self) -> ModelFamily {
        match self {
            ModelConfiguration::Linear => ModelFamily::Linear,
            ModelConfiguration::RandomForest { .. } => ModelFamily::RandomForest,
        }
    }

    /// Reject hyperparameters no estimator can be built from
    pub fn validate(&self) -> Result<()> {
        if let ModelConfiguration::RandomForest { n_estimators, max_depth, .. } = self {
            if *n_estimators == 0 {
                return Err(PipelineError::InvalidParameter {
                    name: "n_estimators".to_string(),
                    value: n_estimators.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
            if *max_depth == 0 {
                return Err(PipelineError::InvalidParameter {
                    name: "max_depth".to_string(),
                    value: max_depth.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for ModelConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelConfiguration::Linear => write!(f, "linear"),
            ModelConfiguration::RandomForest { n_estimators, max_depth, random_state } => write!(
                f,
                "random-forest(n_estimators={}, max_depth={}, random_state={})",
                n_estimators, max_depth, random_state
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_round_trip_names() {
        for family in ModelFamily::ALL {
            assert_eq!(family.as_str().parse::<ModelFamily>().unwrap(), family);
        }
        assert!("svm".parse::<ModelFamily>().is_err());
    }

    #[test]
    fn test_configuration_serde_tag() {
        let cfg = ModelConfiguration::RandomForest {
            n_estimators: 120,
            max_depth: 7,
            random_state: 42,
        };
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["model"], "random-forest");
        assert_eq!(json["n_estimators"], 120);

        let linear = serde_json::to_value(ModelConfiguration::Linear).unwrap();
        assert_eq!(linear["model"], "linear");
    }

    #[test]
    fn test_validate() {
        assert!(ModelConfiguration::Linear.validate().is_ok());
        let bad = ModelConfiguration::RandomForest {
            n_estimators: 0,
            max_depth: 3,
            random_state: 42,
        };
        assert!(matches!(bad.validate(), Err(PipelineError::InvalidParameter { .. })));
    }
}
