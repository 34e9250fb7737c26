//! Search space definition for hyperparameters

use crate::error::{PipelineError, Result};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Type of parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterType {
    /// Continuous float parameter
    Float { low: f64, high: f64, log_scale: bool },
    /// Integer parameter, both bounds inclusive
    Int { low: i64, high: i64 },
    /// Categorical parameter
    Categorical { choices: Vec<String> },
}

/// Makes a parameter active only when a categorical parent took a given value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub parent: String,
    pub equals: String,
}

/// A single hyperparameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub param_type: ParameterType,
    pub condition: Option<Condition>,
}

impl Parameter {
    /// Create a float parameter
    pub fn float(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self::unconditional(name, ParameterType::Float { low, high, log_scale: false })
    }

    /// Create a log-scale float parameter
    pub fn log_float(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self::unconditional(name, ParameterType::Float { low, high, log_scale: true })
    }

    /// Create an integer parameter
    pub fn int(name: impl Into<String>, low: i64, high: i64) -> Self {
        Self::unconditional(name, ParameterType::Int { low, high })
    }

    /// Create a categorical parameter
    pub fn categorical(name: impl Into<String>, choices: Vec<&str>) -> Self {
        Self::unconditional(
            name,
            ParameterType::Categorical {
                choices: choices.into_iter().map(String::from).collect(),
            },
        )
    }

    fn unconditional(name: impl Into<String>, param_type: ParameterType) -> Self {
        Self {
            name: name.into(),
            param_type,
            condition: None,
        }
    }

    /// Only sample this parameter when `parent == value`
    pub fn when(mut self, parent: impl Into<String>, value: impl Into<String>) -> Self {
        self.condition = Some(Condition {
            parent: parent.into(),
            equals: value.into(),
        });
        self
    }

    /// Whether the parameter applies given the values sampled so far
    pub fn is_active(&self, params: &TrialParams) -> bool {
        match &self.condition {
            None => true,
            Some(c) => params
                .get(&c.parent)
                .and_then(ParameterValue::as_string)
                .map_or(false, |v| v == c.equals),
        }
    }

    /// Sample a random value
    pub fn sample(&self, rng: &mut impl Rng) -> ParameterValue {
        match &self.param_type {
            ParameterType::Float { low, high, log_scale } => {
                let val = if *log_scale {
                    let log_low = low.ln();
                    let log_high = high.ln();
                    (rng.gen::<f64>() * (log_high - log_low) + log_low).exp()
                } else {
                    rng.gen::<f64>() * (high - low) + low
                };
                ParameterValue::Float(val)
            }
            ParameterType::Int { low, high } => ParameterValue::Int(rng.gen_range(*low..=*high)),
            ParameterType::Categorical { choices } => {
                let idx = rng.gen_range(0..choices.len());
                ParameterValue::String(choices[idx].clone())
            }
        }
    }

    /// Whether `value` lies in this parameter's domain
    pub fn contains(&self, value: &ParameterValue) -> bool {
        match (&self.param_type, value) {
            (ParameterType::Float { low, high, .. }, ParameterValue::Float(v)) => v >= low && v <= high,
            (ParameterType::Int { low, high }, ParameterValue::Int(v)) => v >= low && v <= high,
            (ParameterType::Categorical { choices }, ParameterValue::String(v)) => choices.contains(v),
            _ => false,
        }
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| PipelineError::InvalidParameter {
            name: self.name.clone(),
            value: format!("{:?}", self.param_type),
            reason: reason.to_string(),
        };
        match &self.param_type {
            ParameterType::Float { low, high, log_scale } => {
                if !(low < high) {
                    return Err(invalid("low must be below high"));
                }
                if *log_scale && *low <= 0.0 {
                    return Err(invalid("log scale needs a positive lower bound"));
                }
            }
            ParameterType::Int { low, high } => {
                if low > high {
                    return Err(invalid("low must not exceed high"));
                }
            }
            ParameterType::Categorical { choices } => {
                if choices.is_empty() {
                    return Err(invalid("no choices"));
                }
            }
        }
        Ok(())
    }
}

/// Sampled parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Int(i64),
    Float(f64),
    String(String),
}

impl ParameterValue {
    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParameterValue::Float(v) => Some(*v),
            ParameterValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Get as int
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParameterValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            ParameterValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Int(v) => write!(f, "{}", v),
            ParameterValue::Float(v) => write!(f, "{}", v),
            ParameterValue::String(v) => f.write_str(v),
        }
    }
}

/// Sampled configuration, keyed by parameter name.
///
/// Ordered so iteration (and therefore sampling) is deterministic.
pub type TrialParams = BTreeMap<String, ParameterValue>;

/// Search space for hyperparameter optimization.
///
/// Parameters are sampled in declaration order, so a conditional parameter
/// must be declared after its parent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchSpace {
    parameters: Vec<Parameter>,
}

impl SearchSpace {
    /// Create a new empty search space
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter to the search space
    pub fn add(mut self, param: Parameter) -> Self {
        self.parameters.push(param);
        self
    }

    /// Add a float parameter
    pub fn float(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.add(Parameter::float(name, low, high))
    }

    /// Add an integer parameter
    pub fn int(self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.add(Parameter::int(name, low, high))
    }

    /// Add a categorical parameter
    pub fn categorical(self, name: impl Into<String>, choices: Vec<&str>) -> Self {
        self.add(Parameter::categorical(name, choices))
    }

    /// Get all parameters
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Sample a random configuration, skipping inactive conditional parameters
    pub fn sample(&self, rng: &mut impl Rng) -> TrialParams {
        let mut params = TrialParams::new();
        for p in &self.parameters {
            if p.is_active(&params) {
                let value = p.sample(rng);
                params.insert(p.name.clone(), value);
            }
        }
        params
    }

    /// Check bounds, names and the order of conditional parameters
    pub fn validate(&self) -> Result<()> {
        if self.parameters.is_empty() {
            return Err(PipelineError::OptimizationError("search space is empty".to_string()));
        }
        for (i, p) in self.parameters.iter().enumerate() {
            p.validate()?;
            let earlier = &self.parameters[..i];
            if earlier.iter().any(|q| q.name == p.name) {
                return Err(PipelineError::OptimizationError(format!(
                    "parameter '{}' declared twice",
                    p.name
                )));
            }
            if let Some(c) = &p.condition {
                let parent_ok = earlier.iter().any(|q| {
                    q.name == c.parent
                        && matches!(&q.param_type, ParameterType::Categorical { choices } if choices.contains(&c.equals))
                });
                if !parent_ok {
                    return Err(PipelineError::OptimizationError(format!(
                        "parameter '{}' depends on '{}={}', which is not an earlier categorical choice",
                        p.name, c.parent, c.equals
                    )));
                }
            }
        }
        Ok(())
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Get parameter names in order
    pub fn param_names(&self) -> Vec<String> {
        self.parameters.iter().map(|p| p.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn conditional_space() -> SearchSpace {
        SearchSpace::new()
            .categorical("model", vec!["linear", "random-forest"])
            .add(Parameter::int("n_estimators", 50, 300).when("model", "random-forest"))
            .add(Parameter::int("max_depth", 3, 20).when("model", "random-forest"))
    }

    #[test]
    fn test_search_space_builder() {
        let space = SearchSpace::new()
            .float("learning_rate", 0.001, 0.1)
            .int("n_estimators", 10, 1000)
            .categorical("model", vec!["rf", "gbm", "linear"]);

        assert_eq!(space.len(), 3);
        assert!(space.validate().is_ok());
    }

    #[test]
    fn test_log_scale_sampling() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let param = Parameter::log_float("lr", 0.0001, 0.1);

        for _ in 0..100 {
            let v = param.sample(&mut rng).as_float().unwrap();
            assert!((0.0001..=0.1).contains(&v));
        }
    }

    #[test]
    fn test_conditional_parameters() {
        let space = conditional_space();
        assert!(space.validate().is_ok());

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let mut seen_linear = false;
        let mut seen_forest = false;
        for _ in 0..50 {
            let params = space.sample(&mut rng);
            match params["model"].as_string().unwrap() {
                "linear" => {
                    seen_linear = true;
                    assert_eq!(params.len(), 1);
                }
                "random-forest" => {
                    seen_forest = true;
                    let n = params["n_estimators"].as_int().unwrap();
                    let d = params["max_depth"].as_int().unwrap();
                    assert!((50..=300).contains(&n));
                    assert!((3..=20).contains(&d));
                }
                other => panic!("unexpected model {other}"),
            }
        }
        assert!(seen_linear && seen_forest);
    }

    #[test]
    fn test_condition_must_follow_parent() {
        let space = SearchSpace::new()
            .add(Parameter::int("max_depth", 3, 20).when("model", "random-forest"))
            .categorical("model", vec!["linear", "random-forest"]);
        assert!(matches!(space.validate(), Err(PipelineError::OptimizationError(_))));
    }

    #[test]
    fn test_sampling_is_seeded() {
        let space = conditional_space();
        let a = space.sample(&mut Xoshiro256PlusPlus::seed_from_u64(11));
        let b = space.sample(&mut Xoshiro256PlusPlus::seed_from_u64(11));
        assert_eq!(a, b);
    }
}
