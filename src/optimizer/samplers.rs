//! Sampling strategies for hyperparameter optimization

use super::config::OptimizeDirection;
use super::search_space::{Parameter, ParameterType, ParameterValue, SearchSpace, TrialParams};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Type of sampler to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplerType {
    /// Random sampling
    Random,
    /// Tree-structured Parzen Estimator
    Tpe,
}

impl fmt::Display for SamplerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SamplerType::Random => "random",
            SamplerType::Tpe => "tpe",
        })
    }
}

impl FromStr for SamplerType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(SamplerType::Random),
            "tpe" => Ok(SamplerType::Tpe),
            other => Err(format!("unknown sampler '{}', expected 'tpe' or 'random'", other)),
        }
    }
}

/// Trait for hyperparameter samplers
pub trait Sampler: Send + Sync {
    /// Sample the next set of hyperparameters given completed `(params, value)` trials
    fn sample(&mut self, search_space: &SearchSpace, history: &[(TrialParams, f64)]) -> TrialParams;
}

/// Create a sampler from its type
pub fn create_sampler(
    sampler_type: SamplerType,
    seed: u64,
    direction: OptimizeDirection,
    n_startup_trials: usize,
) -> Box<dyn Sampler> {
    match sampler_type {
        SamplerType::Random => Box::new(RandomSampler::new(seed)),
        SamplerType::Tpe => Box::new(
            TPESampler::new(seed)
                .with_direction(direction)
                .with_n_startup(n_startup_trials),
        ),
    }
}

/// Random sampler
#[derive(Debug)]
pub struct RandomSampler {
    rng: Xoshiro256PlusPlus,
}

impl RandomSampler {
    /// Create a new random sampler
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }
}

impl Sampler for RandomSampler {
    fn sample(&mut self, search_space: &SearchSpace, _history: &[(TrialParams, f64)]) -> TrialParams {
        search_space.sample(&mut self.rng)
    }
}

/// Fraction of completed trials treated as good
const GAMMA: f64 = 0.25;
/// Draws from the good density scored per parameter
const N_CANDIDATES: usize = 24;

/// Tree-structured Parzen Estimator sampler.
///
/// After the startup trials, each parameter is proposed independently: the
/// completed trials that used it are split into a good set (top `GAMMA`
/// fraction) and a bad set, a density is fitted to each, and of
/// `N_CANDIDATES` draws from the good density the one maximising
/// `l(x) / g(x)` is kept.
#[derive(Debug)]
pub struct TPESampler {
    rng: Xoshiro256PlusPlus,
    direction: OptimizeDirection,
    n_startup_trials: usize,
}

impl TPESampler {
    /// Create a new TPE sampler
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            direction: OptimizeDirection::Minimize,
            n_startup_trials: 10,
        }
    }

    /// Set number of startup trials
    pub fn with_n_startup(mut self, n: usize) -> Self {
        self.n_startup_trials = n;
        self
    }

    pub fn with_direction(mut self, direction: OptimizeDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Observations of `name`, best first, split into (good, bad)
    fn split_observations<'a>(
        &self,
        name: &str,
        history: &'a [(TrialParams, f64)],
    ) -> (Vec<&'a ParameterValue>, Vec<&'a ParameterValue>) {
        let mut observed: Vec<(&ParameterValue, f64)> = history
            .iter()
            .filter_map(|(p, v)| p.get(name).map(|pv| (pv, *v)))
            .collect();

        // stable sort keeps trial order among equal scores
        observed.sort_by(|a, b| match self.direction {
            OptimizeDirection::Maximize => b.1.total_cmp(&a.1),
            OptimizeDirection::Minimize => a.1.total_cmp(&b.1),
        });

        let n_good = ((observed.len() as f64 * GAMMA).ceil() as usize).max(1);
        let n_good = n_good.min(observed.len());
        let bad = observed.split_off(n_good);
        (
            observed.into_iter().map(|o| o.0).collect(),
            bad.into_iter().map(|o| o.0).collect(),
        )
    }

    fn propose(&mut self, param: &Parameter, history: &[(TrialParams, f64)]) -> ParameterValue {
        let (good, bad) = self.split_observations(&param.name, history);
        if good.is_empty() {
            return param.sample(&mut self.rng);
        }

        match &param.param_type {
            ParameterType::Categorical { choices } => self.propose_categorical(choices, &good, &bad),
            ParameterType::Int { low, high } => {
                let to_f = |v: &&ParameterValue| v.as_float();
                let good: Vec<f64> = good.iter().filter_map(to_f).collect();
                let bad: Vec<f64> = bad.iter().filter_map(to_f).collect();
                let x = self.propose_numeric(*low as f64 - 0.5, *high as f64 + 0.5, &good, &bad);
                ParameterValue::Int((x.round() as i64).clamp(*low, *high))
            }
            ParameterType::Float { low, high, log_scale } => {
                let map = |v: f64| if *log_scale { v.ln() } else { v };
                let good: Vec<f64> = good.iter().filter_map(|v| v.as_float()).map(map).collect();
                let bad: Vec<f64> = bad.iter().filter_map(|v| v.as_float()).map(map).collect();
                let x = self.propose_numeric(map(*low), map(*high), &good, &bad);
                let x = if *log_scale { x.exp() } else { x };
                ParameterValue::Float(x.clamp(*low, *high))
            }
        }
    }

    fn propose_categorical(
        &mut self,
        choices: &[String],
        good: &[&ParameterValue],
        bad: &[&ParameterValue],
    ) -> ParameterValue {
        // Laplace-smoothed category frequencies
        let weights = |obs: &[&ParameterValue]| -> Vec<f64> {
            let total = obs.len() as f64 + choices.len() as f64;
            choices
                .iter()
                .map(|c| {
                    let hits = obs.iter().filter(|v| v.as_string() == Some(c.as_str())).count();
                    (hits as f64 + 1.0) / total
                })
                .collect()
        };
        let l = weights(good);
        let g = weights(bad);

        let mut best_idx = 0;
        let mut best_ratio = f64::NEG_INFINITY;
        for _ in 0..N_CANDIDATES {
            let idx = sample_weighted(&mut self.rng, &l);
            let ratio = l[idx] / g[idx];
            if ratio > best_ratio {
                best_ratio = ratio;
                best_idx = idx;
            }
        }
        ParameterValue::String(choices[best_idx].clone())
    }

    fn propose_numeric(&mut self, low: f64, high: f64, good: &[f64], bad: &[f64]) -> f64 {
        let l = ParzenEstimator::new(low, high, good);
        let g = ParzenEstimator::new(low, high, bad);

        let mut best = l.sample(&mut self.rng);
        let mut best_score = f64::NEG_INFINITY;
        for _ in 0..N_CANDIDATES {
            let x = l.sample(&mut self.rng);
            let score = l.log_pdf(x) - g.log_pdf(x);
            if score > best_score {
                best_score = score;
                best = x;
            }
        }
        best
    }
}

impl Sampler for TPESampler {
    fn sample(&mut self, search_space: &SearchSpace, history: &[(TrialParams, f64)]) -> TrialParams {
        // Use random sampling for startup trials
        if history.len() < self.n_startup_trials {
            return search_space.sample(&mut self.rng);
        }

        let mut params = TrialParams::new();
        for param in search_space.parameters() {
            if param.is_active(&params) {
                let value = self.propose(param, history);
                params.insert(param.name.clone(), value);
            }
        }
        params
    }
}

/// Mixture of a uniform prior and one Gaussian per observation, on `[low, high]`
struct ParzenEstimator {
    low: f64,
    high: f64,
    centers: Vec<f64>,
    bandwidth: f64,
}

impl ParzenEstimator {
    fn new(low: f64, high: f64, observations: &[f64]) -> Self {
        let range = (high - low).max(f64::EPSILON);
        let n = observations.len().max(1) as f64;
        let spread = if observations.len() > 1 {
            let mean = observations.iter().sum::<f64>() / n;
            (observations.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt()
        } else {
            range / 2.0
        };
        // Silverman's rule, floored so coincident points still spread
        let bandwidth = (1.06 * spread * n.powf(-0.2)).clamp(range / 20.0, range);
        Self {
            low,
            high,
            centers: observations.to_vec(),
            bandwidth,
        }
    }

    fn n_components(&self) -> usize {
        self.centers.len() + 1
    }

    fn sample(&self, rng: &mut impl Rng) -> f64 {
        let k = rng.gen_range(0..self.n_components());
        let x = if k == self.centers.len() {
            rng.gen_range(self.low..=self.high)
        } else {
            self.centers[k] + self.bandwidth * standard_normal(rng)
        };
        x.clamp(self.low, self.high)
    }

    fn log_pdf(&self, x: f64) -> f64 {
        let prior = 1.0 / (self.high - self.low).max(f64::EPSILON);
        let norm = 1.0 / (self.bandwidth * (2.0 * PI).sqrt());
        let kernels: f64 = self
            .centers
            .iter()
            .map(|c| {
                let z = (x - c) / self.bandwidth;
                norm * (-0.5 * z * z).exp()
            })
            .sum();
        ((prior + kernels) / self.n_components() as f64).ln()
    }
}

/// Box-Muller draw from N(0, 1)
fn standard_normal(rng: &mut impl Rng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

fn sample_weighted(rng: &mut impl Rng, weights: &[f64]) -> usize {
    let total: f64 = weights.iter().sum();
    let mut r = rng.gen::<f64>() * total;
    for (i, w) in weights.iter().enumerate() {
        if r < *w {
            return i;
        }
        r -= w;
    }
    weights.len() - 1
}
