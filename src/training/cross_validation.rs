//! Cross-validation implementations

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// K-fold splitter over rows in their given order
#[derive(Debug, Clone)]
pub struct CrossValidator {
    n_splits: usize,
}

impl Default for CrossValidator {
    fn default() -> Self {
        Self::new(5)
    }
}

impl CrossValidator {
    /// Create a new cross-validator
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    /// Generate train/test splits
    pub fn split(&self, n_samples: usize) -> Result<Vec<CVSplit>> {
        k_fold_split(n_samples, self.n_splits)
    }

    /// Score every fold in parallel.
    ///
    /// `score_fold` receives `(x_train, y_train, x_valid, y_valid)` for one
    /// fold. Scores come back in fold order; the first failing fold aborts.
    pub fn cross_validate<F>(&self, x: &Array2<f64>, y: &Array1<f64>, score_fold: F) -> Result<CVResults>
    where
        F: Fn(&Array2<f64>, &Array1<f64>, &Array2<f64>, &Array1<f64>) -> Result<f64> + Sync,
    {
        if x.nrows() != y.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }

        let splits = self.split(x.nrows())?;
        let scores = splits
            .par_iter()
            .map(|split| {
                let x_train = x.select(Axis(0), &split.train_indices);
                let y_train = y.select(Axis(0), &split.train_indices);
                let x_valid = x.select(Axis(0), &split.test_indices);
                let y_valid = y.select(Axis(0), &split.test_indices);
                score_fold(&x_train, &y_train, &x_valid, &y_valid)
            })
            .collect::<Result<Vec<f64>>>()?;

        Ok(CVResults::from_scores(scores))
    }
}

/// Contiguous folds; the first `n % k` folds get one extra sample
fn k_fold_split(n_samples: usize, n_splits: usize) -> Result<Vec<CVSplit>> {
    if n_splits < 2 {
        return Err(PipelineError::ValidationError(
            "n_splits must be at least 2".to_string(),
        ));
    }
    if n_samples < n_splits {
        return Err(PipelineError::ValidationError(format!(
            "n_samples ({}) must be >= n_splits ({})",
            n_samples, n_splits
        )));
    }

    let indices: Vec<usize> = (0..n_samples).collect();

    let base = n_samples / n_splits;
    let remainder = n_samples % n_splits;

    let mut splits = Vec::with_capacity(n_splits);
    let mut current = 0;
    for fold_idx in 0..n_splits {
        let fold_size = if fold_idx < remainder { base + 1 } else { base };
        let test_indices = indices[current..current + fold_size].to_vec();
        let train_indices = indices[..current]
            .iter()
            .chain(indices[current + fold_size..].iter())
            .copied()
            .collect();

        splits.push(CVSplit {
            train_indices,
            test_indices,
            fold_idx,
        });
        current += fold_size;
    }

    Ok(splits)
}

/// Results from cross-validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold
    pub scores: Vec<f64>,
    /// Mean score across folds
    pub mean_score: f64,
    /// Standard deviation of scores
    pub std_score: f64,
    pub n_folds: usize,
}

impl CVResults {
    /// Create CV results from fold scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len();
        let mean_score = scores.iter().sum::<f64>() / n_folds as f64;
        let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds as f64;

        Self {
            scores,
            mean_score,
            std_score: variance.sqrt(),
            n_folds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_k_fold() {
        let cv = CrossValidator::new(5);
        let splits = cv.split(100).unwrap();

        assert_eq!(splits.len(), 5);
        for split in &splits {
            assert_eq!(split.test_indices.len(), 20);
            assert_eq!(split.train_indices.len(), 80);
        }

        let mut all_test: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        all_test.sort();
        assert_eq!(all_test, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_unshuffled_folds_are_contiguous() {
        let cv = CrossValidator::default();
        let splits = cv.split(12).unwrap();

        assert_eq!(splits[0].test_indices, vec![0, 1, 2]);
        assert_eq!(splits[1].test_indices, vec![3, 4, 5]);
        assert_eq!(splits[2].test_indices, vec![6, 7]);
        assert_eq!(splits[4].test_indices, vec![10, 11]);
    }

    #[test]
    fn test_train_and_test_are_disjoint() {
        let cv = CrossValidator::new(3);
        for split in cv.split(10).unwrap() {
            assert_eq!(split.train_indices.len() + split.test_indices.len(), 10);
            assert!(split.test_indices.iter().all(|i| !split.train_indices.contains(i)));
        }
    }

    #[test]
    fn test_single_fold_rejected() {
        assert!(matches!(
            CrossValidator::new(1).split(10),
            Err(PipelineError::ValidationError(_))
        ));
    }

    #[test]
    fn test_too_few_samples() {
        let cv = CrossValidator::default();
        assert!(matches!(cv.split(3), Err(PipelineError::ValidationError(_))));
    }

    #[test]
    fn test_cross_validate_in_fold_order() {
        let x = Array2::from_shape_fn((10, 1), |(i, _)| i as f64);
        let y = Array1::from_shape_fn(10, |i| i as f64);
        let cv = CrossValidator::new(5);

        // score = first validation target, so fold order is observable
        let results = cv
            .cross_validate(&x, &y, |_, _, _, y_valid| Ok(y_valid[0]))
            .unwrap();
        assert_eq!(results.scores, vec![0.0, 2.0, 4.0, 6.0, 8.0]);
        assert!((results.mean_score - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_cross_validate_propagates_failure() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![1.0, 2.0, 3.0, 4.0];
        let cv = CrossValidator::new(2);
        let result = cv.cross_validate(&x, &y, |_, _, _, _| {
            Err(PipelineError::ComputationError("boom".into()))
        });
        assert!(result.is_err());
    }
}
