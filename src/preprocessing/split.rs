//! Seeded train/test partitioning

use super::config::DatasetSchema;
use super::numeric_values;
use crate::error::{PipelineError, Result};
use ndarray::Array1;
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

/// Two disjoint halves of a dataset
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    /// Feature columns of the training rows
    pub x_train: DataFrame,
    /// Feature columns of the held-out rows
    pub x_test: DataFrame,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
    /// Source row positions of the training half
    pub train_indices: Vec<usize>,
    /// Source row positions of the test half
    pub test_indices: Vec<usize>,
}

impl TrainTestSplit {
    pub fn n_train(&self) -> usize {
        self.train_indices.len()
    }

    pub fn n_test(&self) -> usize {
        self.test_indices.len()
    }
}

/// Shuffle row positions with `seed` and cut off the first `ceil(n * test_fraction)` as test.
pub fn train_test_split(
    frame: &DataFrame,
    schema: &DatasetSchema,
    test_fraction: f64,
    seed: u64,
) -> Result<TrainTestSplit> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(PipelineError::InvalidParameter {
            name: "test_fraction".to_string(),
            value: test_fraction.to_string(),
            reason: "must be strictly between 0 and 1".to_string(),
        });
    }

    schema.check_columns(frame)?;

    let n = frame.height();
    let n_test = (n as f64 * test_fraction).ceil() as usize;
    let n_train = n.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(PipelineError::InvalidParameter {
            name: "test_fraction".to_string(),
            value: test_fraction.to_string(),
            reason: format!("{} rows leave an empty train or test half", n),
        });
    }

    let y = numeric_values(frame, &schema.target)?;
    for col in &schema.numeric_features {
        numeric_values(frame, col)?;
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut rng);

    let test_indices = order[..n_test].to_vec();
    let train_indices = order[n_test..].to_vec();

    let features = frame.select(schema.feature_columns())?;
    let x_train = take_rows(&features, &train_indices)?;
    let x_test = take_rows(&features, &test_indices)?;

    let y_train: Array1<f64> = train_indices.iter().map(|&i| y[i]).collect();
    let y_test: Array1<f64> = test_indices.iter().map(|&i| y[i]).collect();

    info!(
        rows = n,
        train = n_train,
        test = n_test,
        seed,
        "Dataset split"
    );

    Ok(TrainTestSplit {
        x_train,
        x_test,
        y_train,
        y_test,
        train_indices,
        test_indices,
    })
}

fn take_rows(frame: &DataFrame, rows: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec(
        "idx".into(),
        rows.iter().map(|&i| i as IdxSize).collect(),
    );
    Ok(frame.take(&idx)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(n: usize) -> DataFrame {
        let age: Vec<i64> = (0..n as i64).map(|i| 20 + i).collect();
        let bmi: Vec<f64> = (0..n).map(|i| 20.0 + i as f64 * 0.5).collect();
        let children: Vec<i64> = (0..n as i64).map(|i| i % 4).collect();
        let sex: Vec<&str> = (0..n).map(|i| if i % 2 == 0 { "female" } else { "male" }).collect();
        let smoker: Vec<&str> = (0..n).map(|i| if i % 3 == 0 { "yes" } else { "no" }).collect();
        let region: Vec<&str> = (0..n).map(|i| ["northeast", "southwest"][i % 2]).collect();
        let charges: Vec<f64> = (0..n).map(|i| 1000.0 + i as f64).collect();

        df! {
            "age" => age,
            "sex" => sex,
            "bmi" => bmi,
            "children" => children,
            "smoker" => smoker,
            "region" => region,
            "charges" => charges,
        }
        .unwrap()
    }

    #[test]
    fn test_split_sizes_and_disjoint() {
        let split = train_test_split(&frame(10), &DatasetSchema::insurance(), 0.2, 34).unwrap();

        assert_eq!(split.n_train(), 8);
        assert_eq!(split.n_test(), 2);
        assert_eq!(split.x_train.height(), 8);
        assert_eq!(split.y_test.len(), 2);

        let mut all: Vec<usize> = split
            .train_indices
            .iter()
            .chain(split.test_indices.iter())
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_keeps_feature_columns_only() {
        let split = train_test_split(&frame(10), &DatasetSchema::insurance(), 0.2, 34).unwrap();
        let names: Vec<String> = split
            .x_train
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["age", "bmi", "children", "sex", "smoker", "region"]);
    }

    #[test]
    fn test_split_is_deterministic() {
        let df = frame(25);
        let a = train_test_split(&df, &DatasetSchema::insurance(), 0.2, 7).unwrap();
        let b = train_test_split(&df, &DatasetSchema::insurance(), 0.2, 7).unwrap();
        assert_eq!(a.test_indices, b.test_indices);
        assert_eq!(a.y_train, b.y_train);
    }

    #[test]
    fn test_targets_follow_rows() {
        let split = train_test_split(&frame(12), &DatasetSchema::insurance(), 0.25, 1).unwrap();
        for (pos, &row) in split.test_indices.iter().enumerate() {
            assert_eq!(split.y_test[pos], 1000.0 + row as f64);
        }
    }

    #[test]
    fn test_test_half_rounds_up() {
        let split = train_test_split(&frame(11), &DatasetSchema::insurance(), 0.2, 34).unwrap();
        assert_eq!(split.n_test(), 3);
        assert_eq!(split.n_train(), 8);
    }

    #[test]
    fn test_invalid_fraction() {
        let df = frame(10);
        for bad in [0.0, 1.0, -0.1, f64::NAN] {
            let err = train_test_split(&df, &DatasetSchema::insurance(), bad, 34).unwrap_err();
            assert!(matches!(err, PipelineError::InvalidParameter { .. }));
        }
    }

    #[test]
    fn test_single_row_cannot_split() {
        let err = train_test_split(&frame(1), &DatasetSchema::insurance(), 0.2, 34).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidParameter { .. }));
    }

    #[test]
    fn test_missing_target_column() {
        let df = frame(10).drop("charges").unwrap();
        let err = train_test_split(&df, &DatasetSchema::insurance(), 0.2, 34).unwrap_err();
        assert!(matches!(err, PipelineError::FeatureNotFound(name) if name == "charges"));
    }

    #[test]
    fn test_null_target_is_data_error() {
        let df = df! {
            "age" => [20i64, 21, 22, 23, 24],
            "sex" => ["female", "male", "female", "male", "female"],
            "bmi" => [20.0, 21.0, 22.0, 23.0, 24.0],
            "children" => [0i64, 1, 2, 0, 1],
            "smoker" => ["no", "yes", "no", "no", "yes"],
            "region" => ["northeast", "southwest", "northeast", "southwest", "northeast"],
            "charges" => [Some(1000.0), None, Some(1200.0), Some(1300.0), Some(1400.0)],
        }
        .unwrap();

        let err = train_test_split(&df, &DatasetSchema::insurance(), 0.2, 34).unwrap_err();
        assert!(matches!(err, PipelineError::DataError(_)));
    }
}
