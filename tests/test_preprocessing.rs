//! Integration test: loading and preprocessing an insurance table

mod common;

use insurance_pipeline::prelude::*;
use std::collections::HashSet;

#[test]
fn test_split_partitions_all_rows() {
    let file = common::insurance_file(50);
    let dataset = DataLoader::new().load(file.path()).unwrap();

    let split = Preprocessor::default().split(&dataset).unwrap();
    assert_eq!(split.n_test(), 10);
    assert_eq!(split.n_train(), 40);
    assert_eq!(split.y_train.len(), 40);
    assert_eq!(split.x_test.height(), 10);

    let train: HashSet<usize> = split.train_indices.iter().copied().collect();
    let test: HashSet<usize> = split.test_indices.iter().copied().collect();
    assert!(train.is_disjoint(&test));
    assert_eq!(train.len() + test.len(), 50);
}

#[test]
fn test_split_depends_only_on_seed() {
    let file = common::insurance_file(30);
    let dataset = DataLoader::new().load(file.path()).unwrap();

    let a = Preprocessor::default().with_seed(7).split(&dataset).unwrap();
    let b = Preprocessor::default().with_seed(7).split(&dataset).unwrap();
    let c = Preprocessor::default().with_seed(8).split(&dataset).unwrap();

    assert_eq!(a.test_indices, b.test_indices);
    assert_eq!(a.y_test, b.y_test);
    assert_ne!(a.test_indices, c.test_indices);
}

#[test]
fn test_transformed_features() {
    let file = common::insurance_file(60);
    let dataset = DataLoader::new().load(file.path()).unwrap();

    let mut preprocessor = Preprocessor::default();
    let split = preprocessor.split(&dataset).unwrap();
    preprocessor.build_pipeline();
    let (x_train, x_test) = preprocessor.fit_transform(&split.x_train, &split.x_test).unwrap();

    let names = preprocessor.feature_names().unwrap();
    assert_eq!(x_train.ncols(), names.len());
    assert_eq!(x_test.ncols(), names.len());
    assert_eq!(&names[..3], &["age", "bmi", "children"]);
    assert!(names.contains(&"smoker_yes".to_string()));

    // numeric block is standardized on the training half
    for j in 0..3 {
        let column = x_train.column(j);
        let mean = column.sum() / column.len() as f64;
        assert!(mean.abs() < 1e-9, "column {} mean {}", j, mean);
    }

    // every categorical group of a training row has exactly one hot entry
    let one_hot = x_train.slice(ndarray::s![.., 3..]);
    for row in one_hot.rows() {
        assert_eq!(row.sum(), 3.0);
    }
}

#[test]
fn test_fit_transform_requires_build() {
    let file = common::insurance_file(20);
    let dataset = DataLoader::new().load(file.path()).unwrap();

    let mut preprocessor = Preprocessor::default();
    let split = preprocessor.split(&dataset).unwrap();
    let err = preprocessor
        .fit_transform(&split.x_train, &split.x_test)
        .unwrap_err();
    assert!(matches!(err, PipelineError::NotFitted));
}

#[test]
fn test_extra_columns_are_ignored() {
    let csv: String = common::insurance_csv(20)
        .lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                format!("{},policy_id\n", line)
            } else {
                format!("{},P{:04}\n", line, i)
            }
        })
        .collect();
    let file = common::write_csv(&csv);
    let dataset = DataLoader::new().load(file.path()).unwrap();
    assert_eq!(dataset.n_cols(), 8);

    let split = Preprocessor::default().split(&dataset).unwrap();
    assert_eq!(split.x_train.width(), 6);
}

#[test]
fn test_null_target_is_data_error() {
    let mut csv = common::insurance_csv(10);
    csv.push_str("40,male,30.00,1,no,northeast,\n");
    let file = common::write_csv(&csv);
    let dataset = DataLoader::new().load(file.path()).unwrap();

    let err = Preprocessor::default().split(&dataset).unwrap_err();
    assert!(matches!(err, PipelineError::DataError(_)));
}

#[test]
fn test_header_only_file_fails_to_load() {
    let file = common::write_csv("age,sex,bmi,children,smoker,region,charges\n");
    let err = DataLoader::new().load(file.path()).unwrap_err();
    assert!(matches!(err, PipelineError::Load { .. }));
}

#[test]
fn test_late_decimal_target_still_splits() {
    let csv: String = common::insurance_csv(151)
        .lines()
        .enumerate()
        .map(|(i, line)| {
            let (head, charges) = line.rsplit_once(',').unwrap();
            match i {
                0 => format!("{}\n", line),
                151 => format!("{},1234.56\n", head),
                // integral charges for every earlier row
                _ => format!("{},{}\n", head, charges.split('.').next().unwrap()),
            }
        })
        .collect();
    let file = common::write_csv(&csv);
    let dataset = DataLoader::new().load(file.path()).unwrap();
    assert_eq!(dataset.n_rows(), 151);

    let split = Preprocessor::default().split(&dataset).unwrap();
    assert_eq!(split.n_train() + split.n_test(), 151);
    let targets: Vec<f64> = split.y_train.iter().chain(split.y_test.iter()).copied().collect();
    assert!(targets.iter().any(|v| (v - 1234.56).abs() < 1e-9));
}
