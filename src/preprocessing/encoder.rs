//! One-hot encoding of categorical columns

use super::categorical_values;
use crate::error::{PipelineError, Result};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// One-hot encoder.
///
/// Each column's vocabulary is the sorted set of non-null values seen during
/// `fit`. Values outside the vocabulary, and nulls, encode to an all-zero block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    columns: Vec<String>,
    categories: Vec<Vec<String>>,
    is_fitted: bool,
}

impl OneHotEncoder {
    /// Create an unfitted encoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn the vocabulary of each column in `columns`
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        let mut categories = Vec::with_capacity(columns.len());
        for col in columns {
            let vocab: BTreeSet<String> = categorical_values(df, col)?
                .into_iter()
                .flatten()
                .collect();
            debug!(column = %col, categories = ?vocab, "Encoder vocabulary");
            categories.push(vocab.into_iter().collect());
        }

        self.columns = columns.to_vec();
        self.categories = categories;
        self.is_fitted = true;
        Ok(self)
    }

    /// Encode the fitted columns of `df` into an `(n_rows, n_outputs)` indicator matrix
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PipelineError::NotFitted);
        }

        let mut out = Array2::zeros((df.height(), self.n_outputs()));
        let mut offset = 0;
        for (col, vocab) in self.columns.iter().zip(&self.categories) {
            for (i, value) in categorical_values(df, col)?.into_iter().enumerate() {
                let hit = value
                    .as_deref()
                    .and_then(|v| vocab.binary_search_by(|c| c.as_str().cmp(v)).ok());
                if let Some(k) = hit {
                    out[[i, offset + k]] = 1.0;
                }
            }
            offset += vocab.len();
        }
        Ok(out)
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Total number of indicator columns
    pub fn n_outputs(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    /// Sorted vocabulary of `column`
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.categories[i].as_slice())
    }

    /// Output names in `column_category` form
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .zip(&self.categories)
            .flat_map(|(col, vocab)| vocab.iter().map(move |cat| format!("{}_{}", col, cat)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sorted_vocabulary() {
        let df = df! { "region" => ["southwest", "northeast", "southeast", "northeast"] }.unwrap();
        let mut enc = OneHotEncoder::new();
        enc.fit(&df, &cols(&["region"])).unwrap();

        assert_eq!(
            enc.categories("region").unwrap(),
            &["northeast", "southeast", "southwest"]
        );
        assert_eq!(
            enc.feature_names(),
            vec!["region_northeast", "region_southeast", "region_southwest"]
        );

        let out = enc.transform(&df).unwrap();
        assert_eq!(out.row(0).to_vec(), vec![0.0, 0.0, 1.0]);
        assert_eq!(out.row(1).to_vec(), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unseen_and_null_encode_to_zeros() {
        let train = df! { "sex" => ["female", "male"] }.unwrap();
        let test = df! { "sex" => [Some("other"), None, Some("male")] }.unwrap();

        let mut enc = OneHotEncoder::new();
        enc.fit(&train, &cols(&["sex"])).unwrap();
        let out = enc.transform(&test).unwrap();

        assert_eq!(out.row(0).sum(), 0.0);
        assert_eq!(out.row(1).sum(), 0.0);
        assert_eq!(out.row(2).to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_multiple_columns_are_concatenated() {
        let df = df! {
            "sex" => ["female", "male"],
            "smoker" => ["yes", "no"],
        }
        .unwrap();
        let mut enc = OneHotEncoder::new();
        enc.fit(&df, &cols(&["sex", "smoker"])).unwrap();

        assert_eq!(enc.n_outputs(), 4);
        let out = enc.transform(&df).unwrap();
        assert_eq!(out.row(0).to_vec(), vec![1.0, 0.0, 0.0, 1.0]);
        assert_eq!(out.row(1).to_vec(), vec![0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_transform_before_fit() {
        let df = df! { "sex" => ["female"] }.unwrap();
        assert!(matches!(
            OneHotEncoder::new().transform(&df),
            Err(PipelineError::NotFitted)
        ));
    }
}
