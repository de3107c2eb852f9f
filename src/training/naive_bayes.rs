//! Multinomial naive Bayes for count features

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{argmax, check_fit_input, check_n_features};
use crate::error::{Result, TextClfError};
use crate::optimizer::ParameterValue;
use crate::utils::sparse::{row_dot, SparseMatrix};

/// Multinomial Naive Bayes (for count data)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultinomialNaiveBayes {
    /// Log probability of each feature for each class
    feature_log_probs: BTreeMap<i64, Array1<f64>>,
    /// Log prior probability of each class
    class_log_priors: BTreeMap<i64, f64>,
    /// List of classes, ascending
    classes: Vec<i64>,
    /// Smoothing parameter (Laplace smoothing)
    alpha: f64,
    n_features: usize,
}

impl Default for MultinomialNaiveBayes {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl MultinomialNaiveBayes {
    pub fn new(alpha: f64) -> Self {
        Self {
            feature_log_probs: BTreeMap::new(),
            class_log_priors: BTreeMap::new(),
            classes: Vec::new(),
            alpha,
            n_features: 0,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    pub fn set_param(&mut self, name: &str, value: &ParameterValue) -> Result<()> {
        match name {
            "alpha" => {
                self.alpha = value
                    .as_float()
                    .filter(|&a| a >= 0.0)
                    .ok_or_else(|| TextClfError::invalid_parameter(name, value, "expected float >= 0"))?;
                Ok(())
            }
            _ => Err(TextClfError::invalid_parameter(name, value, "unknown naive Bayes parameter")),
        }
    }

    /// Fit the classifier
    pub fn fit(&mut self, x: &SparseMatrix, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let n_samples = x.rows();
        let n_features = x.cols();

        if x.data().iter().any(|&v| v < 0.0) {
            return Err(TextClfError::ValidationError(
                "Multinomial naive Bayes requires non-negative features".to_string(),
            ));
        }

        let mut class_counts: BTreeMap<i64, usize> = BTreeMap::new();
        for &label in y.iter() {
            *class_counts.entry(label as i64).or_insert(0) += 1;
        }

        // Summed feature values per class, one pass over the nonzeros
        let mut feature_counts: BTreeMap<i64, Array1<f64>> = class_counts
            .keys()
            .map(|&class| (class, Array1::from_elem(n_features, self.alpha)))
            .collect();
        for (row, &label) in x.outer_iterator().zip(y.iter()) {
            if let Some(counts) = feature_counts.get_mut(&(label as i64)) {
                for (j, &val) in row.iter() {
                    counts[j] += val;
                }
            }
        }

        self.classes = class_counts.keys().copied().collect();
        self.class_log_priors = class_counts
            .iter()
            .map(|(&class, &count)| (class, (count as f64 / n_samples as f64).ln()))
            .collect();
        self.feature_log_probs = feature_counts
            .into_iter()
            .map(|(class, counts)| {
                let total = counts.sum();
                (class, counts.mapv(|c| (c / total).ln()))
            })
            .collect();

        self.n_features = n_features;
        Ok(())
    }

    /// Predict class labels
    pub fn predict(&self, x: &SparseMatrix) -> Result<Array1<f64>> {
        let log_probs = self.predict_joint_log_likelihood(x)?;

        Ok(log_probs
            .rows()
            .into_iter()
            .map(|row| self.classes[argmax(row.iter().copied())] as f64)
            .collect())
    }

    /// Unnormalized joint log likelihood, one column per class
    pub fn predict_joint_log_likelihood(&self, x: &SparseMatrix) -> Result<Array2<f64>> {
        if self.classes.is_empty() {
            return Err(TextClfError::ModelNotFitted);
        }
        check_n_features(self.n_features, x)?;

        let mut log_probs = Array2::zeros((x.rows(), self.classes.len()));

        for (i, row) in x.outer_iterator().enumerate() {
            for (j, class) in self.classes.iter().enumerate() {
                log_probs[[i, j]] = self.class_log_priors[class] + row_dot(&row, &self.feature_log_probs[class]);
            }
        }

        Ok(log_probs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::sparse::csr_from_dense;

    fn count_data() -> (SparseMatrix, Array1<f64>) {
        let x = Array2::from_shape_vec((10, 4), vec![
            // Class 0 (high counts in first two features)
            5.0, 3.0, 1.0, 0.0,
            4.0, 4.0, 0.0, 1.0,
            6.0, 2.0, 1.0, 0.0,
            5.0, 5.0, 0.0, 0.0,
            4.0, 3.0, 1.0, 1.0,
            // Class 1 (high counts in last two features)
            0.0, 1.0, 5.0, 4.0,
            1.0, 0.0, 4.0, 5.0,
            0.0, 0.0, 6.0, 3.0,
            1.0, 1.0, 5.0, 5.0,
            0.0, 1.0, 4.0, 4.0,
        ]).unwrap();

        let y = Array1::from_vec(vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        (csr_from_dense(&x), y)
    }

    #[test]
    fn test_multinomial_naive_bayes() {
        let (x, y) = count_data();

        let mut mnb = MultinomialNaiveBayes::new(1.0);
        mnb.fit(&x, &y).unwrap();

        let predictions = mnb.predict(&x).unwrap();
        assert_eq!(predictions, y);
        assert_eq!(mnb.classes(), &[0, 1]);
    }

    #[test]
    fn test_predict_before_fit() {
        let mnb = MultinomialNaiveBayes::default();
        let x = csr_from_dense(&Array2::zeros((1, 4)));
        assert!(matches!(mnb.predict(&x), Err(TextClfError::ModelNotFitted)));
    }

    #[test]
    fn test_rejects_negative_counts() {
        let x = csr_from_dense(&Array2::from_shape_vec((2, 1), vec![-1.0, 1.0]).unwrap());
        let y = Array1::from_vec(vec![0.0, 1.0]);
        assert!(MultinomialNaiveBayes::default().fit(&x, &y).is_err());
    }

    #[test]
    fn test_feature_count_mismatch() {
        let (x, y) = count_data();
        let mut mnb = MultinomialNaiveBayes::default();
        mnb.fit(&x, &y).unwrap();

        let wrong = csr_from_dense(&Array2::zeros((1, 3)));
        assert!(matches!(mnb.predict(&wrong), Err(TextClfError::ShapeError { .. })));
    }

    #[test]
    fn test_set_alpha() {
        let mut mnb = MultinomialNaiveBayes::default();
        mnb.set_param("alpha", &ParameterValue::Float(0.5)).unwrap();
        assert_eq!(mnb.alpha(), 0.5);
        assert!(mnb.set_param("alpha", &ParameterValue::Float(-1.0)).is_err());
    }
}
