//! Model training module
//!
//! Provides the classifiers the runner can select between:
//! - Multinomial Naive Bayes
//! - Logistic regression
//! - Linear Support Vector Machine
//! - Stochastic Gradient Descent (SGD)
//!
//! plus hold-out / k-fold splitting and classification metrics.

pub mod cross_validation;
pub mod linear_models;
pub mod metrics;
pub mod naive_bayes;
pub mod sgd;
pub mod svm;

pub use cross_validation::{train_test_split, CVResults, CVSplit, StratifiedKFold};
pub use linear_models::LogisticRegression;
pub use metrics::{accuracy_score, ClassMetrics, ClassificationReport};
pub use naive_bayes::MultinomialNaiveBayes;
pub use sgd::{SGDClassifier, SGDConfig, SGDLoss};
pub use svm::{LinearSVC, LinearSVCConfig, SvmLoss};

use crate::error::{Result, TextClfError};
use crate::optimizer::ParameterValue;
use crate::utils::sparse::{ensure_csr, SparseMatrix};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Binary document class
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Label {
    Negative = 0,
    Positive = 1,
}

impl Label {
    pub const ALL: [Label; 2] = [Label::Negative, Label::Positive];

    pub fn as_f64(self) -> f64 {
        self as i64 as f64
    }

    /// Map a model output back to a label (anything above 0.5 is positive)
    pub fn from_prediction(value: f64) -> Self {
        if value > 0.5 {
            Label::Positive
        } else {
            Label::Negative
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as i64)
    }
}

impl Serialize for Label {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i64(*self as i64)
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match i64::deserialize(deserializer)? {
            0 => Ok(Label::Negative),
            1 => Ok(Label::Positive),
            other => Err(serde::de::Error::custom(format!("invalid label {}", other))),
        }
    }
}

/// Classifier registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    #[default]
    Nb,
    LogReg,
    LinSvm,
    Sgd,
}

impl ClassifierKind {
    /// Registry order; the first entry is the default
    pub const ALL: [ClassifierKind; 4] = [
        ClassifierKind::Nb,
        ClassifierKind::LogReg,
        ClassifierKind::LinSvm,
        ClassifierKind::Sgd,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ClassifierKind::Nb => "nb",
            ClassifierKind::LogReg => "log_reg",
            ClassifierKind::LinSvm => "lin_svm",
            ClassifierKind::Sgd => "sgd",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|k| k.name()).collect()
    }

    /// Construct an unfitted model with registry defaults
    pub fn build(&self) -> ClassifierModel {
        match self {
            ClassifierKind::Nb => ClassifierModel::Nb(MultinomialNaiveBayes::new(1.0)),
            ClassifierKind::LogReg => ClassifierModel::LogReg(LogisticRegression::new()),
            ClassifierKind::LinSvm => ClassifierModel::LinSvm(LinearSVC::default()),
            ClassifierKind::Sgd => ClassifierModel::Sgd(SGDClassifier::default()),
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ClassifierKind {
    type Err = TextClfError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .find(|k| k.name() == s)
            .copied()
            .ok_or_else(|| TextClfError::UnknownClassifier(s.to_string()))
    }
}

/// A trainable binary classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClassifierModel {
    Nb(MultinomialNaiveBayes),
    LogReg(LogisticRegression),
    LinSvm(LinearSVC),
    Sgd(SGDClassifier),
}

impl ClassifierModel {
    pub fn kind(&self) -> ClassifierKind {
        match self {
            ClassifierModel::Nb(_) => ClassifierKind::Nb,
            ClassifierModel::LogReg(_) => ClassifierKind::LogReg,
            ClassifierModel::LinSvm(_) => ClassifierKind::LinSvm,
            ClassifierModel::Sgd(_) => ClassifierKind::Sgd,
        }
    }

    pub fn fit(&mut self, x: &SparseMatrix, y: &Array1<f64>) -> Result<()> {
        match self {
            ClassifierModel::Nb(m) => m.fit(x, y),
            ClassifierModel::LogReg(m) => m.fit(x, y).map(|_| ()),
            ClassifierModel::LinSvm(m) => m.fit(x, y),
            ClassifierModel::Sgd(m) => m.fit(x, y),
        }
    }

    /// Predict 0/1 class values
    pub fn predict(&self, x: &SparseMatrix) -> Result<Array1<f64>> {
        match self {
            ClassifierModel::Nb(m) => m.predict(x),
            ClassifierModel::LogReg(m) => m.predict(x),
            ClassifierModel::LinSvm(m) => m.predict(x),
            ClassifierModel::Sgd(m) => m.predict(x),
        }
    }

    pub fn set_param(&mut self, name: &str, value: &ParameterValue) -> Result<()> {
        match self {
            ClassifierModel::Nb(m) => m.set_param(name, value),
            ClassifierModel::LogReg(m) => m.set_param(name, value),
            ClassifierModel::LinSvm(m) => m.set_param(name, value),
            ClassifierModel::Sgd(m) => m.set_param(name, value),
        }
    }

    pub fn is_fitted(&self) -> bool {
        match self {
            ClassifierModel::Nb(m) => !m.classes().is_empty(),
            ClassifierModel::LogReg(m) => m.coefficients.is_some(),
            ClassifierModel::LinSvm(m) => m.is_fitted(),
            ClassifierModel::Sgd(m) => m.weights.is_some(),
        }
    }
}

pub(crate) fn check_fit_input(x: &SparseMatrix, y: &Array1<f64>) -> Result<()> {
    ensure_csr(x)?;
    if x.rows() != y.len() {
        return Err(TextClfError::ShapeError {
            expected: format!("{} labels", x.rows()),
            actual: format!("{} labels", y.len()),
        });
    }
    if x.rows() == 0 {
        return Err(TextClfError::TrainingError("Cannot fit on zero samples".to_string()));
    }
    Ok(())
}

pub(crate) fn check_n_features(expected: usize, x: &SparseMatrix) -> Result<()> {
    ensure_csr(x)?;
    if x.cols() != expected {
        return Err(TextClfError::ShapeError {
            expected: format!("{} features", expected),
            actual: format!("{} features", x.cols()),
        });
    }
    Ok(())
}

/// Index of the largest value; ties resolve to the first
pub(crate) fn argmax(values: impl Iterator<Item = f64>) -> usize {
    let mut best_idx = 0;
    let mut best = f64::NEG_INFINITY;
    for (i, v) in values.enumerate() {
        if v > best {
            best = v;
            best_idx = i;
        }
    }
    best_idx
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::sparse::csr_from_dense;
    use ndarray::array;

    #[test]
    fn test_classifier_registry() {
        assert_eq!(ClassifierKind::names(), vec!["nb", "log_reg", "lin_svm", "sgd"]);
        assert_eq!(ClassifierKind::default(), ClassifierKind::ALL[0]);

        for kind in ClassifierKind::ALL {
            let parsed: ClassifierKind = kind.name().parse().unwrap();
            assert_eq!(parsed, kind);
            assert_eq!(kind.build().kind(), kind);
            assert!(!kind.build().is_fitted());
        }

        assert!(matches!(
            "random_forest".parse::<ClassifierKind>(),
            Err(TextClfError::UnknownClassifier(name)) if name == "random_forest"
        ));
    }

    #[test]
    fn test_every_classifier_fits() {
        let x = csr_from_dense(&array![
            [3.0, 0.0], [2.0, 1.0], [4.0, 0.0], [3.0, 1.0],
            [0.0, 3.0], [1.0, 2.0], [0.0, 4.0], [1.0, 3.0],
        ]);
        let y = array![1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0];

        for kind in ClassifierKind::ALL {
            let mut model = kind.build();
            model.fit(&x, &y).unwrap();
            assert!(model.is_fitted());
            assert_eq!(model.predict(&x).unwrap(), y, "{} misclassified training data", kind);
        }
    }

    #[test]
    fn test_label_conversions() {
        assert_eq!(Label::Positive.as_f64(), 1.0);
        assert_eq!(Label::from_prediction(0.0), Label::Negative);
        assert_eq!(Label::from_prediction(1.0), Label::Positive);
        assert_eq!(Label::Negative.to_string(), "0");
        assert_eq!(serde_json::to_string(&Label::Positive).unwrap(), "1");
        assert!(serde_json::from_str::<Label>("2").is_err());
    }

    #[test]
    fn test_argmax_ties_pick_first() {
        assert_eq!(argmax([1.0, 3.0, 3.0].into_iter()), 1);
        assert_eq!(argmax([-2.0, -5.0].into_iter()), 0);
    }

    #[test]
    fn test_sigmoid_is_stable() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(-1000.0) >= 0.0);
        assert!(sigmoid(1000.0) <= 1.0);
    }
}
