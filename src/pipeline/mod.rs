//! Feature-union + classifier pipeline
//!
//! A [`Pipeline`] owns one [`FeatureUnion`] and one [`ClassifierModel`].
//! Parameters are addressed with the `<step>__<param>` convention:
//! `clf__alpha` reaches the classifier, `features__both_gram__ngram_max`
//! reaches the `both_gram` extractor inside the union.

use crate::error::{Result, TextClfError};
use crate::feature_engineering::{FeatureSet, FeatureUnion};
use crate::optimizer::{ParameterSet, ParameterValue};
use crate::training::{ClassifierKind, ClassifierModel, Label};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Step name of the classifier in parameter keys
pub const CLASSIFIER_STEP: &str = "clf";
/// Step name of the feature union in parameter keys
pub const FEATURES_STEP: &str = "features";

/// Composed text → label model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    feature_sets: Vec<FeatureSet>,
    features: FeatureUnion,
    clf: ClassifierModel,
}

impl Pipeline {
    /// Build an unfitted pipeline from registry entries.
    ///
    /// Fails on an empty feature selection or a feature listed twice.
    pub fn new(feature_sets: &[FeatureSet], classifier: ClassifierKind) -> Result<Self> {
        if feature_sets.is_empty() {
            return Err(TextClfError::ConfigError(
                "At least one feature set must be selected".to_string(),
            ));
        }

        let mut features = FeatureUnion::new();
        for feature in feature_sets {
            features.add(feature.name(), feature.build())?;
        }

        Ok(Self {
            feature_sets: feature_sets.to_vec(),
            features,
            clf: classifier.build(),
        })
    }

    /// Build an unfitted pipeline from registry names
    pub fn from_names<S: AsRef<str>>(feature_names: &[S], classifier: &str) -> Result<Self> {
        let feature_sets = feature_names
            .iter()
            .map(|name| name.as_ref().parse())
            .collect::<Result<Vec<FeatureSet>>>()?;
        let classifier: ClassifierKind = classifier.parse()?;
        Self::new(&feature_sets, classifier)
    }

    pub fn feature_sets(&self) -> &[FeatureSet] {
        &self.feature_sets
    }

    pub fn classifier_kind(&self) -> ClassifierKind {
        self.clf.kind()
    }

    pub fn features(&self) -> &FeatureUnion {
        &self.features
    }

    /// Columns produced by the fitted feature union
    pub fn n_features(&self) -> usize {
        self.features.n_features()
    }

    pub fn is_fitted(&self) -> bool {
        self.features.is_fitted() && self.clf.is_fitted()
    }

    /// Apply every `<step>__<param>` entry in `params`
    pub fn set_params(&mut self, params: &ParameterSet) -> Result<()> {
        for (name, value) in params {
            self.set_param(name, value)?;
        }
        Ok(())
    }

    pub fn set_param(&mut self, name: &str, value: &ParameterValue) -> Result<()> {
        match name.split_once("__") {
            Some((CLASSIFIER_STEP, param)) => self.clf.set_param(param, value),
            Some((FEATURES_STEP, param)) => self.features.set_param(param, value),
            _ => Err(TextClfError::invalid_parameter(
                name,
                value,
                "expected 'clf__<param>' or 'features__<feature>__<param>'",
            )),
        }
    }

    /// Fit the feature union on `documents`, then the classifier on its output
    pub fn fit<S: AsRef<str> + Sync>(&mut self, documents: &[S], y: &Array1<f64>) -> Result<()> {
        if documents.len() != y.len() {
            return Err(TextClfError::ShapeError {
                expected: format!("{} labels", documents.len()),
                actual: format!("{} labels", y.len()),
            });
        }

        let x = self.features.fit_transform(documents)?;
        debug!(
            n_samples = x.rows(),
            n_features = x.cols(),
            nnz = x.nnz(),
            classifier = %self.clf.kind(),
            "fitting classifier"
        );
        self.clf.fit(&x, y)
    }

    /// Predict 0/1 class values
    pub fn predict<S: AsRef<str> + Sync>(&self, documents: &[S]) -> Result<Array1<f64>> {
        if !self.is_fitted() {
            return Err(TextClfError::ModelNotFitted);
        }
        let x = self.features.transform(documents)?;
        self.clf.predict(&x)
    }

    pub fn predict_labels<S: AsRef<str> + Sync>(&self, documents: &[S]) -> Result<Vec<Label>> {
        Ok(self
            .predict(documents)?
            .iter()
            .map(|&v| Label::from_prediction(v))
            .collect())
    }
}
