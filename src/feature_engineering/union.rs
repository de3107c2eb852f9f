//! Parallel combination of feature extractors

use super::text_features::{CountVectorizer, TfidfVectorizer};
use crate::error::{Result, TextClfError};
use crate::optimizer::ParameterValue;
use crate::utils::sparse::{self, SparseMatrix};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A trainable text → sparse matrix transform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FeatureExtractor {
    Count(CountVectorizer),
    Tfidf(TfidfVectorizer),
}

impl FeatureExtractor {
    pub fn fit_transform<S: AsRef<str> + Sync>(&mut self, documents: &[S]) -> Result<SparseMatrix> {
        match self {
            FeatureExtractor::Count(v) => v.fit_transform(documents),
            FeatureExtractor::Tfidf(v) => v.fit_transform(documents),
        }
    }

    pub fn transform<S: AsRef<str> + Sync>(&self, documents: &[S]) -> Result<SparseMatrix> {
        match self {
            FeatureExtractor::Count(v) => v.transform(documents),
            FeatureExtractor::Tfidf(v) => v.transform(documents),
        }
    }

    pub fn set_param(&mut self, name: &str, value: &ParameterValue) -> Result<()> {
        match self {
            FeatureExtractor::Count(v) => v.set_param(name, value),
            FeatureExtractor::Tfidf(v) => v.set_param(name, value),
        }
    }

    pub fn is_fitted(&self) -> bool {
        match self {
            FeatureExtractor::Count(v) => v.is_fitted(),
            FeatureExtractor::Tfidf(v) => v.is_fitted(),
        }
    }

    pub fn n_features(&self) -> usize {
        match self {
            FeatureExtractor::Count(v) => v.n_features(),
            FeatureExtractor::Tfidf(v) => v.n_features(),
        }
    }

    pub fn get_feature_names(&self) -> Vec<String> {
        match self {
            FeatureExtractor::Count(v) => v.get_feature_names(),
            FeatureExtractor::Tfidf(v) => v.get_feature_names(),
        }
    }
}

/// Runs named extractors side by side and concatenates their columns
/// in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureUnion {
    transformers: Vec<(String, FeatureExtractor)>,
}

impl FeatureUnion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named extractor. Names must be unique.
    pub fn add(&mut self, name: impl Into<String>, extractor: FeatureExtractor) -> Result<()> {
        let name = name.into();
        if self.transformers.iter().any(|(n, _)| *n == name) {
            return Err(TextClfError::ConfigError(format!("Duplicate feature set '{}'", name)));
        }
        self.transformers.push((name, extractor));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.transformers.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Total columns of the combined matrix
    pub fn n_features(&self) -> usize {
        self.transformers.iter().map(|(_, t)| t.n_features()).sum()
    }

    pub fn is_fitted(&self) -> bool {
        !self.transformers.is_empty() && self.transformers.iter().all(|(_, t)| t.is_fitted())
    }

    /// Apply `<feature>__<param>` to the matching extractor
    pub fn set_param(&mut self, name: &str, value: &ParameterValue) -> Result<()> {
        let (feature, param) = name.split_once("__").ok_or_else(|| {
            TextClfError::invalid_parameter(name, value, "expected <feature>__<param>")
        })?;

        let (_, extractor) = self
            .transformers
            .iter_mut()
            .find(|(n, _)| n == feature)
            .ok_or_else(|| TextClfError::invalid_parameter(name, value, "feature set not in pipeline"))?;

        extractor.set_param(param, value)
    }

    pub fn fit_transform<S: AsRef<str> + Sync>(&mut self, documents: &[S]) -> Result<SparseMatrix> {
        if self.transformers.is_empty() {
            return Err(TextClfError::ConfigError("Feature union has no transformers".to_string()));
        }

        let blocks = self
            .transformers
            .par_iter_mut()
            .map(|(_, extractor)| extractor.fit_transform(documents))
            .collect::<Result<Vec<_>>>()?;

        sparse::hstack(&blocks)
    }

    pub fn transform<S: AsRef<str> + Sync>(&self, documents: &[S]) -> Result<SparseMatrix> {
        if self.transformers.is_empty() {
            return Err(TextClfError::ConfigError("Feature union has no transformers".to_string()));
        }

        let blocks = self
            .transformers
            .par_iter()
            .map(|(_, extractor)| extractor.transform(documents))
            .collect::<Result<Vec<_>>>()?;

        sparse::hstack(&blocks)
    }

    /// Feature names prefixed with their extractor name
    pub fn get_feature_names(&self) -> Vec<String> {
        self.transformers
            .iter()
            .flat_map(|(name, extractor)| {
                extractor
                    .get_feature_names()
                    .into_iter()
                    .map(move |f| format!("{}__{}", name, f))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs() -> Vec<String> {
        vec!["good movie great acting".to_string(), "bad movie poor acting".to_string()]
    }

    #[test]
    fn test_union_concatenates_columns() {
        let mut union = FeatureUnion::new();
        union.add("unigram", FeatureExtractor::Count(CountVectorizer::new())).unwrap();
        union
            .add("bigram", FeatureExtractor::Count(CountVectorizer::new().with_ngram_range(2, 2)))
            .unwrap();

        let x = union.fit_transform(&docs()).unwrap();

        // 6 distinct unigrams + 6 distinct bigrams
        assert_eq!(x.shape(), (2, 12));
        assert_eq!(union.n_features(), 12);
        assert_eq!(union.get_feature_names().len(), 12);
        assert!(union.get_feature_names()[0].starts_with("unigram__"));
        assert!(union.get_feature_names()[11].starts_with("bigram__"));

        let again = union.transform(&docs()).unwrap();
        assert_eq!(x, again);
    }

    #[test]
    fn test_union_rejects_duplicates() {
        let mut union = FeatureUnion::new();
        union.add("unigram", FeatureExtractor::Count(CountVectorizer::new())).unwrap();
        let result = union.add("unigram", FeatureExtractor::Count(CountVectorizer::new()));
        assert!(matches!(result, Err(TextClfError::ConfigError(_))));
    }

    #[test]
    fn test_union_set_param_routing() {
        let mut union = FeatureUnion::new();
        union.add("unigram", FeatureExtractor::Count(CountVectorizer::new())).unwrap();

        union.set_param("unigram__ngram_max", &ParameterValue::Int(2)).unwrap();
        assert!(union.set_param("tfidf__ngram_max", &ParameterValue::Int(2)).is_err());
        assert!(union.set_param("ngram_max", &ParameterValue::Int(2)).is_err());
    }

    #[test]
    fn test_empty_union_fails() {
        let mut union = FeatureUnion::new();
        assert!(union.fit_transform(&docs()).is_err());
    }
}
