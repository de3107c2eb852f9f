//! Feature engineering: text vectorizers, the feature-set registry and the
//! union that combines selected feature sets.

pub mod text_features;
pub mod union;

pub use text_features::{CountVectorizer, TextTokenizer, TfidfVectorizer, DEFAULT_TOKEN_PATTERN};
pub use union::{FeatureExtractor, FeatureUnion};

use crate::error::{Result, TextClfError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Registry of selectable feature sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSet {
    /// Unigram + bigram counts
    BothGram,
    Unigram,
    Bigram,
    /// L2-normalized tf-idf over unigrams and bigrams
    Tfidf,
}

impl FeatureSet {
    pub const ALL: [FeatureSet; 4] = [
        FeatureSet::BothGram,
        FeatureSet::Unigram,
        FeatureSet::Bigram,
        FeatureSet::Tfidf,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FeatureSet::BothGram => "both_gram",
            FeatureSet::Unigram => "unigram",
            FeatureSet::Bigram => "bigram",
            FeatureSet::Tfidf => "tfidf",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|f| f.name()).collect()
    }

    /// Build a fresh, unfitted extractor for this feature set
    pub fn build(&self) -> FeatureExtractor {
        match self {
            FeatureSet::BothGram => FeatureExtractor::Count(CountVectorizer::new().with_ngram_range(1, 2)),
            FeatureSet::Unigram => FeatureExtractor::Count(CountVectorizer::new().with_ngram_range(1, 1)),
            FeatureSet::Bigram => FeatureExtractor::Count(CountVectorizer::new().with_ngram_range(2, 2)),
            FeatureSet::Tfidf => FeatureExtractor::Tfidf(TfidfVectorizer::new().with_ngram_range(1, 2)),
        }
    }
}

impl Default for FeatureSet {
    fn default() -> Self {
        FeatureSet::BothGram
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureSet {
    type Err = TextClfError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .ok_or_else(|| TextClfError::UnknownFeature(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        for feature in FeatureSet::ALL {
            assert_eq!(feature.name().parse::<FeatureSet>().unwrap(), feature);
        }
        assert!(matches!("trigram".parse::<FeatureSet>(), Err(TextClfError::UnknownFeature(_))));
    }

    #[test]
    fn test_default_is_both_gram() {
        assert_eq!(FeatureSet::default(), FeatureSet::BothGram);
        match FeatureSet::BothGram.build() {
            FeatureExtractor::Count(v) => assert_eq!(v.ngram_range(), (1, 2)),
            other => panic!("unexpected extractor {:?}", other),
        }
    }
}
