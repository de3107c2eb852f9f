//! Text feature extraction
//!
//! Vectorizers produce sparse CSR matrices: a document row only stores the
//! n-grams it contains.

use crate::error::{Result, TextClfError};
use crate::optimizer::ParameterValue;
use crate::utils::sparse::{csr_from_rows, RowEntries, SparseMatrix};
use ndarray::Array1;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

/// Default token pattern: two or more word characters
pub const DEFAULT_TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for",
    "of", "with", "by", "is", "was", "are", "were", "be", "have", "has",
    "it", "this", "that", "i", "you", "he", "she", "we", "they",
];

fn default_token_regex() -> &'static Regex {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    TOKEN_RE.get_or_init(|| Regex::new(DEFAULT_TOKEN_PATTERN).expect("default token pattern is valid"))
}

/// Regex-based text tokenizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextTokenizer {
    lowercase: bool,
    stop_words: Vec<String>,
}

impl TextTokenizer {
    pub fn new() -> Self {
        Self {
            lowercase: true,
            stop_words: Vec::new(),
        }
    }

    fn set_english_stop_words(&mut self, enabled: bool) {
        self.stop_words = if enabled {
            ENGLISH_STOP_WORDS.iter().map(|s| s.to_string()).collect()
        } else {
            Vec::new()
        };
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let processed = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        default_token_regex()
            .find_iter(&processed)
            .map(|m| m.as_str())
            .filter(|s| !self.stop_words.iter().any(|w| w == s))
            .map(|s| s.to_string())
            .collect()
    }
}

impl Default for TextTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Count-based n-gram vectorizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountVectorizer {
    tokenizer: TextTokenizer,
    vocabulary: HashMap<String, usize>,
    max_features: Option<usize>,
    min_df: usize,
    max_df: f64,
    ngram_range: (usize, usize),
    binary: bool,
}

impl CountVectorizer {
    pub fn new() -> Self {
        Self {
            tokenizer: TextTokenizer::new(),
            vocabulary: HashMap::new(),
            max_features: None,
            min_df: 1,
            max_df: 1.0,
            ngram_range: (1, 1),
            binary: false,
        }
    }

    pub fn with_ngram_range(mut self, min: usize, max: usize) -> Self {
        self.ngram_range = (min.max(1), max.max(min));
        self
    }

    pub fn ngram_range(&self) -> (usize, usize) {
        self.ngram_range
    }

    pub fn n_features(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_fitted(&self) -> bool {
        !self.vocabulary.is_empty()
    }

    /// Apply a named hyperparameter
    pub fn set_param(&mut self, name: &str, value: &ParameterValue) -> Result<()> {
        let bad = |reason: &str| TextClfError::invalid_parameter(name, value, reason);
        match name {
            "ngram_min" => {
                let min = value.as_usize().filter(|&v| v >= 1).ok_or_else(|| bad("expected integer >= 1"))?;
                self.ngram_range = (min, self.ngram_range.1.max(min));
            }
            "ngram_max" => {
                let max = value.as_usize().filter(|&v| v >= 1).ok_or_else(|| bad("expected integer >= 1"))?;
                if max < self.ngram_range.0 {
                    return Err(bad("ngram_max below ngram_min"));
                }
                self.ngram_range.1 = max;
            }
            "max_features" => {
                self.max_features = Some(value.as_usize().filter(|&v| v >= 1).ok_or_else(|| bad("expected integer >= 1"))?);
            }
            "min_df" => {
                self.min_df = value.as_usize().ok_or_else(|| bad("expected non-negative integer"))?;
            }
            "max_df" => {
                let max_df = value.as_float().filter(|&v| v > 0.0 && v <= 1.0).ok_or_else(|| bad("expected fraction in (0, 1]"))?;
                self.max_df = max_df;
            }
            "binary" => {
                self.binary = value.as_bool().ok_or_else(|| bad("expected bool"))?;
            }
            "lowercase" => {
                let lowercase = value.as_bool().ok_or_else(|| bad("expected bool"))?;
                self.tokenizer.lowercase = lowercase;
            }
            "stop_words" => {
                let enabled = match value {
                    ParameterValue::Bool(b) => *b,
                    ParameterValue::String(s) if s == "english" => true,
                    ParameterValue::String(s) if s == "none" => false,
                    _ => return Err(bad("expected 'english', 'none' or bool")),
                };
                self.tokenizer.set_english_stop_words(enabled);
            }
            _ => return Err(bad("unknown vectorizer parameter")),
        }
        Ok(())
    }

    fn generate_ngrams(&self, tokens: &[String]) -> Vec<String> {
        let mut ngrams = Vec::new();

        for n in self.ngram_range.0..=self.ngram_range.1 {
            if tokens.len() >= n {
                for i in 0..=(tokens.len() - n) {
                    ngrams.push(tokens[i..i + n].join(" "));
                }
            }
        }

        ngrams
    }

    fn analyze(&self, doc: &str) -> Vec<String> {
        let tokens = self.tokenizer.tokenize(doc);
        self.generate_ngrams(&tokens)
    }

    pub fn fit<S: AsRef<str> + Sync>(&mut self, documents: &[S]) -> Result<()> {
        let n_docs = documents.len();
        let max_df_count = (self.max_df * n_docs as f64).ceil() as usize;

        // BTreeMap keeps term order stable so feature indices are reproducible
        let mut doc_freq: BTreeMap<String, usize> = BTreeMap::new();
        let mut term_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let ngrams = self.analyze(doc.as_ref());
            for ngram in &ngrams {
                *term_freq.entry(ngram.clone()).or_insert(0) += 1;
            }

            let unique: HashSet<&String> = ngrams.iter().collect();
            for ngram in unique {
                *doc_freq.entry(ngram.clone()).or_insert(0) += 1;
            }
        }

        let mut kept: Vec<String> = doc_freq
            .into_iter()
            .filter(|(_, count)| *count >= self.min_df && *count <= max_df_count)
            .map(|(term, _)| term)
            .collect();

        if let Some(max_n) = self.max_features {
            if kept.len() > max_n {
                // Most frequent terms win, ties broken alphabetically
                kept.sort_by(|a, b| term_freq[b].cmp(&term_freq[a]).then_with(|| a.cmp(b)));
                kept.truncate(max_n);
                kept.sort();
            }
        }

        if kept.is_empty() {
            return Err(TextClfError::ValidationError(
                "empty vocabulary; documents may only contain stop words or single characters".to_string(),
            ));
        }

        self.vocabulary = kept.into_iter().enumerate().map(|(idx, term)| (term, idx)).collect();

        Ok(())
    }

    /// Sorted `(term index, count)` entries of one document
    fn count_row(&self, doc: &str) -> RowEntries {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for ngram in self.analyze(doc) {
            if let Some(&idx) = self.vocabulary.get(&ngram) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }
        if self.binary {
            counts.values_mut().for_each(|v| *v = 1.0);
        }
        counts.into_iter().collect()
    }

    fn count_rows<S: AsRef<str> + Sync>(&self, documents: &[S]) -> Result<Vec<RowEntries>> {
        if self.vocabulary.is_empty() {
            return Err(TextClfError::ModelNotFitted);
        }
        Ok(documents.par_iter().map(|doc| self.count_row(doc.as_ref())).collect())
    }

    pub fn transform<S: AsRef<str> + Sync>(&self, documents: &[S]) -> Result<SparseMatrix> {
        let rows = self.count_rows(documents)?;
        Ok(csr_from_rows(&rows, self.vocabulary.len()))
    }

    pub fn fit_transform<S: AsRef<str> + Sync>(&mut self, documents: &[S]) -> Result<SparseMatrix> {
        self.fit(documents)?;
        self.transform(documents)
    }

    pub fn get_feature_names(&self) -> Vec<String> {
        let mut names = vec![String::new(); self.vocabulary.len()];
        for (term, &idx) in &self.vocabulary {
            names[idx] = term.clone();
        }
        names
    }
}

impl Default for CountVectorizer {
    fn default() -> Self {
        Self::new()
    }
}

/// TF-IDF vectorizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    count_vectorizer: CountVectorizer,
    idf: Option<Array1<f64>>,
    normalize: bool,
    smooth_idf: bool,
    sublinear_tf: bool,
}

impl TfidfVectorizer {
    pub fn new() -> Self {
        Self {
            count_vectorizer: CountVectorizer::new(),
            idf: None,
            normalize: true,
            smooth_idf: true,
            sublinear_tf: false,
        }
    }

    pub fn with_ngram_range(mut self, min: usize, max: usize) -> Self {
        self.count_vectorizer = self.count_vectorizer.with_ngram_range(min, max);
        self
    }

    pub fn ngram_range(&self) -> (usize, usize) {
        self.count_vectorizer.ngram_range()
    }

    pub fn n_features(&self) -> usize {
        self.count_vectorizer.n_features()
    }

    pub fn is_fitted(&self) -> bool {
        self.idf.is_some()
    }

    /// Apply a named hyperparameter; unknown names go to the inner count vectorizer
    pub fn set_param(&mut self, name: &str, value: &ParameterValue) -> Result<()> {
        let bad = |reason: &str| TextClfError::invalid_parameter(name, value, reason);
        match name {
            "norm" => {
                self.normalize = match value {
                    ParameterValue::Bool(b) => *b,
                    ParameterValue::String(s) if s == "l2" => true,
                    ParameterValue::String(s) if s == "none" => false,
                    _ => return Err(bad("expected 'l2', 'none' or bool")),
                };
            }
            "smooth_idf" => self.smooth_idf = value.as_bool().ok_or_else(|| bad("expected bool"))?,
            "sublinear_tf" => self.sublinear_tf = value.as_bool().ok_or_else(|| bad("expected bool"))?,
            _ => self.count_vectorizer.set_param(name, value)?,
        }
        Ok(())
    }

    pub fn fit<S: AsRef<str> + Sync>(&mut self, documents: &[S]) -> Result<()> {
        self.count_vectorizer.fit(documents)?;
        let rows = self.count_vectorizer.count_rows(documents)?;
        self.idf = Some(self.compute_idf(&rows, documents.len()));
        Ok(())
    }

    fn compute_idf(&self, rows: &[RowEntries], n_docs: usize) -> Array1<f64> {
        let n_docs = n_docs as f64;
        let mut df = Array1::<f64>::zeros(self.count_vectorizer.n_features());
        for row in rows {
            for &(j, _) in row {
                df[j] += 1.0;
            }
        }

        df.mapv(|df| {
            if self.smooth_idf {
                ((n_docs + 1.0) / (df + 1.0)).ln() + 1.0
            } else {
                (n_docs / df.max(1.0)).ln() + 1.0
            }
        })
    }

    pub fn transform<S: AsRef<str> + Sync>(&self, documents: &[S]) -> Result<SparseMatrix> {
        let idf = self.idf.as_ref().ok_or(TextClfError::ModelNotFitted)?;

        let mut rows = self.count_vectorizer.count_rows(documents)?;
        rows.par_iter_mut().for_each(|row| {
            for (j, v) in row.iter_mut() {
                let tf = if self.sublinear_tf { 1.0 + v.ln() } else { *v };
                *v = tf * idf[*j];
            }
            if self.normalize {
                let norm = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
                if norm > 0.0 {
                    row.iter_mut().for_each(|(_, v)| *v /= norm);
                }
            }
        });

        Ok(csr_from_rows(&rows, self.count_vectorizer.n_features()))
    }

    pub fn fit_transform<S: AsRef<str> + Sync>(&mut self, documents: &[S]) -> Result<SparseMatrix> {
        self.fit(documents)?;
        self.transform(documents)
    }

    pub fn get_feature_names(&self) -> Vec<String> {
        self.count_vectorizer.get_feature_names()
    }
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self::new()
    }
}
