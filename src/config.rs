//! Runner configuration
//!
//! Defaults come from the environment (`TEXTCLF_*` variables) and are then
//! overridden by command-line flags.

use crate::error::{Result, TextClfError};
use crate::export::default_output_path;
use crate::feature_engineering::FeatureSet;
use crate::optimizer::ParamGrid;
use crate::training::ClassifierKind;
use crate::utils::FilePattern;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_TEST_SIZE: f64 = 0.2;
pub const DEFAULT_CV_FOLDS: usize = 5;
/// Extension of document files under the data directory
pub const DOCUMENT_EXTENSION: &str = "txt";

/// Everything one experiment run needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Root holding `train/neg`, `train/pos` and `test`
    pub data_dir: PathBuf,
    /// Explicit pattern overrides, e.g. `corpus/neg/*.txt`
    pub train_neg: Option<String>,
    pub train_pos: Option<String>,
    pub test: Option<String>,
    pub output: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub feature_sets: Vec<FeatureSet>,
    pub classifier: ClassifierKind,
    pub perform_cv: bool,
    pub param_grid: ParamGrid,
    pub seed: u64,
    pub test_size: f64,
    pub cv_folds: usize,
    /// Fold-fitting threads; `None` uses every core
    pub n_jobs: Option<usize>,
    /// Where to save the JSON run report, if anywhere
    pub report_path: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            data_dir: std::env::var("TEXTCLF_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("../data")),
            train_neg: None,
            train_pos: None,
            test: None,
            output: None,
            output_dir: std::env::var("TEXTCLF_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("results")),
            feature_sets: vec![FeatureSet::default()],
            classifier: ClassifierKind::default(),
            perform_cv: false,
            param_grid: ParamGrid::new(),
            seed: std::env::var("TEXTCLF_SEED")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SEED),
            test_size: DEFAULT_TEST_SIZE,
            cv_folds: std::env::var("TEXTCLF_CV_FOLDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CV_FOLDS),
            n_jobs: None,
            report_path: None,
        }
    }
}

impl RunnerConfig {
    /// Default configuration reading documents from `data_dir`
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    fn pattern(&self, explicit: Option<&String>, subdir: &[&str]) -> Result<FilePattern> {
        match explicit {
            Some(pattern) => FilePattern::parse(pattern),
            None => {
                let dir = subdir.iter().fold(self.data_dir.clone(), |dir, part| dir.join(part));
                Ok(FilePattern::in_dir(dir, DOCUMENT_EXTENSION))
            }
        }
    }

    pub fn train_neg_pattern(&self) -> Result<FilePattern> {
        self.pattern(self.train_neg.as_ref(), &["train", "neg"])
    }

    pub fn train_pos_pattern(&self) -> Result<FilePattern> {
        self.pattern(self.train_pos.as_ref(), &["train", "pos"])
    }

    pub fn test_pattern(&self) -> Result<FilePattern> {
        self.pattern(self.test.as_ref(), &["test"])
    }

    /// Explicit `output`, or a name derived from the classifier and features
    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            default_output_path(&self.output_dir, self.classifier, &self.feature_sets, self.perform_cv)
        })
    }

    /// Reject settings no run could succeed with
    pub fn validate(&self) -> Result<()> {
        if self.feature_sets.is_empty() {
            return Err(TextClfError::ConfigError(
                "At least one feature set must be selected".to_string(),
            ));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(TextClfError::invalid_parameter(
                "test_size",
                self.test_size,
                "must be in the open interval (0, 1)",
            ));
        }
        if self.perform_cv && self.cv_folds < 2 {
            return Err(TextClfError::invalid_parameter("cv_folds", self.cv_folds, "must be at least 2"));
        }
        if self.n_jobs == Some(0) {
            return Err(TextClfError::invalid_parameter("n_jobs", 0, "must be at least 1"));
        }
        if let Some(name) = self.param_grid.empty_parameter() {
            return Err(TextClfError::ConfigError(format!(
                "Grid parameter '{}' has no values to try",
                name
            )));
        }
        if !self.perform_cv && self.param_grid.n_combinations() > 1 {
            return Err(TextClfError::ConfigError(
                "Several values per parameter need --perform_cv to be searched".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::ParameterValue;
    use std::path::Path;

    #[test]
    fn test_default_patterns_under_data_dir() {
        let config = RunnerConfig::with_data_dir("corpus");
        assert_eq!(config.train_neg_pattern().unwrap().dir(), Path::new("corpus/train/neg"));
        assert_eq!(config.train_pos_pattern().unwrap().dir(), Path::new("corpus/train/pos"));
        assert_eq!(config.test_pattern().unwrap().to_string(), "corpus/test/*.txt");
    }

    #[test]
    fn test_explicit_pattern_overrides() {
        let config = RunnerConfig {
            test: Some("elsewhere/*.text".to_string()),
            ..RunnerConfig::with_data_dir("corpus")
        };
        assert_eq!(config.test_pattern().unwrap().to_string(), "elsewhere/*.text");
    }

    #[test]
    fn test_output_path() {
        let mut config = RunnerConfig {
            output_dir: PathBuf::from("out"),
            ..RunnerConfig::default()
        };
        assert_eq!(config.output_path(), PathBuf::from("out/results_nb_both_gram.csv"));

        config.output = Some(PathBuf::from("preds.csv"));
        assert_eq!(config.output_path(), PathBuf::from("preds.csv"));
    }

    #[test]
    fn test_validate() {
        assert!(RunnerConfig::default().validate().is_ok());

        let empty = RunnerConfig { feature_sets: vec![], ..RunnerConfig::default() };
        assert!(matches!(empty.validate(), Err(TextClfError::ConfigError(_))));

        let bad_split = RunnerConfig { test_size: 1.0, ..RunnerConfig::default() };
        assert!(bad_split.validate().is_err());

        let zero_jobs = RunnerConfig { n_jobs: Some(0), ..RunnerConfig::default() };
        assert!(zero_jobs.validate().is_err());

        let grid = ParamGrid::new().add(
            "clf__alpha",
            vec![ParameterValue::Float(0.1), ParameterValue::Float(1.0)],
        );
        let search_without_cv = RunnerConfig { param_grid: grid.clone(), ..RunnerConfig::default() };
        assert!(search_without_cv.validate().is_err());

        let search = RunnerConfig { param_grid: grid, perform_cv: true, ..RunnerConfig::default() };
        assert!(search.validate().is_ok());

        let no_values = ParamGrid::new().add("clf__alpha", vec![]);
        for perform_cv in [false, true] {
            let config = RunnerConfig { param_grid: no_values.clone(), perform_cv, ..RunnerConfig::default() };
            assert!(matches!(config.validate(), Err(TextClfError::ConfigError(_))));
        }
    }
}
