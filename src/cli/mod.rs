//! textclf CLI Module
//!
//! Command-line interface for running one text-classification experiment.

use clap::Parser;
use colored::*;
use std::path::PathBuf;

use crate::config::RunnerConfig;
use crate::error::Result;
use crate::experiment::{ExperimentReport, ExperimentRunner, ProgressListener, Stage};
use crate::feature_engineering::FeatureSet;
use crate::optimizer::{format_parameter_set, parse_grid_entry, ParamGrid};
use crate::training::ClassifierKind;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn kv(key: &str, val: &str) {
    println!("  {:<18} {}", muted(key), val.white());
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "textclf")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Text classification experiment runner")]
#[command(long_about = None)]
pub struct Cli {
    /// Feature sets to combine (both_gram, unigram, bigram, tfidf)
    #[arg(long = "selected_features", num_args = 1.., default_value = "both_gram")]
    pub selected_features: Vec<String>,

    /// Classifier (nb, log_reg, lin_svm, sgd)
    #[arg(long = "selected_classifier", default_value = "nb")]
    pub selected_classifier: String,

    /// Run a cross-validated grid search instead of a single fit
    #[arg(long = "perform_cv")]
    pub perform_cv: bool,

    /// Directory holding train/neg, train/pos and test [env: TEXTCLF_DATA_DIR, default ../data]
    #[arg(long = "data_dir")]
    pub data_dir: Option<PathBuf>,

    /// Negative training files, e.g. corpus/neg/*.txt
    #[arg(long = "train_neg")]
    pub train_neg: Option<String>,

    /// Positive training files
    #[arg(long = "train_pos")]
    pub train_pos: Option<String>,

    /// Unlabeled test files
    #[arg(long = "test")]
    pub test: Option<String>,

    /// Predictions file (overrides --output_dir naming)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory for the predictions file [env: TEXTCLF_OUTPUT_DIR, default results]
    #[arg(long = "output_dir")]
    pub output_dir: Option<PathBuf>,

    /// Split / shuffle seed [env: TEXTCLF_SEED, default 42]
    #[arg(long)]
    pub seed: Option<u64>,

    /// Fraction of training documents held out for validation
    #[arg(long = "test_size", default_value_t = crate::config::DEFAULT_TEST_SIZE)]
    pub test_size: f64,

    /// Cross-validation folds [env: TEXTCLF_CV_FOLDS, default 5]
    #[arg(long = "cv_folds")]
    pub cv_folds: Option<usize>,

    /// Threads for fold fitting (default: all cores)
    #[arg(long = "n_jobs")]
    pub n_jobs: Option<usize>,

    /// Grid entry NAME=V1,V2,... (repeatable), e.g. clf__alpha=0.1,1.0
    #[arg(long = "param", value_name = "NAME=VALUES")]
    pub params: Vec<String>,

    /// Save a JSON run report to this path
    #[arg(long = "save_report")]
    pub save_report: Option<PathBuf>,
}

impl Cli {
    /// Environment-backed defaults overridden by the given flags.
    ///
    /// Unknown feature or classifier names fail here.
    pub fn to_config(&self) -> Result<RunnerConfig> {
        let defaults = RunnerConfig::default();

        let feature_sets = self
            .selected_features
            .iter()
            .map(|name| name.parse())
            .collect::<Result<Vec<FeatureSet>>>()?;
        let classifier: ClassifierKind = self.selected_classifier.parse()?;

        let mut param_grid = ParamGrid::new();
        for entry in &self.params {
            let (name, values) = parse_grid_entry(entry)?;
            param_grid = param_grid.add(name, values);
        }

        Ok(RunnerConfig {
            data_dir: self.data_dir.clone().unwrap_or(defaults.data_dir),
            train_neg: self.train_neg.clone(),
            train_pos: self.train_pos.clone(),
            test: self.test.clone(),
            output: self.output.clone(),
            output_dir: self.output_dir.clone().unwrap_or(defaults.output_dir),
            feature_sets,
            classifier,
            perform_cv: self.perform_cv,
            param_grid,
            seed: self.seed.unwrap_or(defaults.seed),
            test_size: self.test_size,
            cv_folds: self.cv_folds.unwrap_or(defaults.cv_folds),
            n_jobs: self.n_jobs,
            report_path: self.save_report.clone(),
        })
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

struct ConsoleProgress;

impl ProgressListener for ConsoleProgress {
    fn stage_started(&mut self, stage: Stage) {
        step_run(stage.description());
    }

    fn stage_finished(&mut self, _stage: Stage, detail: &str) {
        step_done(detail);
    }
}

fn print_results(report: &ExperimentReport) {
    section("Results");

    let evaluation = &report.evaluation;
    if let Some(best_params) = &evaluation.best_params {
        kv("Best params", &format_parameter_set(best_params));
    }
    kv("Overall accuracy", &format!("{:.4}", evaluation.overall_accuracy));
    if report.perform_cv {
        kv("Validation acc.", &format!("{:.4}", evaluation.accuracy));
    }

    println!();
    for line in evaluation.classification_report.to_string().lines() {
        println!("  {}", line);
    }
    println!();

    kv("Predictions", &format!("{} rows → {}", report.predictions.len(), report.output_path.display()));
    println!();
}

pub fn cmd_run(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.to_config()?;

    section("Experiment");
    kv("Classifier", config.classifier.name());
    kv(
        "Features",
        &config.feature_sets.iter().map(|f| f.name()).collect::<Vec<_>>().join(", "),
    );
    kv(
        "Cross-validation",
        &if config.perform_cv {
            format!("{} folds, {} combinations", config.cv_folds, config.param_grid.n_combinations())
        } else {
            "off".to_string()
        },
    );
    println!();

    let runner = ExperimentRunner::new(config)?;
    let report = runner.run_with_progress(&mut ConsoleProgress)?;

    print_results(&report);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TextClfError;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["textclf"]).unwrap();
        assert_eq!(cli.selected_features, vec!["both_gram"]);
        assert_eq!(cli.selected_classifier, "nb");
        assert!(!cli.perform_cv);

        let config = cli.to_config().unwrap();
        assert_eq!(config.feature_sets, vec![FeatureSet::BothGram]);
        assert_eq!(config.classifier, ClassifierKind::Nb);
        assert!(config.param_grid.is_empty());
    }

    #[test]
    fn test_original_flags() {
        let cli = Cli::try_parse_from([
            "textclf",
            "--selected_features",
            "both_gram",
            "tfidf",
            "--selected_classifier",
            "lin_svm",
            "--perform_cv",
        ])
        .unwrap();

        let config = cli.to_config().unwrap();
        assert_eq!(config.feature_sets, vec![FeatureSet::BothGram, FeatureSet::Tfidf]);
        assert_eq!(config.classifier, ClassifierKind::LinSvm);
        assert!(config.perform_cv);
    }

    #[test]
    fn test_params_and_overrides() {
        let cli = Cli::try_parse_from([
            "textclf",
            "--param",
            "clf__alpha=0.1,1.0",
            "--param",
            "features__both_gram__ngram_max=1,2",
            "--seed",
            "7",
            "--data_dir",
            "corpus",
            "--n_jobs",
            "2",
        ])
        .unwrap();

        let config = cli.to_config().unwrap();
        assert_eq!(config.param_grid.n_combinations(), 4);
        assert_eq!(config.seed, 7);
        assert_eq!(config.data_dir, PathBuf::from("corpus"));
        assert_eq!(config.n_jobs, Some(2));
    }

    #[test]
    fn test_unknown_names() {
        let cli = Cli::try_parse_from(["textclf", "--selected_classifier", "forest"]).unwrap();
        assert!(matches!(cli.to_config(), Err(TextClfError::UnknownClassifier(_))));

        let cli = Cli::try_parse_from(["textclf", "--selected_features", "trigram"]).unwrap();
        assert!(matches!(cli.to_config(), Err(TextClfError::UnknownFeature(_))));
    }

    #[test]
    fn test_malformed_param() {
        let cli = Cli::try_parse_from(["textclf", "--param", "clf__alpha"]).unwrap();
        assert!(matches!(cli.to_config(), Err(TextClfError::ConfigError(_))));
    }
}
