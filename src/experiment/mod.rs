//! Experiment runner
//!
//! Runs the stages load → split → fit → predict → evaluate → report exactly
//! once. Callers that want progress output implement [`ProgressListener`].

use crate::config::RunnerConfig;
use crate::error::{Result, TextClfError};
use crate::export::{write_predictions, Prediction};
use crate::feature_engineering::FeatureSet;
use crate::optimizer::{GridSearchCV, GridSearchSummary, ParameterSet};
use crate::pipeline::Pipeline;
use crate::training::{
    accuracy_score, train_test_split, ClassificationReport, ClassifierKind, Label,
};
use crate::utils::{load_labeled, read_files_to_map, LabeledDocument, StageTiming, Timer};
use chrono::{DateTime, Utc};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Runner stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Load,
    Split,
    Fit,
    Predict,
    Evaluate,
    Report,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::Split => "split",
            Stage::Fit => "fit",
            Stage::Predict => "predict",
            Stage::Evaluate => "evaluate",
            Stage::Report => "report",
        }
    }

    /// Console wording
    pub fn description(&self) -> &'static str {
        match self {
            Stage::Load => "preparing data",
            Stage::Split => "splitting train/validation",
            Stage::Fit => "preparing feature/classifier pipeline",
            Stage::Predict => "performing prediction",
            Stage::Evaluate => "performing evaluation",
            Stage::Report => "writing results",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Receives stage boundaries while a run progresses
pub trait ProgressListener {
    fn stage_started(&mut self, _stage: Stage) {}
    fn stage_finished(&mut self, _stage: Stage, _detail: &str) {}
}

/// Listener that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressListener for NoProgress {}

/// Loaded documents
#[derive(Debug, Clone)]
pub struct Dataset {
    pub train: Vec<LabeledDocument>,
    /// Filename → text, iterated in filename order
    pub test: BTreeMap<String, String>,
}

/// Train and validation partitions as parallel texts / targets
#[derive(Debug, Clone)]
pub struct SplitData {
    pub train_docs: Vec<String>,
    pub y_train: Array1<f64>,
    pub val_docs: Vec<String>,
    pub y_val: Array1<f64>,
}

impl SplitData {
    fn from_partitions(train: Vec<LabeledDocument>, validation: Vec<LabeledDocument>) -> Self {
        let unzip = |docs: Vec<LabeledDocument>| -> (Vec<String>, Array1<f64>) {
            let y = docs.iter().map(|d| d.label.as_f64()).collect();
            (docs.into_iter().map(|d| d.text).collect(), y)
        };
        let (train_docs, y_train) = unzip(train);
        let (val_docs, y_val) = unzip(validation);
        Self { train_docs, y_train, val_docs, y_val }
    }
}

/// A trained pipeline, directly or through a grid search
#[derive(Debug, Clone)]
pub enum FittedModel {
    Plain(Pipeline),
    Searched(GridSearchCV),
}

impl FittedModel {
    pub fn predict<S: AsRef<str> + Sync>(&self, documents: &[S]) -> Result<Array1<f64>> {
        match self {
            FittedModel::Plain(p) => p.predict(documents),
            FittedModel::Searched(s) => s.predict(documents),
        }
    }

    /// Width of the feature matrix the final classifier was trained on
    pub fn n_features(&self) -> usize {
        match self {
            FittedModel::Plain(p) => p.n_features(),
            FittedModel::Searched(s) => s.best_estimator().map_or(0, |p| p.n_features()),
        }
    }

    pub fn search_summary(&self) -> Option<GridSearchSummary> {
        match self {
            FittedModel::Plain(_) => None,
            FittedModel::Searched(s) => s.summary(),
        }
    }
}

/// Validation metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    /// Accuracy on the validation partition
    pub accuracy: f64,
    /// Best mean CV accuracy when a search ran, otherwise `accuracy`
    pub overall_accuracy: f64,
    pub classification_report: ClassificationReport,
    pub best_params: Option<ParameterSet>,
}

/// Outcome of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub timestamp: DateTime<Utc>,
    pub classifier: ClassifierKind,
    pub feature_sets: Vec<FeatureSet>,
    pub perform_cv: bool,
    pub seed: u64,
    pub test_size: f64,
    pub n_train: usize,
    pub n_validation: usize,
    pub n_test: usize,
    /// Columns of the final feature matrix
    #[serde(default)]
    pub n_features: usize,
    pub evaluation: Evaluation,
    pub search: Option<GridSearchSummary>,
    pub predictions: Vec<Prediction>,
    pub output_path: PathBuf,
    pub timings: Vec<StageTiming>,
}

impl ExperimentReport {
    pub fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), "saved run report");
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Drives one experiment from a [`RunnerConfig`]
#[derive(Debug, Clone)]
pub struct ExperimentRunner {
    config: RunnerConfig,
}

impl ExperimentRunner {
    pub fn new(config: RunnerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn load_data(&self) -> Result<Dataset> {
        let train = load_labeled(&self.config.train_neg_pattern()?, &self.config.train_pos_pattern()?)?;
        let test_pattern = self.config.test_pattern()?;
        let test = read_files_to_map(&test_pattern)?;
        info!(pattern = %test_pattern, n_documents = test.len(), "loaded test documents");
        Ok(Dataset { train, test })
    }

    pub fn split(&self, dataset: &Dataset) -> Result<SplitData> {
        let (train, validation) = train_test_split(&dataset.train, self.config.test_size, self.config.seed)?;
        info!(n_train = train.len(), n_validation = validation.len(), seed = self.config.seed, "split training data");
        Ok(SplitData::from_partitions(train, validation))
    }

    /// Build the pipeline and train it, under a grid search when enabled
    pub fn fit(&self, split: &SplitData) -> Result<FittedModel> {
        let mut pipeline = Pipeline::new(&self.config.feature_sets, self.config.classifier)?;

        if self.config.perform_cv {
            let mut search = GridSearchCV::new(pipeline, self.config.param_grid.clone(), self.config.cv_folds)
                .with_n_jobs(self.config.n_jobs);
            search.fit(&split.train_docs, &split.y_train)?;
            return Ok(FittedModel::Searched(search));
        }

        if let Some(params) = self.config.param_grid.combinations().first() {
            pipeline.set_params(params)?;
        }
        pipeline.fit(&split.train_docs, &split.y_train)?;
        Ok(FittedModel::Plain(pipeline))
    }

    /// Predict every test document, keeping its filename
    pub fn predict_test(&self, model: &FittedModel, test: &BTreeMap<String, String>) -> Result<Vec<Prediction>> {
        let docs: Vec<&str> = test.values().map(String::as_str).collect();
        let predicted = model.predict(&docs)?;
        if predicted.len() != test.len() {
            return Err(TextClfError::ShapeError {
                expected: format!("{} predictions", test.len()),
                actual: format!("{} predictions", predicted.len()),
            });
        }

        Ok(test
            .keys()
            .zip(predicted.iter())
            .map(|(file, &value)| Prediction {
                file: file.clone(),
                label: Label::from_prediction(value),
            })
            .collect())
    }

    pub fn evaluate(&self, model: &FittedModel, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Evaluation> {
        let accuracy = accuracy_score(y_true, y_pred)?;
        let classification_report = ClassificationReport::compute(y_true, y_pred)?;

        let (overall_accuracy, best_params) = match model {
            FittedModel::Searched(search) => (
                search.best_score().unwrap_or(accuracy),
                search.best_params().cloned(),
            ),
            FittedModel::Plain(_) => (accuracy, None),
        };

        Ok(Evaluation {
            accuracy,
            overall_accuracy,
            classification_report,
            best_params,
        })
    }

    /// Run every stage without progress output
    pub fn run(&self) -> Result<ExperimentReport> {
        self.run_with_progress(&mut NoProgress)
    }

    pub fn run_with_progress(&self, progress: &mut dyn ProgressListener) -> Result<ExperimentReport> {
        let mut timer = Timer::start("experiment");

        progress.stage_started(Stage::Load);
        let dataset = self.load_data()?;
        timer.checkpoint(Stage::Load.name());
        progress.stage_finished(
            Stage::Load,
            &format!("{} train / {} test documents", dataset.train.len(), dataset.test.len()),
        );

        progress.stage_started(Stage::Split);
        let split = self.split(&dataset)?;
        timer.checkpoint(Stage::Split.name());
        progress.stage_finished(
            Stage::Split,
            &format!("{} train / {} validation", split.train_docs.len(), split.val_docs.len()),
        );

        progress.stage_started(Stage::Fit);
        let model = self.fit(&split)?;
        timer.checkpoint(Stage::Fit.name());
        let fit_secs = timer.timings().last().map_or(0.0, |t| t.delta_secs);
        progress.stage_finished(Stage::Fit, &format!("{} features, {:.2}s", model.n_features(), fit_secs));

        progress.stage_started(Stage::Predict);
        let y_val_pred = model.predict(&split.val_docs)?;
        let predictions = self.predict_test(&model, &dataset.test)?;
        timer.checkpoint(Stage::Predict.name());
        progress.stage_finished(Stage::Predict, &format!("{} test documents", predictions.len()));

        progress.stage_started(Stage::Evaluate);
        let evaluation = self.evaluate(&model, &split.y_val, &y_val_pred)?;
        timer.checkpoint(Stage::Evaluate.name());
        progress.stage_finished(Stage::Evaluate, &format!("accuracy {:.4}", evaluation.accuracy));

        progress.stage_started(Stage::Report);
        let output_path = self.config.output_path();
        write_predictions(&output_path, &predictions)?;
        timer.checkpoint(Stage::Report.name());
        progress.stage_finished(Stage::Report, &output_path.display().to_string());

        if evaluation.classification_report.classes.iter().any(|(_, m)| m.support == 0) {
            warn!("validation partition is missing a class; its metrics are reported as 0");
        }

        let report = ExperimentReport {
            timestamp: Utc::now(),
            classifier: self.config.classifier,
            feature_sets: self.config.feature_sets.clone(),
            perform_cv: self.config.perform_cv,
            seed: self.config.seed,
            test_size: self.config.test_size,
            n_train: split.train_docs.len(),
            n_validation: split.val_docs.len(),
            n_test: dataset.test.len(),
            n_features: model.n_features(),
            search: model.search_summary(),
            evaluation,
            predictions,
            output_path,
            timings: timer.stop_with_report(),
        };

        if let Some(path) = &self.config.report_path {
            report.save_json(path)?;
        }

        Ok(report)
    }
}
