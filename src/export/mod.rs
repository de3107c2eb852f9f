//! Writing test-set predictions
//!
//! Results are written as CSV with a `file,label` header, one row per test
//! document, in the order given.

use crate::error::Result;
use crate::feature_engineering::FeatureSet;
use crate::training::{ClassifierKind, Label};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Predicted label for one test document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub file: String,
    pub label: Label,
}

/// `<output_dir>/results_<clf>_<feature+feature>[_cv].csv`
pub fn default_output_path(
    output_dir: &Path,
    classifier: ClassifierKind,
    features: &[FeatureSet],
    cross_validated: bool,
) -> PathBuf {
    let feature_part = features.iter().map(|f| f.name()).collect::<Vec<_>>().join("+");
    let suffix = if cross_validated { "_cv" } else { "" };
    output_dir.join(format!("results_{}_{}{}.csv", classifier.name(), feature_part, suffix))
}

/// Write `predictions` to `path`, creating parent directories
pub fn write_predictions(path: &Path, predictions: &[Prediction]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let files: Vec<String> = predictions.iter().map(|p| p.file.clone()).collect();
    let labels: Vec<i64> = predictions.iter().map(|p| p.label as i64).collect();
    let mut df = df!("file" => files, "label" => labels)?;

    let mut file = std::fs::File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;

    info!(path = %path.display(), rows = df.height(), "wrote predictions");
    Ok(())
}
