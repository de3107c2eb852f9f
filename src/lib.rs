//! textclf - Text classification experiment runner
//!
//! Loads one-document-per-file corpora, trains a feature-union + classifier
//! pipeline (optionally under a cross-validated grid search), evaluates it on
//! a held-out split and writes predictions for an unlabeled test set.
//!
//! # Modules
//!
//! ## ML layer
//! - [`feature_engineering`] - Tokenizer, count / tf-idf vectorizers, feature union
//! - [`training`] - Classifiers, train/validation and k-fold splitting, metrics
//! - [`optimizer`] - Parameter grids and grid search
//! - [`pipeline`] - Feature union followed by a classifier
//!
//! ## Runner
//! - [`config`] - Run configuration from environment and flags
//! - [`experiment`] - Stage-by-stage experiment runner and run report
//! - [`export`] - Prediction CSV writer
//! - [`utils`] - File-pattern document loading, stage timing
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// ML layer
pub mod feature_engineering;
pub mod training;
pub mod optimizer;
pub mod pipeline;

// Runner
pub mod config;
pub mod experiment;
pub mod export;
pub mod utils;
pub mod cli;

pub use error::{Result, TextClfError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, TextClfError};

    // Registries and pipeline
    pub use crate::feature_engineering::{FeatureSet, FeatureUnion, CountVectorizer, TfidfVectorizer};
    pub use crate::training::{ClassifierKind, ClassifierModel, Label, ClassificationReport};
    pub use crate::pipeline::Pipeline;

    // Search
    pub use crate::optimizer::{GridSearchCV, ParamGrid, ParameterSet, ParameterValue};

    // Runner
    pub use crate::config::RunnerConfig;
    pub use crate::experiment::{ExperimentRunner, ExperimentReport, ProgressListener, Stage};
    pub use crate::export::{write_predictions, Prediction};
    pub use crate::utils::{FilePattern, LabeledDocument};
}
