//! Exhaustive grid search with k-fold cross-validation

use super::search_space::{format_parameter_set, ParamGrid, ParameterSet};
use crate::error::{Result, TextClfError};
use crate::pipeline::Pipeline;
use crate::training::{accuracy_score, CVResults, CVSplit, StratifiedKFold};
use ndarray::{Array1, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Scores of one parameter combination across all folds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult {
    pub params: ParameterSet,
    pub cv: CVResults,
    /// 1 for the best mean score
    pub rank: usize,
    /// Summed fit + score time over folds
    pub duration_secs: f64,
}

/// Serializable outcome of a search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSearchSummary {
    pub best_params: ParameterSet,
    pub best_score: f64,
    pub n_splits: usize,
    pub candidates: Vec<CandidateResult>,
}

/// Grid search over pipeline parameters
///
/// Every (combination, fold) pair trains its own clone of the unfitted
/// pipeline on borrowed document slices, so fold fits share no state and run
/// on the rayon pool. The best combination by mean accuracy is refit on all
/// of the data.
#[derive(Debug, Clone)]
pub struct GridSearchCV {
    estimator: Pipeline,
    param_grid: ParamGrid,
    cv: StratifiedKFold,
    n_jobs: Option<usize>,
    candidates: Vec<CandidateResult>,
    best_index: Option<usize>,
    best_estimator: Option<Pipeline>,
}

impl GridSearchCV {
    /// Stratified `n_folds`-fold search over `param_grid`
    pub fn new(estimator: Pipeline, param_grid: ParamGrid, n_folds: usize) -> Self {
        Self {
            estimator,
            param_grid,
            cv: StratifiedKFold::new(n_folds),
            n_jobs: None,
            candidates: Vec::new(),
            best_index: None,
            best_estimator: None,
        }
    }

    /// Limit fold fitting to `n` threads; `None` uses the global pool
    pub fn with_n_jobs(mut self, n_jobs: Option<usize>) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    pub fn param_grid(&self) -> &ParamGrid {
        &self.param_grid
    }

    pub fn fit<S: AsRef<str> + Sync>(&mut self, documents: &[S], y: &Array1<f64>) -> Result<()> {
        if documents.len() != y.len() {
            return Err(TextClfError::ShapeError {
                expected: format!("{} labels", documents.len()),
                actual: format!("{} labels", y.len()),
            });
        }

        if let Some(name) = self.param_grid.empty_parameter() {
            return Err(TextClfError::invalid_parameter(name, "[]", "needs at least one value"));
        }

        let combinations = self.param_grid.combinations();
        let splits = self.cv.split(y)?;
        let n_splits = splits.len();

        info!(
            n_candidates = combinations.len(),
            n_splits,
            n_fits = combinations.len() * n_splits,
            "starting grid search"
        );

        let tasks: Vec<(usize, &CVSplit)> = (0..combinations.len())
            .flat_map(|c| splits.iter().map(move |split| (c, split)))
            .collect();

        let run = || {
            tasks
                .par_iter()
                .map(|&(c, split)| self.evaluate_fold(&combinations[c], split, documents, y))
                .collect::<Result<Vec<(f64, f64)>>>()
        };

        let fold_results = match self.n_jobs {
            Some(n_jobs) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n_jobs)
                    .build()
                    .map_err(|e| TextClfError::ThreadPoolError(e.to_string()))?;
                pool.install(run)?
            }
            None => run()?,
        };

        let mut candidates: Vec<CandidateResult> = combinations
            .into_iter()
            .zip(fold_results.chunks(n_splits))
            .map(|(params, folds)| CandidateResult {
                params,
                cv: CVResults::from_scores(folds.iter().map(|(score, _)| *score).collect()),
                rank: 0,
                duration_secs: folds.iter().map(|(_, secs)| *secs).sum(),
            })
            .collect();

        // Stable sort keeps grid order among equal means, so ties rank the earlier combination first
        let mut order: Vec<usize> = (0..candidates.len()).collect();
        order.sort_by(|&a, &b| {
            candidates[b]
                .cv
                .mean_score
                .partial_cmp(&candidates[a].cv.mean_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for (rank, &idx) in order.iter().enumerate() {
            candidates[idx].rank = rank + 1;
        }

        let best_index = order
            .first()
            .copied()
            .ok_or_else(|| TextClfError::TrainingError("Grid search produced no candidates".to_string()))?;

        for candidate in &candidates {
            debug!(
                rank = candidate.rank,
                mean = candidate.cv.mean_score,
                std = candidate.cv.std_score,
                params = %format_parameter_set(&candidate.params),
                "candidate scored"
            );
        }

        let mut best_estimator = self.estimator.clone();
        best_estimator.set_params(&candidates[best_index].params)?;
        best_estimator.fit(documents, y)?;

        info!(
            best_score = candidates[best_index].cv.mean_score,
            best_params = %format_parameter_set(&candidates[best_index].params),
            "grid search finished, best candidate refit on full data"
        );

        self.candidates = candidates;
        self.best_index = Some(best_index);
        self.best_estimator = Some(best_estimator);
        Ok(())
    }

    /// Fit a fresh pipeline on the fold's train indices and score its test indices.
    ///
    /// Returns `(accuracy, seconds)`.
    fn evaluate_fold<S: AsRef<str> + Sync>(
        &self,
        params: &ParameterSet,
        split: &CVSplit,
        documents: &[S],
        y: &Array1<f64>,
    ) -> Result<(f64, f64)> {
        let start = Instant::now();

        let select = |indices: &[usize]| -> Vec<&str> {
            indices.iter().map(|&i| documents[i].as_ref()).collect()
        };
        let train_docs = select(&split.train_indices);
        let test_docs = select(&split.test_indices);
        let y_train = y.select(Axis(0), &split.train_indices);
        let y_test = y.select(Axis(0), &split.test_indices);

        let mut pipeline = self.estimator.clone();
        pipeline.set_params(params)?;
        pipeline.fit(&train_docs, &y_train)?;
        let score = accuracy_score(&y_test, &pipeline.predict(&test_docs)?)?;

        let secs = start.elapsed().as_secs_f64();
        info!(
            fold = split.fold_idx + 1,
            score,
            secs,
            params = %format_parameter_set(params),
            "CV fold done"
        );

        Ok((score, secs))
    }

    pub fn is_fitted(&self) -> bool {
        self.best_estimator.is_some()
    }

    pub fn best_params(&self) -> Option<&ParameterSet> {
        self.best_index.map(|i| &self.candidates[i].params)
    }

    /// Mean cross-validated accuracy of the best combination
    pub fn best_score(&self) -> Option<f64> {
        self.best_index.map(|i| self.candidates[i].cv.mean_score)
    }

    pub fn best_estimator(&self) -> Option<&Pipeline> {
        self.best_estimator.as_ref()
    }

    pub fn cv_results(&self) -> &[CandidateResult] {
        &self.candidates
    }

    pub fn summary(&self) -> Option<GridSearchSummary> {
        let best = &self.candidates[self.best_index?];
        Some(GridSearchSummary {
            best_params: best.params.clone(),
            best_score: best.cv.mean_score,
            n_splits: best.cv.n_folds,
            candidates: self.candidates.clone(),
        })
    }

    /// Predict with the refit best pipeline
    pub fn predict<S: AsRef<str> + Sync>(&self, documents: &[S]) -> Result<Array1<f64>> {
        self.best_estimator
            .as_ref()
            .ok_or(TextClfError::ModelNotFitted)?
            .predict(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::ParameterValue;

    fn corpus() -> (Vec<String>, Array1<f64>) {
        let neg = ["bad", "awful", "terrible", "boring", "dull", "poor"];
        let pos = ["good", "great", "wonderful", "fun", "superb", "lovely"];
        let mut docs = Vec::new();
        let mut labels = Vec::new();
        for i in 0..10 {
            docs.push(format!("{} {} film", neg[i % neg.len()], neg[(i + 1) % neg.len()]));
            labels.push(0.0);
            docs.push(format!("{} {} film", pos[i % pos.len()], pos[(i + 2) % pos.len()]));
            labels.push(1.0);
        }
        (docs, Array1::from_vec(labels))
    }

    #[test]
    fn test_empty_grid_matches_plain_fit() {
        let (docs, y) = corpus();
        let pipeline = Pipeline::from_names(&["both_gram"], "nb").unwrap();

        let mut plain = pipeline.clone();
        plain.fit(&docs, &y).unwrap();

        let mut search = GridSearchCV::new(pipeline, ParamGrid::new(), 5);
        search.fit(&docs, &y).unwrap();

        assert_eq!(search.cv_results().len(), 1);
        assert_eq!(search.cv_results()[0].cv.n_folds, 5);
        assert!(search.best_params().unwrap().is_empty());
        assert_eq!(search.predict(&docs).unwrap(), plain.predict(&docs).unwrap());
    }

    #[test]
    fn test_grid_ranks_candidates() {
        let (docs, y) = corpus();
        let pipeline = Pipeline::from_names(&["unigram"], "nb").unwrap();
        let grid = ParamGrid::new().add(
            "clf__alpha",
            vec![ParameterValue::Float(0.1), ParameterValue::Float(1.0)],
        );

        let mut search = GridSearchCV::new(pipeline, grid, 5).with_n_jobs(Some(2));
        search.fit(&docs, &y).unwrap();

        let results = search.cv_results();
        assert_eq!(results.len(), 2);
        let mut ranks: Vec<usize> = results.iter().map(|r| r.rank).collect();
        ranks.sort();
        assert_eq!(ranks, vec![1, 2]);

        let best = search.best_score().unwrap();
        assert!((0.0..=1.0).contains(&best));
        assert!(results.iter().all(|r| r.cv.mean_score <= best));
        assert!(search.best_params().unwrap().contains_key("clf__alpha"));

        let summary = search.summary().unwrap();
        assert_eq!(summary.n_splits, 5);
        assert_eq!(summary.best_score, best);
    }

    #[test]
    fn test_invalid_parameter_surfaces() {
        let (docs, y) = corpus();
        let pipeline = Pipeline::from_names(&["both_gram"], "nb").unwrap();
        let grid = ParamGrid::new().add("clf__gamma", vec![ParameterValue::Float(0.1)]);

        let mut search = GridSearchCV::new(pipeline, grid, 5);
        assert!(matches!(search.fit(&docs, &y), Err(TextClfError::InvalidParameter { .. })));
        assert!(!search.is_fitted());
    }

    #[test]
    fn test_parameter_without_values_rejected() {
        let (docs, y) = corpus();
        let pipeline = Pipeline::from_names(&["both_gram"], "nb").unwrap();
        let grid = ParamGrid::new().add("clf__alpha", vec![]);

        let mut search = GridSearchCV::new(pipeline, grid, 5);
        assert!(matches!(search.fit(&docs, &y), Err(TextClfError::InvalidParameter { .. })));
        assert!(!search.is_fitted());
    }

    #[test]
    fn test_predict_before_fit() {
        let pipeline = Pipeline::from_names(&["both_gram"], "nb").unwrap();
        let search = GridSearchCV::new(pipeline, ParamGrid::new(), 5);
        assert!(matches!(search.predict(&["x".to_string()]), Err(TextClfError::ModelNotFitted)));
        assert!(search.summary().is_none());
    }
}
