//! Linear support vector classifier
//!
//! Solves the dual of the L2-regularized squared-hinge (or hinge) SVM by
//! coordinate descent over a shuffled sample order. The intercept is learned
//! as the weight of a constant synthetic feature.

use super::{check_fit_input, check_n_features};
use crate::error::{Result, TextClfError};
use crate::optimizer::ParameterValue;
use crate::utils::sparse::{add_scaled_row, matvec, row_dot, row_norm_sq, SparseMatrix, SparseRow};
use ndarray::Array1;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Loss optimized by [`LinearSVC`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SvmLoss {
    Hinge,
    SquaredHinge,
}

/// Linear SVM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSVCConfig {
    /// Regularization parameter (C)
    pub c: f64,
    pub loss: SvmLoss,
    /// Tolerance on the projected-gradient gap
    pub tol: f64,
    /// Maximum number of passes over the data
    pub max_iter: usize,
    /// Value of the synthetic intercept feature
    pub intercept_scaling: f64,
    /// Random seed for the coordinate order
    pub random_state: Option<u64>,
}

impl Default for LinearSVCConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            loss: SvmLoss::SquaredHinge,
            tol: 1e-4,
            max_iter: 1000,
            intercept_scaling: 1.0,
            random_state: Some(42),
        }
    }
}

/// Linear Support Vector Classifier (binary)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSVC {
    config: LinearSVCConfig,
    weights: Option<Array1<f64>>,
    bias: f64,
}

impl Default for LinearSVC {
    fn default() -> Self {
        Self::new(LinearSVCConfig::default())
    }
}

impl LinearSVC {
    pub fn new(config: LinearSVCConfig) -> Self {
        Self { config, weights: None, bias: 0.0 }
    }

    pub fn config(&self) -> &LinearSVCConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.weights.is_some()
    }

    pub fn set_param(&mut self, name: &str, value: &ParameterValue) -> Result<()> {
        let bad = |reason: &str| TextClfError::invalid_parameter(name, value, reason);
        match name {
            "c" | "C" => self.config.c = value.as_float().filter(|&c| c > 0.0).ok_or_else(|| bad("expected float > 0"))?,
            "tol" => self.config.tol = value.as_float().filter(|&t| t > 0.0).ok_or_else(|| bad("expected float > 0"))?,
            "max_iter" => self.config.max_iter = value.as_usize().filter(|&n| n > 0).ok_or_else(|| bad("expected integer > 0"))?,
            "loss" => {
                self.config.loss = match value.as_string() {
                    Some("hinge") => SvmLoss::Hinge,
                    Some("squared_hinge") => SvmLoss::SquaredHinge,
                    _ => return Err(bad("expected 'hinge' or 'squared_hinge'")),
                }
            }
            "intercept_scaling" => {
                self.config.intercept_scaling = value.as_float().ok_or_else(|| bad("expected float"))?
            }
            _ => return Err(bad("unknown linear SVM parameter")),
        }
        Ok(())
    }

    /// Fit the classifier
    pub fn fit(&mut self, x: &SparseMatrix, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let n = x.rows();
        let p = x.cols();
        let rows: Vec<SparseRow<'_>> = x.outer_iterator().collect();

        let y_signed: Vec<f64> = y.iter().map(|&v| if v > 0.5 { 1.0 } else { -1.0 }).collect();
        let scaling = self.config.intercept_scaling;

        // Box constraint and diagonal shift depend on the loss
        let (upper, diag) = match self.config.loss {
            SvmLoss::Hinge => (self.config.c, 0.0),
            SvmLoss::SquaredHinge => (f64::INFINITY, 0.5 / self.config.c),
        };

        let q_diag: Vec<f64> = rows
            .iter()
            .map(|row| row_norm_sq(row) + scaling * scaling + diag)
            .collect();

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state.unwrap_or(42));
        let mut alphas = vec![0.0; n];
        let mut w = Array1::<f64>::zeros(p);
        let mut b = 0.0;
        let mut order: Vec<usize> = (0..n).collect();
        let mut converged = false;

        for epoch in 0..self.config.max_iter {
            order.shuffle(&mut rng);
            let mut pg_max = f64::NEG_INFINITY;
            let mut pg_min = f64::INFINITY;

            for &i in &order {
                let xi = &rows[i];
                let yi = y_signed[i];
                let g = yi * (row_dot(xi, &w) + b * scaling) - 1.0 + diag * alphas[i];

                let pg = if alphas[i] == 0.0 {
                    g.min(0.0)
                } else if alphas[i] == upper {
                    g.max(0.0)
                } else {
                    g
                };

                pg_max = pg_max.max(pg);
                pg_min = pg_min.min(pg);

                if pg.abs() > 1e-12 && q_diag[i] > 0.0 {
                    let old = alphas[i];
                    alphas[i] = (old - g / q_diag[i]).max(0.0).min(upper);
                    let delta = (alphas[i] - old) * yi;
                    add_scaled_row(&mut w, delta, xi);
                    b += delta * scaling;
                }
            }

            if pg_max - pg_min <= self.config.tol {
                debug!(epochs = epoch + 1, "linear SVM converged");
                converged = true;
                break;
            }
        }

        if !converged {
            warn!(max_iter = self.config.max_iter, "linear SVM did not converge; consider raising max_iter");
        }

        self.weights = Some(w);
        self.bias = b * scaling;
        Ok(())
    }

    /// Signed distance to the separating hyperplane
    pub fn decision_function(&self, x: &SparseMatrix) -> Result<Array1<f64>> {
        let w = self.weights.as_ref().ok_or(TextClfError::ModelNotFitted)?;
        check_n_features(w.len(), x)?;
        Ok(matvec(x, w) + self.bias)
    }

    pub fn predict(&self, x: &SparseMatrix) -> Result<Array1<f64>> {
        Ok(self.decision_function(x)?.mapv(|m| if m > 0.0 { 1.0 } else { 0.0 }))
    }
}
