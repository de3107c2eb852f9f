//! Linear model implementations

use super::{check_fit_input, check_n_features, sigmoid};
use crate::error::{Result, TextClfError};
use crate::optimizer::ParameterValue;
use crate::utils::sparse::{add_scaled_row, matvec, SparseMatrix};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Logistic regression for binary classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: Option<f64>,
    /// Whether to fit intercept
    pub fit_intercept: bool,
    /// Regularization strength (L2)
    pub alpha: f64,
    /// Maximum iterations
    pub max_iter: usize,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
    /// Learning rate
    pub learning_rate: f64,
    #[serde(default)]
    converged: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    /// Create a new logistic regression model
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            fit_intercept: true,
            alpha: 0.01,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
            converged: false,
        }
    }

    pub fn set_param(&mut self, name: &str, value: &ParameterValue) -> Result<()> {
        let bad = |reason: &str| TextClfError::invalid_parameter(name, value, reason);
        match name {
            "alpha" => self.alpha = value.as_float().filter(|&a| a >= 0.0).ok_or_else(|| bad("expected float >= 0"))?,
            "max_iter" => self.max_iter = value.as_usize().filter(|&n| n > 0).ok_or_else(|| bad("expected integer > 0"))?,
            "tol" => self.tol = value.as_float().filter(|&t| t > 0.0).ok_or_else(|| bad("expected float > 0"))?,
            "learning_rate" => {
                self.learning_rate = value.as_float().filter(|&lr| lr > 0.0).ok_or_else(|| bad("expected float > 0"))?
            }
            "fit_intercept" => self.fit_intercept = value.as_bool().ok_or_else(|| bad("expected bool"))?,
            _ => return Err(bad("unknown logistic regression parameter")),
        }
        Ok(())
    }

    /// Fit the model using batch gradient descent
    pub fn fit(&mut self, x: &SparseMatrix, y: &Array1<f64>) -> Result<&mut Self> {
        check_fit_input(x, y)?;
        let n_samples = x.rows() as f64;

        let y01 = y.mapv(|v| if v > 0.5 { 1.0 } else { 0.0 });
        let mut weights = Array1::zeros(x.cols());
        let mut bias = 0.0;
        let mut converged = false;

        for iteration in 0..self.max_iter {
            let predictions = (matvec(x, &weights) + bias).mapv(sigmoid);
            let errors = &predictions - &y01;

            // Xᵀ·errors, accumulated over the nonzeros
            let mut dw = Array1::zeros(x.cols());
            for (row, &err) in x.outer_iterator().zip(errors.iter()) {
                if err != 0.0 {
                    add_scaled_row(&mut dw, err, &row);
                }
            }
            dw /= n_samples;
            dw.scaled_add(self.alpha, &weights);
            let db = if self.fit_intercept { errors.mean().unwrap_or(0.0) } else { 0.0 };

            let grad_norm = (dw.dot(&dw) + db * db).sqrt();
            if grad_norm < self.tol {
                debug!(iterations = iteration + 1, "logistic regression converged");
                converged = true;
                break;
            }

            weights.scaled_add(-self.learning_rate, &dw);
            bias -= self.learning_rate * db;
        }

        if !converged {
            warn!(max_iter = self.max_iter, "logistic regression did not converge; consider raising max_iter");
        }

        self.coefficients = Some(weights);
        self.intercept = Some(bias);
        self.converged = converged;

        Ok(self)
    }

    /// Whether the last fit reached the gradient tolerance before `max_iter`
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Probability of the positive class
    pub fn predict_proba(&self, x: &SparseMatrix) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(TextClfError::ModelNotFitted)?;
        check_n_features(coefficients.len(), x)?;

        Ok((matvec(x, coefficients) + self.intercept.unwrap_or(0.0)).mapv(sigmoid))
    }

    /// Predict class labels
    pub fn predict(&self, x: &SparseMatrix) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }
}
