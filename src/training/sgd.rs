//! Linear classifier trained by stochastic gradient descent
//!
//! Supports hinge, log and modified-Huber losses with L2 regularization.
//! Processes one sample at a time in a seeded shuffled order. The weight
//! vector is kept as `scale * v` so the per-sample L2 shrink costs O(1) and
//! each update only touches the sample's nonzero features.

use super::{check_fit_input, check_n_features, sigmoid};
use crate::error::{Result, TextClfError};
use crate::optimizer::ParameterValue;
use crate::utils::sparse::{add_scaled_row, matvec, row_dot, SparseMatrix, SparseRow};
use ndarray::Array1;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SGDLoss {
    Hinge,          // SVM-like
    Log,            // Logistic regression
    ModifiedHuber,  // Smooth hinge
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LearningRateSchedule {
    Constant,
    Optimal,     // 1 / (alpha * (t + t0))
    InvScaling,  // eta0 / t^power_t
    Adaptive,    // Halve when loss stops improving
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SGDConfig {
    pub loss: SGDLoss,
    pub learning_rate: LearningRateSchedule,
    pub eta0: f64,
    pub alpha: f64,         // L2 regularization strength
    pub max_iter: usize,
    pub tol: f64,
    pub power_t: f64,       // For InvScaling schedule
    pub random_state: Option<u64>,
}

impl Default for SGDConfig {
    fn default() -> Self {
        Self {
            loss: SGDLoss::Hinge,
            learning_rate: LearningRateSchedule::Optimal,
            eta0: 0.01,
            alpha: 0.0001,
            max_iter: 1000,
            tol: 1e-3,
            power_t: 0.5,
            random_state: Some(42),
        }
    }
}

fn get_lr(config: &SGDConfig, t: usize) -> f64 {
    match config.learning_rate {
        LearningRateSchedule::Constant => config.eta0,
        LearningRateSchedule::Optimal => {
            let t0 = 1.0 / (config.alpha * config.eta0);
            1.0 / (config.alpha * (t as f64 + t0))
        }
        LearningRateSchedule::InvScaling => {
            config.eta0 / (t as f64 + 1.0).powf(config.power_t)
        }
        LearningRateSchedule::Adaptive => config.eta0, // adjusted by the caller
    }
}

/// Below this the weight scale is folded back into the weights
const MIN_WEIGHT_SCALE: f64 = 1e-9;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SGDClassifier {
    pub config: SGDConfig,
    pub weights: Option<Array1<f64>>,
    pub bias: f64,
}

impl Default for SGDClassifier {
    fn default() -> Self {
        Self::new(SGDConfig::default())
    }
}

impl SGDClassifier {
    pub fn new(config: SGDConfig) -> Self {
        Self { config, weights: None, bias: 0.0 }
    }

    pub fn set_param(&mut self, name: &str, value: &ParameterValue) -> Result<()> {
        let bad = |reason: &str| TextClfError::invalid_parameter(name, value, reason);
        match name {
            "loss" => {
                self.config.loss = match value.as_string() {
                    Some("hinge") => SGDLoss::Hinge,
                    Some("log") | Some("log_loss") => SGDLoss::Log,
                    Some("modified_huber") => SGDLoss::ModifiedHuber,
                    _ => return Err(bad("expected 'hinge', 'log_loss' or 'modified_huber'")),
                }
            }
            "learning_rate" => {
                self.config.learning_rate = match value.as_string() {
                    Some("constant") => LearningRateSchedule::Constant,
                    Some("optimal") => LearningRateSchedule::Optimal,
                    Some("invscaling") => LearningRateSchedule::InvScaling,
                    Some("adaptive") => LearningRateSchedule::Adaptive,
                    _ => return Err(bad("expected 'constant', 'optimal', 'invscaling' or 'adaptive'")),
                }
            }
            "alpha" => self.config.alpha = value.as_float().filter(|&a| a > 0.0).ok_or_else(|| bad("expected float > 0"))?,
            "eta0" => self.config.eta0 = value.as_float().filter(|&e| e > 0.0).ok_or_else(|| bad("expected float > 0"))?,
            "max_iter" => self.config.max_iter = value.as_usize().filter(|&n| n > 0).ok_or_else(|| bad("expected integer > 0"))?,
            "tol" => self.config.tol = value.as_float().filter(|&t| t > 0.0).ok_or_else(|| bad("expected float > 0"))?,
            "power_t" => self.config.power_t = value.as_float().ok_or_else(|| bad("expected float"))?,
            _ => return Err(bad("unknown SGD parameter")),
        }
        Ok(())
    }

    pub fn fit(&mut self, x: &SparseMatrix, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let n = x.rows();
        let p = x.cols();
        let rows: Vec<SparseRow<'_>> = x.outer_iterator().collect();

        // Convert labels: 0/1 → -1/+1
        let y_signed: Vec<f64> = y.iter().map(|&v| if v > 0.5 { 1.0 } else { -1.0 }).collect();

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state.unwrap_or(42));
        let mut v = Array1::<f64>::zeros(p);
        let mut scale = 1.0;
        let mut b = 0.0;
        let mut indices: Vec<usize> = (0..n).collect();
        let mut prev_loss = f64::MAX;
        let mut current_eta = self.config.eta0;
        let mut t = 1usize;

        for epoch in 0..self.config.max_iter {
            indices.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for &i in &indices {
                let xi = &rows[i];
                let margin = scale * row_dot(xi, &v) + b;
                let yi = y_signed[i];

                let lr = match self.config.learning_rate {
                    LearningRateSchedule::Adaptive => current_eta,
                    _ => get_lr(&self.config, t),
                };

                let dloss = match self.config.loss {
                    SGDLoss::Hinge => {
                        if yi * margin < 1.0 {
                            epoch_loss += 1.0 - yi * margin;
                            -yi
                        } else { 0.0 }
                    }
                    SGDLoss::Log => {
                        let p = sigmoid(margin);
                        let y01 = if yi > 0.0 { 1.0 } else { 0.0 };
                        epoch_loss += -(y01 * p.max(1e-15).ln() + (1.0 - y01) * (1.0 - p).max(1e-15).ln());
                        p - y01
                    }
                    SGDLoss::ModifiedHuber => {
                        let z = yi * margin;
                        if z >= 1.0 {
                            0.0
                        } else if z >= -1.0 {
                            epoch_loss += (1.0 - z) * (1.0 - z);
                            -2.0 * (1.0 - z) * yi
                        } else {
                            epoch_loss += -4.0 * z;
                            -4.0 * yi
                        }
                    }
                };

                // Shrink, then step along the loss gradient
                let shrink = 1.0 - lr * self.config.alpha;
                if shrink > 0.0 {
                    scale *= shrink;
                } else {
                    v.fill(0.0);
                    scale = 1.0;
                }
                if dloss != 0.0 {
                    add_scaled_row(&mut v, -lr * dloss / scale, xi);
                    b -= lr * dloss;
                }
                if scale < MIN_WEIGHT_SCALE {
                    v *= scale;
                    scale = 1.0;
                }
                t += 1;
            }

            epoch_loss /= n as f64;

            if matches!(self.config.learning_rate, LearningRateSchedule::Adaptive)
                && epoch_loss > prev_loss - self.config.tol
            {
                current_eta *= 0.5;
                if current_eta < 1e-10 { break; }
            }

            if (prev_loss - epoch_loss).abs() < self.config.tol && epoch > 0 {
                debug!(epochs = epoch + 1, loss = epoch_loss, "SGD converged");
                break;
            }
            prev_loss = epoch_loss;
        }

        self.weights = Some(v * scale);
        self.bias = b;
        Ok(())
    }

    pub fn decision_function(&self, x: &SparseMatrix) -> Result<Array1<f64>> {
        let w = self.weights.as_ref().ok_or(TextClfError::ModelNotFitted)?;
        check_n_features(w.len(), x)?;
        Ok(matvec(x, w) + self.bias)
    }

    pub fn predict(&self, x: &SparseMatrix) -> Result<Array1<f64>> {
        Ok(self.decision_function(x)?.mapv(|m| if m > 0.0 { 1.0 } else { 0.0 }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::sparse::csr_from_dense;
    use ndarray::Array2;

    fn make_classification_data() -> (SparseMatrix, Array1<f64>) {
        let x = Array2::from_shape_fn((100, 2), |(i, j)| {
            let base = if i < 50 { 0.0 } else { 3.0 };
            base + ((i * 7 + j * 3) % 10) as f64 / 10.0
        });
        let y = Array1::from_vec((0..100).map(|i| if i < 50 { 0.0 } else { 1.0 }).collect());
        (csr_from_dense(&x), y)
    }

    fn accuracy(model: &SGDClassifier, x: &SparseMatrix, y: &Array1<f64>) -> f64 {
        let preds = model.predict(x).unwrap();
        preds.iter().zip(y.iter()).filter(|(p, t)| p == t).count() as f64 / y.len() as f64
    }

    #[test]
    fn test_sgd_classifier_hinge() {
        let (x, y) = make_classification_data();
        let mut model = SGDClassifier::default();
        model.fit(&x, &y).unwrap();
        let acc = accuracy(&model, &x, &y);
        assert!(acc > 0.8, "Accuracy too low: {}", acc);
    }

    #[test]
    fn test_sgd_classifier_log() {
        let (x, y) = make_classification_data();
        let config = SGDConfig { loss: SGDLoss::Log, eta0: 0.1, learning_rate: LearningRateSchedule::Constant, ..Default::default() };
        let mut model = SGDClassifier::new(config);
        model.fit(&x, &y).unwrap();
        let acc = accuracy(&model, &x, &y);
        assert!(acc > 0.8, "Accuracy too low: {}", acc);
    }

    #[test]
    fn test_sgd_deterministic() {
        let (x, y) = make_classification_data();
        let mut a = SGDClassifier::default();
        let mut b = SGDClassifier::default();
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.weights, b.weights);
    }

    #[test]
    fn test_sgd_set_param() {
        let mut model = SGDClassifier::default();
        model.set_param("loss", &ParameterValue::String("modified_huber".into())).unwrap();
        assert_eq!(model.config.loss, SGDLoss::ModifiedHuber);
        assert!(model.set_param("loss", &ParameterValue::String("squared".into())).is_err());
        assert!(model.set_param("alpha", &ParameterValue::Float(0.0)).is_err());
    }
}
