//! Classification metrics

use super::Label;
use crate::error::{Result, TextClfError};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

fn check_same_length(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(TextClfError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(TextClfError::ValidationError("Cannot score an empty prediction set".to_string()));
    }
    Ok(())
}

/// Fraction of predictions equal to the true label
pub fn accuracy_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_same_length(y_true, y_pred)?;
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| (*t - *p).abs() < 0.5)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

fn safe_div(num: f64, denom: f64) -> f64 {
    if denom > 0.0 { num / denom } else { 0.0 }
}

/// Precision, recall and F1 for a single class (or an average)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Per-class report over the binary labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// One entry per label, both labels always present
    pub classes: Vec<(Label, ClassMetrics)>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        check_same_length(y_true, y_pred)?;
        let total = y_true.len();

        let classes: Vec<(Label, ClassMetrics)> = Label::ALL
            .iter()
            .map(|&label| {
                let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
                for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
                    let is_true = Label::from_prediction(t) == label;
                    let is_pred = Label::from_prediction(p) == label;
                    match (is_true, is_pred) {
                        (true, true) => tp += 1,
                        (false, true) => fp += 1,
                        (true, false) => fn_ += 1,
                        (false, false) => {}
                    }
                }

                let precision = safe_div(tp as f64, (tp + fp) as f64);
                let recall = safe_div(tp as f64, (tp + fn_) as f64);
                let f1_score = safe_div(2.0 * precision * recall, precision + recall);

                (label, ClassMetrics { precision, recall, f1_score, support: tp + fn_ })
            })
            .collect();

        let n_classes = classes.len() as f64;
        let macro_avg = ClassMetrics {
            precision: classes.iter().map(|(_, m)| m.precision).sum::<f64>() / n_classes,
            recall: classes.iter().map(|(_, m)| m.recall).sum::<f64>() / n_classes,
            f1_score: classes.iter().map(|(_, m)| m.f1_score).sum::<f64>() / n_classes,
            support: total,
        };

        let weighted = |f: fn(&ClassMetrics) -> f64| {
            classes.iter().map(|(_, m)| f(m) * m.support as f64).sum::<f64>() / total as f64
        };
        let weighted_avg = ClassMetrics {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1_score: weighted(|m| m.f1_score),
            support: total,
        };

        Ok(Self {
            classes,
            accuracy: accuracy_score(y_true, y_pred)?,
            macro_avg,
            weighted_avg,
        })
    }

    pub fn class(&self, label: Label) -> Option<&ClassMetrics> {
        self.classes.iter().find(|(l, _)| *l == label).map(|(_, m)| m)
    }

    pub fn total_support(&self) -> usize {
        self.macro_avg.support
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, name: &str, m: &ClassMetrics) -> fmt::Result {
    writeln!(
        f,
        "{:>12}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
        name, m.precision, m.recall, m.f1_score, m.support
    )
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>12}  {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for (label, metrics) in &self.classes {
            write_row(f, &label.to_string(), metrics)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12}  {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.total_support()
        )?;
        write_row(f, "macro avg", &self.macro_avg)?;
        write_row(f, "weighted avg", &self.weighted_avg)
    }
}
