//! Classification metrics.

use std::collections::BTreeMap;

use crate::error::{AnnotatorError, Result};

#[derive(Debug, Default, Clone, Copy)]
struct LabelCounts {
    true_positive: usize,
    false_positive: usize,
    false_negative: usize,
}

impl LabelCounts {
    fn f1(&self) -> f64 {
        let precision = ratio(self.true_positive, self.true_positive + self.false_positive);
        let recall = ratio(self.true_positive, self.true_positive + self.false_negative);
        if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        }
    }

    fn support(&self) -> usize {
        self.true_positive + self.false_negative
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// F1 score averaged over labels, weighted by each label's support in `y_true`.
///
/// Labels are the union of both inputs. A label with no predicted or no true
/// samples scores zero.
pub fn weighted_f1(y_true: &[i64], y_pred: &[i64]) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(AnnotatorError::shape(format!(
            "found {} true labels but {} predictions",
            y_true.len(),
            y_pred.len()
        )));
    }
    if y_true.is_empty() {
        return Err(AnnotatorError::shape("cannot score empty label sets"));
    }

    let mut counts: BTreeMap<i64, LabelCounts> = BTreeMap::new();
    for (&truth, &pred) in y_true.iter().zip(y_pred) {
        if truth == pred {
            counts.entry(truth).or_default().true_positive += 1;
        } else {
            counts.entry(truth).or_default().false_negative += 1;
            counts.entry(pred).or_default().false_positive += 1;
        }
    }

    let total = y_true.len() as f64;
    let weighted: f64 = counts
        .values()
        .map(|c| c.f1() * c.support() as f64)
        .sum();
    Ok(weighted / total)
}
