//! Per-timestep averaging of overlapping window predictions.

use std::cmp::Ordering;

use ndarray::{Array1, Array2, ArrayView1, ArrayView3, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{AnnotatorError, Result};
use crate::window::PADDING_VALUE;

/// Class probabilities per `(series id, time id)`, sorted by key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepProbabilities {
    /// `(series id, time id)` for each row of `probabilities`.
    pub keys: Vec<(f64, f64)>,
    /// One row per key, one column per annotation class.
    pub probabilities: Array2<f64>,
}

impl StepProbabilities {
    /// Number of timesteps.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no timestep survived aggregation.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of annotation classes per row.
    pub fn num_classes(&self) -> usize {
        self.probabilities.ncols()
    }

    /// Probabilities for a single timestep.
    pub fn get(&self, series_id: f64, time_id: f64) -> Option<ArrayView1<'_, f64>> {
        let target = (series_id + 0.0, time_id + 0.0);
        self.keys
            .binary_search_by(|key| compare_keys(key, &target))
            .ok()
            .map(|row| self.probabilities.row(row))
    }

    /// Most probable class index per timestep.
    pub fn labels(&self) -> Array1<usize> {
        self.probabilities.map_axis(Axis(1), |row| {
            let mut best = 0;
            for (index, &p) in row.iter().enumerate() {
                if p > row[best] {
                    best = index;
                }
            }
            best
        })
    }

    /// Drop the keys and keep the `(steps, classes)` matrix.
    pub fn into_matrix(self) -> Array2<f64> {
        self.probabilities
    }
}

fn compare_keys(a: &(f64, f64), b: &(f64, f64)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1))
}

/// Average per-step predictions across windows.
///
/// `keys` is `(N, S, 2)` holding `(series id, time id)` per window step and
/// `probs` is `(N, S, C)`. Steps sharing a key are averaged elementwise; steps
/// whose time id equals [`PADDING_VALUE`] are dropped.
pub fn average_by_step(
    keys: ArrayView3<'_, f64>,
    probs: ArrayView3<'_, f64>,
) -> Result<StepProbabilities> {
    let (n, s, width) = keys.dim();
    if width != 2 {
        return Err(AnnotatorError::shape(format!(
            "step keys need 2 columns (series id, time id), found {width}"
        )));
    }
    let (pn, ps, classes) = probs.dim();
    if (pn, ps) != (n, s) {
        return Err(AnnotatorError::shape(format!(
            "keys cover {n}x{s} steps but probabilities cover {pn}x{ps}"
        )));
    }

    let mut entries: Vec<((f64, f64), usize, usize)> = Vec::with_capacity(n * s);
    for window in 0..n {
        for step in 0..s {
            let time = keys[[window, step, 1]];
            if time == PADDING_VALUE {
                continue;
            }
            // Adding zero folds -0.0 into 0.0 so both land on the same key.
            let key = (keys[[window, step, 0]] + 0.0, time + 0.0);
            entries.push((key, window, step));
        }
    }
    entries.sort_by(|a, b| compare_keys(&a.0, &b.0));

    let mut out_keys: Vec<(f64, f64)> = Vec::new();
    let mut rows: Vec<f64> = Vec::new();
    let mut start = 0;
    while start < entries.len() {
        let key = entries[start].0;
        let mut end = start;
        let mut sum = Array1::<f64>::zeros(classes);
        while end < entries.len() && compare_keys(&entries[end].0, &key) == Ordering::Equal {
            let (_, window, step) = entries[end];
            sum += &probs.slice(ndarray::s![window, step, ..]);
            end += 1;
        }
        sum /= (end - start) as f64;
        out_keys.push(key);
        rows.extend(sum.iter());
        start = end;
    }

    let probabilities = Array2::from_shape_vec((out_keys.len(), classes), rows)
        .map_err(|e| AnnotatorError::internal(format!("failed to assemble probabilities: {e}")))?;

    Ok(StepProbabilities {
        keys: out_keys,
        probabilities,
    })
}
