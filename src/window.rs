//! Window tensor reshaping.
//!
//! Windows are `(N, T, D)` tensors whose last axis is laid out as
//! `[series id, time id, covariates..., target]`. Inference tensors carry no
//! target column.

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis, s};

use crate::error::{AnnotatorError, Result};

/// Reserved time id marking padded, non-real timesteps.
pub const PADDING_VALUE: f64 = -9999.0;

/// Flatten training windows into a feature matrix and per-step labels.
///
/// Returns `X` with shape `(N, T * F)` built from the covariate columns and
/// `y` with shape `(N, T)` built from the target column.
pub fn training_matrices(
    data: ArrayView3<'_, f64>,
    encode_len: usize,
) -> Result<(Array2<f64>, Array2<i64>)> {
    let (n, t, d) = data.dim();
    if t != encode_len {
        return Err(AnnotatorError::shape(format!(
            "Training data expected to have {encode_len} length on axis 1. Found length {t}"
        )));
    }
    if n == 0 {
        return Err(AnnotatorError::shape("Training data contains no windows"));
    }
    if d < 3 {
        return Err(AnnotatorError::shape(format!(
            "Training data needs id, time and target columns on axis 2. Found {d} columns"
        )));
    }

    let x = flatten_steps(data.slice(s![.., .., 2..d - 1]))?;

    let targets = data.slice(s![.., .., d - 1]);
    if let Some(bad) = targets.iter().find(|v| !v.is_finite()) {
        return Err(AnnotatorError::shape(format!(
            "Training targets must be finite class indices, found {bad}"
        )));
    }
    let y = targets.mapv(|v| v as i64);

    Ok((x, y))
}

/// Flatten inference windows into a feature matrix and per-step keys.
///
/// Windows longer than `encode_len` keep their trailing `encode_len` steps.
/// Returns `X` with shape `(N, encode_len * F)` and the `(series id, time id)`
/// keys with shape `(N, encode_len, 2)`.
pub fn inference_matrices(
    data: ArrayView3<'_, f64>,
    encode_len: usize,
) -> Result<(Array2<f64>, Array3<f64>)> {
    let (n, t, d) = data.dim();
    if t < encode_len {
        return Err(AnnotatorError::shape(format!(
            "Inference data length expected to be >= {encode_len} on axis 1. Found length {t}"
        )));
    }
    if n == 0 {
        return Err(AnnotatorError::shape("Inference data contains no windows"));
    }
    if d < 2 {
        return Err(AnnotatorError::shape(format!(
            "Inference data needs id and time columns on axis 2. Found {d} columns"
        )));
    }

    let offset = t - encode_len;
    let x = flatten_steps(data.slice(s![.., offset.., 2..]))?;
    let keys = data.slice(s![.., offset.., 0..2]).to_owned();

    Ok((x, keys))
}

/// Collapse the step and feature axes of a window view, step-major.
fn flatten_steps(view: ArrayView3<'_, f64>) -> Result<Array2<f64>> {
    let (n, t, f) = view.dim();
    // Logical iteration order is row-major, matching the (n, t * f) layout.
    let flat: Vec<f64> = view.iter().copied().collect();
    Array2::from_shape_vec((n, t * f), flat)
        .map_err(|e| AnnotatorError::internal(format!("failed to flatten windows: {e}")))
}

/// Cut per-series tables into fixed-length windows.
///
/// Each table is `(rows, D)` with rows ordered by time. Series shorter than
/// `window_len` are left-padded with rows whose time id is [`PADDING_VALUE`]
/// and whose remaining columns are zero. The last window of every series is
/// always emitted even when `stride` does not land on it.
pub fn sliding_windows(
    series: &[ArrayView2<'_, f64>],
    window_len: usize,
    stride: usize,
) -> Result<Array3<f64>> {
    if window_len == 0 || stride == 0 {
        return Err(AnnotatorError::shape(
            "window length and stride must both be at least 1",
        ));
    }
    let Some(first) = series.first() else {
        return Err(AnnotatorError::shape("no series to window"));
    };
    let d = first.ncols();
    if d < 2 {
        return Err(AnnotatorError::shape(format!(
            "series need id and time columns, found {d} columns"
        )));
    }

    let mut windows: Vec<Array2<f64>> = Vec::new();
    for (index, table) in series.iter().enumerate() {
        if table.ncols() != d {
            return Err(AnnotatorError::shape(format!(
                "series {index} has {} columns, expected {d}",
                table.ncols()
            )));
        }
        let rows = table.nrows();
        if rows == 0 {
            return Err(AnnotatorError::shape(format!("series {index} is empty")));
        }

        if rows < window_len {
            let mut padded = Array2::zeros((window_len, d));
            let pad = window_len - rows;
            padded.slice_mut(s![..pad, 0]).fill(table[[0, 0]]);
            padded.slice_mut(s![..pad, 1]).fill(PADDING_VALUE);
            padded.slice_mut(s![pad.., ..]).assign(table);
            windows.push(padded);
            continue;
        }

        let last_start = rows - window_len;
        let mut start = 0;
        loop {
            windows.push(table.slice(s![start..start + window_len, ..]).to_owned());
            if start == last_start {
                break;
            }
            start = (start + stride).min(last_start);
        }
    }

    let views: Vec<ArrayView2<'_, f64>> = windows.iter().map(|w| w.view()).collect();
    ndarray::stack(Axis(0), &views)
        .map_err(|e| AnnotatorError::internal(format!("failed to stack windows: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Two windows of three steps: id, time, two covariates, target.
    fn train_windows() -> Array3<f64> {
        let mut data = Array3::zeros((2, 3, 5));
        for w in 0..2 {
            for step in 0..3 {
                let time = (w + step) as f64;
                data[[w, step, 0]] = 7.0;
                data[[w, step, 1]] = time;
                data[[w, step, 2]] = time * 10.0;
                data[[w, step, 3]] = time * 100.0;
                data[[w, step, 4]] = (step % 2) as f64;
            }
        }
        data
    }

    #[test]
    fn test_training_matrices_layout() {
        let data = train_windows();
        let (x, y) = training_matrices(data.view(), 3).unwrap();

        assert_eq!(x.dim(), (2, 6));
        assert_eq!(x.row(0).to_vec(), vec![0.0, 0.0, 10.0, 100.0, 20.0, 200.0]);
        assert_eq!(x.row(1).to_vec(), vec![10.0, 100.0, 20.0, 200.0, 30.0, 300.0]);
        assert_eq!(y, array![[0, 1, 0], [0, 1, 0]]);
    }

    #[test]
    fn test_training_rejects_wrong_length() {
        let data = train_windows();
        let err = training_matrices(data.view(), 4).unwrap_err();
        assert!(matches!(err, AnnotatorError::Shape(_)));
        assert!(err.to_string().contains("Found length 3"));

        assert!(training_matrices(data.view(), 2).is_err());
    }

    #[test]
    fn test_training_rejects_nan_target() {
        let mut data = train_windows();
        data[[1, 2, 4]] = f64::NAN;
        assert!(training_matrices(data.view(), 3).is_err());
    }

    #[test]
    fn test_inference_matrices_keeps_trailing_steps() {
        let data = train_windows();
        let inference = data.slice(s![.., .., 0..4]).to_owned();

        let (x, keys) = inference_matrices(inference.view(), 2).unwrap();
        assert_eq!(x.dim(), (2, 4));
        assert_eq!(x.row(0).to_vec(), vec![10.0, 100.0, 20.0, 200.0]);
        assert_eq!(keys.dim(), (2, 2, 2));
        assert_eq!(keys[[0, 0, 1]], 1.0);
        assert_eq!(keys[[1, 1, 1]], 3.0);
        assert_eq!(keys[[1, 1, 0]], 7.0);
    }

    #[test]
    fn test_inference_rejects_short_windows() {
        let data = train_windows();
        let err = inference_matrices(data.view(), 4).unwrap_err();
        assert!(matches!(err, AnnotatorError::Shape(_)));
    }

    #[test]
    fn test_sliding_windows_strides_and_tail() {
        let table = Array2::from_shape_fn((5, 3), |(row, col)| match col {
            0 => 1.0,
            1 => row as f64,
            _ => row as f64 * 2.0,
        });
        let windows = sliding_windows(&[table.view()], 3, 2).unwrap();

        // starts at 0 and 2, which is also the last start
        assert_eq!(windows.dim(), (2, 3, 3));
        assert_eq!(windows[[1, 0, 1]], 2.0);

        let windows = sliding_windows(&[table.view()], 2, 2).unwrap();
        // starts at 0, 2 and the tail start 3
        assert_eq!(windows.dim(), (3, 2, 3));
        assert_eq!(windows[[2, 0, 1]], 3.0);
    }

    #[test]
    fn test_sliding_windows_pads_short_series() {
        let table = array![[4.0, 0.0, 1.5], [4.0, 1.0, 2.5]];
        let windows = sliding_windows(&[table.view()], 4, 1).unwrap();

        assert_eq!(windows.dim(), (1, 4, 3));
        assert_eq!(windows[[0, 0, 0]], 4.0);
        assert_eq!(windows[[0, 0, 1]], PADDING_VALUE);
        assert_eq!(windows[[0, 1, 1]], PADDING_VALUE);
        assert_eq!(windows[[0, 1, 2]], 0.0);
        assert_eq!(windows[[0, 2, 1]], 0.0);
        assert_eq!(windows[[0, 3, 2]], 2.5);
    }

    #[test]
    fn test_sliding_windows_rejects_mismatched_columns() {
        let a = Array2::<f64>::zeros((3, 3));
        let b = Array2::<f64>::zeros((3, 4));
        assert!(sliding_windows(&[a.view(), b.view()], 2, 1).is_err());
        assert!(sliding_windows(&[a.view()], 2, 0).is_err());
    }
}
