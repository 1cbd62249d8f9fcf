//! Dense Cholesky factorisation and triangular solves.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{AnnotatorError, Result};

/// Lower-triangular `L` with `L * L^T = a`.
pub fn cholesky(a: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(AnnotatorError::numerical(format!(
            "cholesky needs a square matrix, got {}x{}",
            n,
            a.ncols()
        )));
    }

    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut diag = a[[j, j]];
        for k in 0..j {
            diag -= l[[j, k]] * l[[j, k]];
        }
        if diag <= 0.0 || !diag.is_finite() {
            return Err(AnnotatorError::numerical(format!(
                "matrix is not positive definite (pivot {j} = {diag})"
            )));
        }
        let pivot = diag.sqrt();
        l[[j, j]] = pivot;

        for i in j + 1..n {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = sum / pivot;
        }
    }
    Ok(l)
}

/// Diagonal jitter tried after a failed factorisation, smallest first.
const JITTER_STEPS: [f64; 5] = [1e-10, 1e-9, 1e-8, 1e-7, 1e-6];

/// [`cholesky`], retried with growing diagonal jitter when `a` is only
/// numerically positive semi-definite.
pub fn cholesky_with_jitter(a: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
    let first = match cholesky(a) {
        Ok(l) => return Ok(l),
        Err(err) if a.nrows() != a.ncols() => return Err(err),
        Err(err) => err,
    };

    let mut jittered = a.to_owned();
    let mut applied = 0.0;
    for jitter in JITTER_STEPS {
        jittered.diag_mut().mapv_inplace(|v| v + (jitter - applied));
        applied = jitter;
        if let Ok(l) = cholesky(jittered.view()) {
            tracing::debug!(jitter, "cholesky succeeded after adding jitter");
            return Ok(l);
        }
    }
    Err(first)
}

/// Solve `L x = b` by forward substitution.
pub fn solve_lower(l: ArrayView2<'_, f64>, b: ArrayView1<'_, f64>) -> Array1<f64> {
    let n = b.len();
    let mut x = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }
    x
}

/// Solve `L^T x = b` by back substitution.
pub fn solve_lower_transposed(l: ArrayView2<'_, f64>, b: ArrayView1<'_, f64>) -> Array1<f64> {
    let n = b.len();
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = b[i];
        for k in i + 1..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }
    x
}

/// Solve `L X = B` column by column.
pub fn solve_lower_columns(l: ArrayView2<'_, f64>, b: ArrayView2<'_, f64>) -> Array2<f64> {
    let mut x = Array2::<f64>::zeros(b.raw_dim());
    for (mut out, column) in x.axis_iter_mut(Axis(1)).zip(b.axis_iter(Axis(1))) {
        out.assign(&solve_lower(l, column));
    }
    x
}
