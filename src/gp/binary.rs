//! Binary Gaussian Process classification with the Laplace approximation.
//!
//! The latent posterior mode is found with Newton iterations on
//! `log p(y | f) + log p(f | X)`, using the numerically stable
//! `B = I + W^1/2 K W^1/2` formulation. Predictions approximate the
//! logistic-Gaussian integral with `sigmoid(kappa * mean)`,
//! `kappa = 1 / sqrt(1 + pi * var / 8)`.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{AnnotatorError, Result};
use crate::gp::kernel::RbfKernel;
use crate::gp::linalg::{
    cholesky_with_jitter, solve_lower, solve_lower_columns, solve_lower_transposed,
};

/// Convergence threshold on the Newton objective.
const NEWTON_TOLERANCE: f64 = 1e-10;

/// A fitted binary GP classifier predicting `P(y = 1 | x)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryGpClassifier {
    kernel: RbfKernel,
    x_train: Array2<f64>,
    /// `y - pi` at the posterior mode.
    residual: Array1<f64>,
    /// `W^1/2` at the posterior mode.
    sqrt_w: Array1<f64>,
    /// Cholesky factor of `B` at the posterior mode.
    l: Array2<f64>,
    log_marginal_likelihood: f64,
}

/// Factors of the Laplace approximation at a given latent vector.
struct LaplaceFactors {
    pi: Array1<f64>,
    sqrt_w: Array1<f64>,
    l: Array2<f64>,
}

impl LaplaceFactors {
    fn at(k: &Array2<f64>, f: &Array1<f64>) -> Result<Self> {
        let pi = f.mapv(sigmoid);
        let sqrt_w = pi.mapv(|p| (p * (1.0 - p)).sqrt());
        let n = f.len();
        let b = Array2::from_shape_fn((n, n), |(i, j)| {
            let identity = if i == j { 1.0 } else { 0.0 };
            identity + sqrt_w[i] * k[[i, j]] * sqrt_w[j]
        });
        let l = cholesky_with_jitter(b.view())?;
        Ok(Self { pi, sqrt_w, l })
    }
}

impl BinaryGpClassifier {
    /// Fit on `x` with binary targets `y` (0.0 or 1.0).
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        kernel: RbfKernel,
        max_iter: usize,
    ) -> Result<Self> {
        let n = x.nrows();
        if n == 0 {
            return Err(AnnotatorError::shape("cannot fit a GP on zero samples"));
        }
        if y.len() != n {
            return Err(AnnotatorError::shape(format!(
                "expected {n} targets, found {}",
                y.len()
            )));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(AnnotatorError::numerical("training features contain NaN or infinity"));
        }

        let k = kernel.gram(x);
        let signs = y.mapv(|t| 2.0 * t - 1.0);
        let mut f = Array1::<f64>::zeros(n);
        let mut a = Array1::<f64>::zeros(n);
        let mut previous = f64::NEG_INFINITY;

        for _ in 0..max_iter.max(1) {
            let factors = LaplaceFactors::at(&k, &f)?;
            let w = factors.sqrt_w.mapv(|s| s * s);
            let b = &w * &f + &(&y - &factors.pi);
            let kb = k.dot(&b);
            let scaled = &factors.sqrt_w * &kb;
            let inner = solve_lower_transposed(
                factors.l.view(),
                solve_lower(factors.l.view(), scaled.view()).view(),
            );
            a = &b - &(&factors.sqrt_w * &inner);
            f = k.dot(&a);

            let objective = newton_objective(&a, &f, &signs);
            if objective - previous < NEWTON_TOLERANCE {
                break;
            }
            previous = objective;
        }

        let factors = LaplaceFactors::at(&k, &f)?;
        let log_det: f64 = factors.l.diag().iter().map(|v| v.ln()).sum();
        let log_marginal_likelihood = newton_objective(&a, &f, &signs) - log_det;

        Ok(Self {
            kernel,
            x_train: x.to_owned(),
            residual: &y - &factors.pi,
            sqrt_w: factors.sqrt_w,
            l: factors.l,
            log_marginal_likelihood,
        })
    }

    /// Fit every candidate kernel and keep the one with the highest
    /// log-marginal likelihood.
    pub fn fit_best(
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        candidates: &[RbfKernel],
        max_iter: usize,
    ) -> Result<Self> {
        let mut best: Option<Self> = None;
        let mut last_error = None;

        for &kernel in candidates {
            match Self::fit(x, y, kernel, max_iter) {
                Ok(model) => {
                    let better = best
                        .as_ref()
                        .is_none_or(|b| model.log_marginal_likelihood > b.log_marginal_likelihood);
                    if better {
                        best = Some(model);
                    }
                }
                Err(e) => {
                    tracing::trace!(?kernel, error = %e, "skipping kernel candidate");
                    last_error = Some(e);
                }
            }
        }

        match best {
            Some(model) => {
                tracing::debug!(
                    constant = model.kernel.constant,
                    length_scale = model.kernel.length_scale,
                    lml = model.log_marginal_likelihood,
                    "selected kernel"
                );
                Ok(model)
            }
            None => Err(last_error
                .unwrap_or_else(|| AnnotatorError::config("no kernel candidates to fit"))),
        }
    }

    /// Probability of the positive class for each row of `x`.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.x_train.ncols() {
            return Err(AnnotatorError::shape(format!(
                "expected {} features, found {}",
                self.x_train.ncols(),
                x.ncols()
            )));
        }

        let k_star = self.kernel.cross(self.x_train.view(), x);
        let mean = k_star.t().dot(&self.residual);
        let weighted = &k_star * &self.sqrt_w.view().insert_axis(Axis(1));
        let v = solve_lower_columns(self.l.view(), weighted.view());
        let explained = v.map_axis(Axis(0), |column| column.dot(&column));

        let prior = self.kernel.diag();
        Ok(ndarray::Zip::from(&mean)
            .and(&explained)
            .map_collect(|&m, &e| {
                let var = (prior - e).max(0.0);
                let kappa = 1.0 / (1.0 + std::f64::consts::PI * var / 8.0).sqrt();
                sigmoid(kappa * m)
            }))
    }

    /// Approximate log-marginal likelihood of the training data.
    pub fn log_marginal_likelihood(&self) -> f64 {
        self.log_marginal_likelihood
    }

    /// Kernel the classifier was fitted with.
    pub fn kernel(&self) -> RbfKernel {
        self.kernel
    }

    /// Number of input features.
    pub fn n_features(&self) -> usize {
        self.x_train.ncols()
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// `log(1 + exp(x))` without overflow.
fn softplus(x: f64) -> f64 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

fn newton_objective(a: &Array1<f64>, f: &Array1<f64>, signs: &Array1<f64>) -> f64 {
    let log_likelihood: f64 = signs
        .iter()
        .zip(f.iter())
        .map(|(s, fi)| -softplus(-s * fi))
        .sum();
    -0.5 * a.dot(f) + log_likelihood
}
