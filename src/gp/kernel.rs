//! Covariance functions.

use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::config::KernelConfig;

/// `constant * exp(-|a - b|^2 / (2 * length_scale^2))`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RbfKernel {
    /// Signal variance.
    pub constant: f64,
    /// Length scale shared by every feature.
    pub length_scale: f64,
}

impl Default for RbfKernel {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

impl RbfKernel {
    /// Create a kernel with the given signal variance and length scale.
    pub fn new(constant: f64, length_scale: f64) -> Self {
        Self {
            constant,
            length_scale,
        }
    }

    /// Kernel with the configured starting hyperparameters.
    pub fn from_config(config: &KernelConfig) -> Self {
        Self::new(config.constant, config.length_scale)
    }

    /// Candidate kernels for the hyperparameter search.
    ///
    /// The configured kernel comes first, followed by a log-spaced
    /// `points x points` grid over the configured bounds.
    pub fn grid(config: &KernelConfig, points: usize) -> Vec<Self> {
        let mut candidates = vec![Self::from_config(config)];
        let constants = log_space(config.constant_bounds, points);
        let length_scales = log_space(config.length_scale_bounds, points);
        for &constant in &constants {
            for &length_scale in &length_scales {
                let kernel = Self::new(constant, length_scale);
                if !candidates.contains(&kernel) {
                    candidates.push(kernel);
                }
            }
        }
        candidates
    }

    /// Evaluate the kernel for a pair of points.
    pub fn eval(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        let squared: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
        self.constant * (-0.5 * squared / (self.length_scale * self.length_scale)).exp()
    }

    /// Prior variance at any single point.
    pub fn diag(&self) -> f64 {
        self.constant
    }

    /// Covariance matrix of a set of points with itself.
    pub fn gram(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        let n = x.nrows();
        let mut k = Array2::zeros((n, n));
        for i in 0..n {
            k[[i, i]] = self.diag();
            for j in 0..i {
                let value = self.eval(x.row(i), x.row(j));
                k[[i, j]] = value;
                k[[j, i]] = value;
            }
        }
        k
    }

    /// Cross covariance with shape `(a.nrows(), b.nrows())`.
    pub fn cross(&self, a: ArrayView2<'_, f64>, b: ArrayView2<'_, f64>) -> Array2<f64> {
        Array2::from_shape_fn((a.nrows(), b.nrows()), |(i, j)| {
            self.eval(a.row(i), b.row(j))
        })
    }
}

fn log_space((low, high): (f64, f64), points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![(low * high).sqrt()],
        _ => {
            let (log_low, log_high) = (low.ln(), high.ln());
            let step = (log_high - log_low) / (points - 1) as f64;
            (0..points)
                .map(|i| (log_low + step * i as f64).exp())
                .collect()
        }
    }
}
