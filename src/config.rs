//! Hyperparameters for the Gaussian Process annotator.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AnnotatorError, Result};

/// Strategy used to decompose a multiclass problem into binary GPs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiClassStrategy {
    /// One binary classifier per class against all others.
    #[default]
    OneVsRest,
    /// One binary classifier per pair of classes.
    OneVsOne,
}

/// Kernel hyperparameters and their search bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Signal variance of the constant kernel.
    pub constant: f64,
    /// RBF length scale.
    pub length_scale: f64,
    /// Bounds for the constant during grid search.
    pub constant_bounds: (f64, f64),
    /// Bounds for the length scale during grid search.
    pub length_scale_bounds: (f64, f64),
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            constant: 1.0,
            length_scale: 1.0,
            constant_bounds: (1e-2, 1e2),
            length_scale_bounds: (1e-2, 1e2),
        }
    }
}

/// Configuration for [`crate::annotator::TsAnnotator`].
///
/// Deserialized from the hyperparameters JSON file; every field but
/// `encode_len` has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// Encoding (history) length; training windows must have exactly this many steps.
    pub encode_len: usize,
    /// Multiclass decomposition strategy.
    #[serde(default)]
    pub multi_class: MultiClassStrategy,
    /// Kernel hyperparameters.
    #[serde(default)]
    pub kernel: KernelConfig,
    /// Search kernel hyperparameters by log-marginal likelihood.
    #[serde(default = "default_optimize")]
    pub optimize: bool,
    /// Grid points per hyperparameter axis when optimizing.
    #[serde(default = "default_grid_points")]
    pub grid_points: usize,
    /// Newton iterations for the Laplace mode.
    #[serde(default = "default_max_iter_predict")]
    pub max_iter_predict: usize,
    /// Worker threads for parallel fitting. `None` uses all cores but one.
    #[serde(default)]
    pub n_jobs: Option<usize>,
}

fn default_optimize() -> bool {
    true
}

fn default_grid_points() -> usize {
    5
}

fn default_max_iter_predict() -> usize {
    100
}

impl PredictorConfig {
    /// Create a configuration with default settings for the given encode length.
    pub fn new(encode_len: usize) -> Self {
        Self {
            encode_len,
            multi_class: MultiClassStrategy::default(),
            kernel: KernelConfig::default(),
            optimize: default_optimize(),
            grid_points: default_grid_points(),
            max_iter_predict: default_max_iter_predict(),
            n_jobs: None,
        }
    }

    /// Load hyperparameters from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: PredictorConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the multiclass strategy.
    pub fn with_multi_class(mut self, strategy: MultiClassStrategy) -> Self {
        self.multi_class = strategy;
        self
    }

    /// Enable or disable the hyperparameter search.
    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    /// Set the worker count.
    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = Some(n_jobs);
        self
    }

    /// Worker threads to use for fitting.
    pub fn worker_threads(&self) -> usize {
        self.n_jobs
            .unwrap_or_else(|| num_cpus::get().saturating_sub(1))
            .max(1)
    }

    /// Reject settings the classifier cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.encode_len == 0 {
            return Err(AnnotatorError::config("encode_len must be at least 1"));
        }
        if self.max_iter_predict == 0 {
            return Err(AnnotatorError::config("max_iter_predict must be at least 1"));
        }
        if self.optimize && self.grid_points == 0 {
            return Err(AnnotatorError::config(
                "grid_points must be at least 1 when optimize is enabled",
            ));
        }

        let kernel = &self.kernel;
        for (name, value, (low, high)) in [
            ("constant", kernel.constant, kernel.constant_bounds),
            ("length_scale", kernel.length_scale, kernel.length_scale_bounds),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(AnnotatorError::config(format!(
                    "{name} must be positive, got {value}"
                )));
            }
            if !(low > 0.0 && low <= high && high.is_finite()) {
                return Err(AnnotatorError::config(format!(
                    "{name} bounds must satisfy 0 < low <= high, got ({low}, {high})"
                )));
            }
        }

        Ok(())
    }
}
