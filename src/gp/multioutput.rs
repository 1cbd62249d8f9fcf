//! One multiclass GP per output column, fitted in parallel.

use std::sync::{Arc, OnceLock};

use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{AnnotatorError, Result};
use crate::gp::multiclass::{GaussianProcessClassifier, GpSettings};

/// Multi-output classifier: output `j` is predicted by its own
/// [`GaussianProcessClassifier`] trained on column `j` of the label matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiOutputGpClassifier {
    settings: GpSettings,
    /// Lower bound on the probability width, normally the schema class count.
    min_columns: usize,
    n_jobs: usize,
    n_features: Option<usize>,
    estimators: Vec<GaussianProcessClassifier>,
    /// Built on first use; never serialized.
    #[serde(skip)]
    pool: OnceLock<Arc<ThreadPool>>,
}

impl MultiOutputGpClassifier {
    /// Create an unfitted classifier.
    pub fn new(settings: GpSettings, min_columns: usize, n_jobs: usize) -> Self {
        Self {
            settings,
            min_columns,
            n_jobs: n_jobs.max(1),
            n_features: None,
            estimators: Vec::new(),
            pool: OnceLock::new(),
        }
    }

    fn pool(&self) -> Result<Arc<ThreadPool>> {
        if let Some(pool) = self.pool.get() {
            return Ok(Arc::clone(pool));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.n_jobs)
            .thread_name(|i| format!("gp-fit-{i}"))
            .build()
            .map_err(|e| AnnotatorError::internal(format!("Failed to create thread pool: {e}")))?;
        Ok(Arc::clone(self.pool.get_or_init(|| Arc::new(pool))))
    }

    /// Fit one classifier per column of `y`.
    pub fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView2<'_, i64>) -> Result<()> {
        if x.nrows() != y.nrows() {
            return Err(AnnotatorError::shape(format!(
                "found {} samples but {} label rows",
                x.nrows(),
                y.nrows()
            )));
        }
        if y.ncols() == 0 {
            return Err(AnnotatorError::shape("label matrix has no output columns"));
        }

        // at most one column past the schema classes
        let max_label = y.iter().copied().max().unwrap_or(0).max(0) as usize;
        if max_label > self.min_columns {
            return Err(AnnotatorError::shape(format!(
                "label {max_label} is outside the {} target classes",
                self.min_columns
            )));
        }
        let n_columns = self.min_columns.max(max_label + 1);

        let pool = self.pool()?;
        let settings = &self.settings;
        let estimators = pool.install(|| {
            (0..y.ncols())
                .into_par_iter()
                .map(|j| GaussianProcessClassifier::fit(x, y.column(j), settings, n_columns))
                .collect::<Result<Vec<_>>>()
        })?;

        self.estimators = estimators;
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn check_input(&self, x: ArrayView2<'_, f64>) -> Result<()> {
        let Some(n_features) = self.n_features else {
            return Err(AnnotatorError::not_fitted(
                "multi-output classifier has no fitted estimators",
            ));
        };
        if x.ncols() != n_features {
            return Err(AnnotatorError::shape(format!(
                "expected {n_features} features per window, found {}",
                x.ncols()
            )));
        }
        Ok(())
    }

    /// Per-output probability matrices, each `(x.nrows(), n_columns)`.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Vec<Array2<f64>>> {
        self.check_input(x)?;
        let pool = self.pool()?;
        pool.install(|| {
            self.estimators
                .par_iter()
                .map(|estimator| estimator.predict_proba(x))
                .collect()
        })
    }

    /// Most probable label per sample and output, `(x.nrows(), n_outputs)`.
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array2<i64>> {
        self.check_input(x)?;
        let pool = self.pool()?;
        let columns = pool.install(|| {
            self.estimators
                .par_iter()
                .map(|estimator| estimator.predict(x))
                .collect::<Result<Vec<_>>>()
        })?;

        let mut labels = Array2::<i64>::zeros((x.nrows(), columns.len()));
        for (j, column) in columns.iter().enumerate() {
            labels.column_mut(j).assign(column);
        }
        Ok(labels)
    }

    /// Whether `fit` has completed.
    pub fn is_fitted(&self) -> bool {
        self.n_features.is_some()
    }

    /// Number of outputs (timesteps) the model predicts.
    pub fn n_outputs(&self) -> usize {
        self.estimators.len()
    }

    /// Number of input features, once fitted.
    pub fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    /// Fitted per-output estimators.
    pub fn estimators(&self) -> &[GaussianProcessClassifier] {
        &self.estimators
    }
}
