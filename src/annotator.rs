//! Gaussian Process time-series annotator.
//!
//! [`TsAnnotator`] wraps a [`MultiOutputGpClassifier`] with the window
//! reshaping, probability aggregation and persistence needed to annotate
//! series from sliding windows.
//!
//! # Example
//!
//! ```rust,no_run
//! use ndarray::Array3;
//! use tsannotator::{PredictorConfig, TsAnnotationSchema, TsAnnotator};
//!
//! # fn main() -> tsannotator::Result<()> {
//! let schema = TsAnnotationSchema::new(vec!["rest", "active"], vec!["signal"]);
//! let mut annotator = TsAnnotator::new(schema, PredictorConfig::new(8))?;
//!
//! let train: Array3<f64> = Array3::zeros((16, 8, 4));
//! annotator.fit(train.view())?;
//! annotator.save("model")?;
//! # Ok(())
//! # }
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use bincode::Options;
use chrono::{DateTime, Utc};
use ndarray::{Array2, ArrayView2, ArrayView3, Axis, s};
use serde::{Deserialize, Serialize};

use crate::aggregate::{StepProbabilities, average_by_step};
use crate::config::PredictorConfig;
use crate::error::{AnnotatorError, Result};
use crate::gp::{GpSettings, MultiOutputGpClassifier};
use crate::metrics::weighted_f1;
use crate::schema::TsAnnotationSchema;
use crate::window::{inference_matrices, training_matrices};

/// File name of the serialized annotator inside a model directory.
pub const PREDICTOR_FILE_NAME: &str = "predictor.joblib";

/// Information recorded about a fitted annotator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name/identifier.
    pub name: String,
    /// Crate version that trained the model.
    pub version: String,
    /// Training timestamp.
    pub trained_at: Option<DateTime<Utc>>,
    /// Number of training windows.
    pub training_windows: usize,
    /// Flattened features per window.
    pub n_features: usize,
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            name: TsAnnotator::MODEL_NAME.to_string(),
            version: crate::VERSION.to_string(),
            trained_at: None,
            training_windows: 0,
            n_features: 0,
        }
    }
}

/// Gaussian Process time-series annotator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsAnnotator {
    schema: TsAnnotationSchema,
    config: PredictorConfig,
    model: MultiOutputGpClassifier,
    is_trained: bool,
    metadata: ModelMetadata,
}

impl TsAnnotator {
    /// Identifier stored in the model metadata.
    pub const MODEL_NAME: &'static str = "Gaussian_Process_Timeseries_Annotator";

    /// Create an untrained annotator.
    pub fn new(schema: TsAnnotationSchema, config: PredictorConfig) -> Result<Self> {
        schema.validate()?;
        config.validate()?;
        let model = Self::build_model(&schema, &config);
        Ok(Self {
            schema,
            config,
            model,
            is_trained: false,
            metadata: ModelMetadata::default(),
        })
    }

    /// Build a fresh multi-output GP classifier for the given settings.
    pub fn build_model(
        schema: &TsAnnotationSchema,
        config: &PredictorConfig,
    ) -> MultiOutputGpClassifier {
        let n_jobs = config.worker_threads();
        tracing::debug!(n_jobs, strategy = ?config.multi_class, "building GP classifier");
        MultiOutputGpClassifier::new(
            GpSettings::from_config(config),
            schema.num_classes(),
            n_jobs,
        )
    }

    /// Train on windows of exactly `encode_len` steps.
    pub fn fit(&mut self, train_data: ArrayView3<'_, f64>) -> Result<()> {
        if self.is_trained {
            return Err(AnnotatorError::other("annotator is already trained"));
        }

        let (x, y) = training_matrices(train_data, self.config.encode_len)?;
        tracing::info!(
            windows = x.nrows(),
            features = x.ncols(),
            outputs = y.ncols(),
            "fitting GP annotator"
        );

        self.model.fit(x.view(), y.view())?;

        self.is_trained = true;
        self.metadata.trained_at = Some(Utc::now());
        self.metadata.training_windows = x.nrows();
        self.metadata.n_features = x.ncols();
        Ok(())
    }

    /// Annotate windows of at least `encode_len` steps.
    ///
    /// Returns one probability row per `(series id, time id)`, averaged over
    /// every window covering it and sorted by key.
    pub fn predict(&self, data: ArrayView3<'_, f64>) -> Result<StepProbabilities> {
        self.ensure_trained()?;
        let (x, keys) = inference_matrices(data, self.config.encode_len)?;

        let num_classes = self.schema.num_classes();
        let per_output: Vec<Array2<f64>> = self
            .model
            .predict_proba(x.view())?
            .into_iter()
            .map(|probs| {
                if probs.ncols() > num_classes {
                    probs.slice(s![.., ..num_classes]).to_owned()
                } else {
                    probs
                }
            })
            .collect();

        let views: Vec<ArrayView2<'_, f64>> = per_output.iter().map(|p| p.view()).collect();
        let stacked = ndarray::stack(Axis(1), &views)
            .map_err(|e| AnnotatorError::internal(format!("failed to stack predictions: {e}")))?;

        let result = average_by_step(keys.view(), stacked.view())?;
        tracing::debug!(windows = x.nrows(), steps = result.len(), "annotated windows");
        Ok(result)
    }

    /// Weighted F1 of per-step predictions against the target column.
    pub fn evaluate(&self, test_data: ArrayView3<'_, f64>) -> Result<f64> {
        self.ensure_trained()?;
        let (x, y) = training_matrices(test_data, self.config.encode_len)?;
        let predicted = self.model.predict(x.view())?;

        let y_true: Vec<i64> = y.iter().copied().collect();
        let y_pred: Vec<i64> = predicted.iter().copied().collect();
        let f1 = weighted_f1(&y_true, &y_pred)?;
        tracing::info!(f1, steps = y_true.len(), "evaluated GP annotator");
        Ok(f1)
    }

    /// Write the annotator to `model_dir/predictor.joblib`.
    pub fn save<P: AsRef<Path>>(&self, model_dir: P) -> Result<()> {
        self.ensure_trained()?;
        let path = model_dir.as_ref().join(PREDICTOR_FILE_NAME);

        let mut writer = BufWriter::new(File::create(&path)?);
        bincode::serialize_into(&mut writer, self)?;
        writer.flush()?;

        tracing::info!(path = %path.display(), "saved GP annotator");
        Ok(())
    }

    /// Read an annotator previously written by [`TsAnnotator::save`].
    pub fn load<P: AsRef<Path>>(model_dir: P) -> Result<Self> {
        let path = model_dir.as_ref().join(PREDICTOR_FILE_NAME);
        if !path.is_file() {
            return Err(AnnotatorError::not_fitted(format!(
                "no saved model at {}",
                path.display()
            )));
        }

        // a valid model never decodes more bytes than the file holds
        let limit = std::fs::metadata(&path)?.len();
        let reader = BufReader::new(File::open(&path)?);
        let annotator: TsAnnotator = bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .allow_trailing_bytes()
            .with_limit(limit)
            .deserialize_from(reader)?;

        tracing::info!(path = %path.display(), "loaded GP annotator");
        Ok(annotator)
    }

    fn ensure_trained(&self) -> Result<()> {
        if self.is_trained {
            Ok(())
        } else {
            Err(AnnotatorError::not_fitted(format!(
                "{} must be trained before use",
                Self::MODEL_NAME
            )))
        }
    }

    /// Whether `fit` has completed.
    pub fn is_trained(&self) -> bool {
        self.is_trained
    }

    /// The annotation schema.
    pub fn schema(&self) -> &TsAnnotationSchema {
        &self.schema
    }

    /// The hyperparameters.
    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Training metadata.
    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// The underlying multi-output classifier.
    pub fn model(&self) -> &MultiOutputGpClassifier {
        &self.model
    }
}
