//! # tsannotator
//!
//! Gaussian Process classification for time-series annotation.
//!
//! ## Features
//!
//! - Pure Rust Laplace-approximated GP classifier
//! - One-vs-rest and one-vs-one multiclass decomposition
//! - One classifier per window step, fitted on a rayon pool
//! - Overlapping window predictions averaged per timestep
//! - Single-file model persistence

pub mod aggregate;
pub mod annotator;
pub mod cli;
pub mod config;
pub mod error;
pub mod gp;
pub mod metrics;
pub mod predictor;
pub mod schema;
pub mod window;

pub use aggregate::StepProbabilities;
pub use annotator::{PREDICTOR_FILE_NAME, TsAnnotator};
pub use config::{MultiClassStrategy, PredictorConfig};
pub use error::{AnnotatorError, Result};
pub use predictor::{
    evaluate_predictor_model, load_predictor_model, predict_with_model, save_predictor_model,
    train_predictor_model,
};
pub use schema::TsAnnotationSchema;
pub use window::PADDING_VALUE;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
