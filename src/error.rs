//! Error types for the tsannotator library.
//!
//! All fallible operations return [`AnnotatorError`] through the crate-wide
//! [`Result`] alias.
//!
//! # Examples
//!
//! ```
//! use tsannotator::error::{AnnotatorError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(AnnotatorError::shape("Training data expected to have 8 length on axis 1"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for annotator operations.
#[derive(Error, Debug)]
pub enum AnnotatorError {
    /// I/O errors (model files, data files).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Input tensors with the wrong shape for the requested operation.
    #[error("Shape error: {0}")]
    Shape(String),

    /// Operation needs a trained model.
    #[error("Model is not fitted yet: {0}")]
    NotFitted(String),

    /// Invalid hyperparameters.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid annotation schema.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Numerical failures (non positive-definite kernels, NaN inputs).
    #[error("Numerical error: {0}")]
    Numerical(String),

    /// Model blob encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with AnnotatorError.
pub type Result<T> = std::result::Result<T, AnnotatorError>;

impl AnnotatorError {
    /// Create a new shape error.
    pub fn shape<S: Into<String>>(msg: S) -> Self {
        AnnotatorError::Shape(msg.into())
    }

    /// Create a new not-fitted error.
    pub fn not_fitted<S: Into<String>>(msg: S) -> Self {
        AnnotatorError::NotFitted(msg.into())
    }

    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        AnnotatorError::Config(msg.into())
    }

    /// Create a new schema error.
    pub fn schema<S: Into<String>>(msg: S) -> Self {
        AnnotatorError::Schema(msg.into())
    }

    /// Create a new numerical error.
    pub fn numerical<S: Into<String>>(msg: S) -> Self {
        AnnotatorError::Numerical(msg.into())
    }

    /// Create a new serialization error.
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        AnnotatorError::Serialization(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        AnnotatorError::Other(msg.into())
    }

    /// Create a new internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        AnnotatorError::Other(format!("Internal error: {}", msg.into()))
    }

    /// Whether this error reports an untrained model.
    pub fn is_not_fitted(&self) -> bool {
        matches!(self, AnnotatorError::NotFitted(_))
    }
}

impl From<bincode::Error> for AnnotatorError {
    fn from(err: bincode::Error) -> Self {
        AnnotatorError::Serialization(err.to_string())
    }
}
