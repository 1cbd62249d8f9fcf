//! Gaussian Process classification.
//!
//! The learner is layered the same way the annotator consumes it:
//!
//! - [`RbfKernel`]: scaled squared-exponential covariance
//! - [`BinaryGpClassifier`]: Laplace-approximated binary GP with a logistic link
//! - [`GaussianProcessClassifier`]: one-vs-rest or one-vs-one decomposition over
//!   integer class labels
//! - [`MultiOutputGpClassifier`]: one multiclass GP per output column, fitted on
//!   a dedicated rayon pool

pub mod binary;
pub mod kernel;
pub mod linalg;
pub mod multiclass;
pub mod multioutput;

pub use binary::BinaryGpClassifier;
pub use kernel::RbfKernel;
pub use multiclass::{GaussianProcessClassifier, GpSettings};
pub use multioutput::MultiOutputGpClassifier;
