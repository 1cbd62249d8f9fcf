//! Annotation schema describing the columns of the window tensors.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AnnotatorError, Result};

/// Schema for a time-series annotation dataset.
///
/// Window tensors are laid out as `[id, time, covariates..., target]`; the
/// names here document that layout and `target_classes` fixes the width of
/// every probability vector the annotator returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TsAnnotationSchema {
    /// Name of the series id column.
    pub id_col: String,
    /// Name of the time index column.
    pub time_col: String,
    /// Name of the target column.
    pub target: String,
    /// Annotation classes; a label `i` refers to `target_classes[i]`.
    pub target_classes: Vec<String>,
    /// Covariate column names, in tensor order.
    #[serde(default)]
    pub covariates: Vec<String>,
}

impl TsAnnotationSchema {
    /// Create a schema with the default column names.
    pub fn new<S: Into<String>>(target_classes: Vec<S>, covariates: Vec<S>) -> Self {
        Self {
            id_col: "id".to_string(),
            time_col: "time".to_string(),
            target: "target".to_string(),
            target_classes: target_classes.into_iter().map(Into::into).collect(),
            covariates: covariates.into_iter().map(Into::into).collect(),
        }
    }

    /// Load and validate a schema from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let schema: TsAnnotationSchema = serde_json::from_str(&content)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Number of annotation classes.
    pub fn num_classes(&self) -> usize {
        self.target_classes.len()
    }

    /// Check that the schema can back a classifier.
    pub fn validate(&self) -> Result<()> {
        if self.target_classes.len() < 2 {
            return Err(AnnotatorError::schema(format!(
                "at least two target classes are required, found {}",
                self.target_classes.len()
            )));
        }

        let mut seen = HashSet::new();
        for class in &self.target_classes {
            if !seen.insert(class.as_str()) {
                return Err(AnnotatorError::schema(format!(
                    "duplicate target class '{class}'"
                )));
            }
        }

        let mut seen = HashSet::new();
        for name in [&self.id_col, &self.time_col, &self.target]
            .into_iter()
            .chain(self.covariates.iter())
        {
            if !seen.insert(name.as_str()) {
                return Err(AnnotatorError::schema(format!(
                    "column '{name}' appears more than once"
                )));
            }
        }

        Ok(())
    }
}
