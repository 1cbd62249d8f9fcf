//! Module-level entry points for training, inference and persistence.

use std::path::Path;

use ndarray::ArrayView3;

use crate::aggregate::StepProbabilities;
use crate::annotator::TsAnnotator;
use crate::config::PredictorConfig;
use crate::error::Result;
use crate::schema::TsAnnotationSchema;

/// Instantiate and train an annotator on the train split.
pub fn train_predictor_model(
    train_data: ArrayView3<'_, f64>,
    data_schema: &TsAnnotationSchema,
    hyperparameters: &PredictorConfig,
) -> Result<TsAnnotator> {
    let mut model = TsAnnotator::new(data_schema.clone(), hyperparameters.clone())?;
    model.fit(train_data)?;
    Ok(model)
}

/// Annotate inference windows.
pub fn predict_with_model(
    model: &TsAnnotator,
    test_data: ArrayView3<'_, f64>,
) -> Result<StepProbabilities> {
    model.predict(test_data)
}

/// Save the annotator, creating the directory if needed.
pub fn save_predictor_model<P: AsRef<Path>>(model: &TsAnnotator, predictor_dir: P) -> Result<()> {
    let dir = predictor_dir.as_ref();
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    model.save(dir)
}

/// Load an annotator saved with [`save_predictor_model`].
pub fn load_predictor_model<P: AsRef<Path>>(predictor_dir: P) -> Result<TsAnnotator> {
    TsAnnotator::load(predictor_dir)
}

/// Weighted F1 of the annotator on labelled windows.
pub fn evaluate_predictor_model(model: &TsAnnotator, test_split: ArrayView3<'_, f64>) -> Result<f64> {
    model.evaluate(test_split)
}
