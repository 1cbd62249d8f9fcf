//! Command implementations for the tsannotator CLI.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use ndarray::Array3;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::PredictorConfig;
use crate::error::Result;
use crate::predictor::{
    evaluate_predictor_model, load_predictor_model, predict_with_model, save_predictor_model,
    train_predictor_model,
};
use crate::schema::TsAnnotationSchema;

/// Execute a CLI command.
pub fn execute_command(args: AnnotatorArgs) -> Result<()> {
    match &args.command {
        Command::Train(train_args) => train(train_args, &args),
        Command::Predict(predict_args) => predict(predict_args, &args),
        Command::Evaluate(evaluate_args) => evaluate(evaluate_args, &args),
    }
}

/// Load a window tensor stored as ndarray's serde JSON form.
pub fn load_tensor<P: AsRef<Path>>(path: P) -> Result<Array3<f64>> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let tensor: Array3<f64> = serde_json::from_reader(reader)?;
    Ok(tensor)
}

fn train(args: &TrainArgs, cli_args: &AnnotatorArgs) -> Result<()> {
    let start_time = Instant::now();
    let schema = TsAnnotationSchema::from_file(&args.schema)?;
    let hyperparameters = PredictorConfig::from_file(&args.hyperparameters)?;
    let data = load_tensor(&args.data)?;
    tracing::info!(path = %args.data.display(), shape = ?data.shape(), "loaded training windows");

    let model = train_predictor_model(data.view(), &schema, &hyperparameters)?;
    save_predictor_model(&model, &args.model_dir)?;

    output_result(
        "Annotator trained successfully",
        &TrainingResult {
            model_dir: args.model_dir.to_string_lossy().to_string(),
            training_windows: model.metadata().training_windows,
            features: model.metadata().n_features,
            outputs: model.model().n_outputs(),
            duration_ms: start_time.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

fn predict(args: &PredictArgs, cli_args: &AnnotatorArgs) -> Result<()> {
    let start_time = Instant::now();
    let model = load_predictor_model(&args.model_dir)?;
    let data = load_tensor(&args.data)?;

    let result = predict_with_model(&model, data.view())?;

    if let Some(path) = &args.output {
        let rows = annotation_rows(&result, &model.schema().target_classes);
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, &rows)?;
        writer.flush()?;
        tracing::info!(path = %path.display(), rows = rows.len(), "wrote annotations");
    }

    output_result(
        "Annotation complete",
        &PredictionResult {
            windows: data.shape()[0],
            annotated_steps: result.len(),
            classes: result.num_classes(),
            output: args.output.as_ref().map(|p| p.to_string_lossy().to_string()),
            duration_ms: start_time.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

fn evaluate(args: &EvaluateArgs, cli_args: &AnnotatorArgs) -> Result<()> {
    let start_time = Instant::now();
    let model = load_predictor_model(&args.model_dir)?;
    let data = load_tensor(&args.data)?;

    let weighted_f1 = evaluate_predictor_model(&model, data.view())?;

    output_result(
        "Evaluation complete",
        &EvaluationResult {
            weighted_f1,
            duration_ms: start_time.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}
