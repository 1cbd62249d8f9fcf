//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::aggregate::StepProbabilities;
use crate::cli::args::{AnnotatorArgs, OutputFormat};
use crate::error::Result;

/// Result structure for training.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainingResult {
    pub model_dir: String,
    pub training_windows: usize,
    pub features: usize,
    pub outputs: usize,
    pub duration_ms: u64,
}

/// Result structure for prediction.
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResult {
    pub windows: usize,
    pub annotated_steps: usize,
    pub classes: usize,
    pub output: Option<String>,
    pub duration_ms: u64,
}

/// Result structure for evaluation.
#[derive(Debug, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub weighted_f1: f64,
    pub duration_ms: u64,
}

/// One annotated timestep as written to the predictions file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRow {
    pub series_id: f64,
    pub time_id: f64,
    pub label: String,
    pub probabilities: Vec<f64>,
}

/// Pair every timestep with its most probable class name.
pub fn annotation_rows(result: &StepProbabilities, target_classes: &[String]) -> Vec<AnnotationRow> {
    let labels = result.labels();
    result
        .keys
        .iter()
        .zip(result.probabilities.rows())
        .zip(labels.iter())
        .map(|((&(series_id, time_id), probs), &label)| AnnotationRow {
            series_id,
            time_id,
            label: target_classes
                .get(label)
                .cloned()
                .unwrap_or_else(|| label.to_string()),
            probabilities: probs.to_vec(),
        })
        .collect()
}

/// Output a result in the requested format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &AnnotatorArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: Serialize>(message: &str, result: &T, args: &AnnotatorArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }

    let value = serde_json::to_value(result)?;
    match &value {
        serde_json::Value::Object(obj) => {
            for (key, val) in obj {
                println!("{key}: {}", format_value(val));
            }
        }
        _ => println!("{}", format_value(&value)),
    }
    Ok(())
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &AnnotatorArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "-".to_string(),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{f:.4}"),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}
