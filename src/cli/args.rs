//! Command line argument parsing for the tsannotator CLI using clap.

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// tsannotator - Gaussian Process time-series annotation
#[derive(Parser, Debug, Clone)]
#[command(name = "tsannotator")]
#[command(about = "Train and run a Gaussian Process time-series annotator")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct AnnotatorArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl AnnotatorArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }

    /// Default tracing filter for the verbosity level.
    pub fn log_filter(&self) -> &'static str {
        match self.verbosity() {
            0 => "error",
            1 => "warn",
            2 => "info",
            _ => "debug",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Train an annotator and save it to a model directory
    Train(TrainArgs),

    /// Annotate windows with a saved annotator
    Predict(PredictArgs),

    /// Score a saved annotator on labelled windows
    Evaluate(EvaluateArgs),
}

impl Command {
    /// Subcommand name as typed on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Train(_) => "train",
            Command::Predict(_) => "predict",
            Command::Evaluate(_) => "evaluate",
        }
    }
}

/// Arguments for training
#[derive(Parser, Debug, Clone)]
pub struct TrainArgs {
    /// Training windows (JSON-encoded (N, T, D) array)
    #[arg(short, long, value_name = "DATA_FILE")]
    pub data: PathBuf,

    /// Annotation schema (JSON)
    #[arg(short, long, value_name = "SCHEMA_FILE")]
    pub schema: PathBuf,

    /// Hyperparameters (JSON)
    #[arg(long, value_name = "HYPERPARAMETERS_FILE")]
    pub hyperparameters: PathBuf,

    /// Directory to write the model to
    #[arg(short, long, value_name = "MODEL_DIR")]
    pub model_dir: PathBuf,
}

/// Arguments for prediction
#[derive(Parser, Debug, Clone)]
pub struct PredictArgs {
    /// Inference windows (JSON-encoded (N, T, D) array)
    #[arg(short, long, value_name = "DATA_FILE")]
    pub data: PathBuf,

    /// Directory holding the saved model
    #[arg(short, long, value_name = "MODEL_DIR")]
    pub model_dir: PathBuf,

    /// Write per-step annotations to this JSON file
    #[arg(short, long, value_name = "OUTPUT_FILE")]
    pub output: Option<PathBuf>,
}

/// Arguments for evaluation
#[derive(Parser, Debug, Clone)]
pub struct EvaluateArgs {
    /// Labelled windows (JSON-encoded (N, T, D) array)
    #[arg(short, long, value_name = "DATA_FILE")]
    pub data: PathBuf,

    /// Directory holding the saved model
    #[arg(short, long, value_name = "MODEL_DIR")]
    pub model_dir: PathBuf,
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_train_args() {
        let args = AnnotatorArgs::try_parse_from([
            "tsannotator",
            "train",
            "--data",
            "train.json",
            "--schema",
            "schema.json",
            "--hyperparameters",
            "hp.json",
            "--model-dir",
            "model",
        ])
        .unwrap();

        match args.command {
            Command::Train(train) => {
                assert_eq!(train.data, PathBuf::from("train.json"));
                assert_eq!(train.model_dir, PathBuf::from("model"));
            }
            _ => panic!("Expected train command"),
        }
    }

    #[test]
    fn test_predict_output_is_optional() {
        let args = AnnotatorArgs::try_parse_from([
            "tsannotator",
            "predict",
            "-d",
            "test.json",
            "-m",
            "model",
        ])
        .unwrap();
        assert!(matches!(args.command, Command::Predict(PredictArgs { output: None, .. })));
    }

    #[test]
    fn test_verbosity_levels() {
        let args =
            AnnotatorArgs::try_parse_from(["tsannotator", "evaluate", "-d", "x", "-m", "y"]).unwrap();
        assert_eq!(args.verbosity(), 1);
        assert_eq!(args.log_filter(), "warn");

        let args =
            AnnotatorArgs::try_parse_from(["tsannotator", "-vvv", "evaluate", "-d", "x", "-m", "y"])
                .unwrap();
        assert_eq!(args.log_filter(), "debug");

        let args =
            AnnotatorArgs::try_parse_from(["tsannotator", "--quiet", "evaluate", "-d", "x", "-m", "y"])
                .unwrap();
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_output_format() {
        let args = AnnotatorArgs::try_parse_from([
            "tsannotator",
            "--format",
            "json",
            "evaluate",
            "-d",
            "x",
            "-m",
            "y",
        ])
        .unwrap();
        assert!(matches!(args.output_format, OutputFormat::Json));
    }
}
