//! tsannotator CLI binary.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use tsannotator::cli::{args::AnnotatorArgs, commands::execute_command};

fn main() -> anyhow::Result<()> {
    // Parse command line arguments using clap
    let args = AnnotatorArgs::parse();

    // RUST_LOG wins over the verbosity flags
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_filter()));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let command = args.command.name();
    execute_command(args).with_context(|| format!("{command} failed"))
}
