//! Fine-tune the BAN-PL classifier from `configs/<name>.toml`.

use std::path::PathBuf;

use anyhow::Result;
use banpl_core::{logging, validate_config_name, ProjectLayout, TrainConfig};
use banpl_trainer::run_training;
use clap::Parser;

#[derive(Parser)]
#[command(name = "train")]
#[command(about = "Fine-tune DistilBERT on the BAN-PL dataset")]
#[command(version)]
struct Cli {
    /// Config file inside configs/, merged over configs/default.toml
    #[arg(value_parser = validate_config_name)]
    config: String,

    /// Debug output on the console
    #[arg(short, long)]
    verbose: bool,

    /// Project root holding configs/, datasets/ and models/
    #[arg(long, env = "BANPL_ROOT", default_value = ".")]
    root: PathBuf,
}

fn run(cli: Cli) -> Result<()> {
    let layout = ProjectLayout::new(cli.root);
    layout.ensure_dirs()?;
    let log = logging::init("train", &layout.logs, cli.verbose)?;
    tracing::debug!("Logging to {}", log.path().display());

    let config = TrainConfig::load(&layout, &cli.config)?;
    tracing::debug!(?config, "Merged configuration");

    let summary = run_training(&layout, &config)?;
    tracing::info!(
        "Training finished: {} optimizer steps, eval_loss={:.4}, {}",
        summary.optimizer_steps,
        summary.eval_loss,
        summary.metrics
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        // Once the subscriber is up its console layer already writes to stderr.
        if tracing::dispatcher::has_been_set() {
            tracing::error!("Training failed: {:#}", e);
        } else {
            eprintln!("Training failed: {:#}", e);
        }
        std::process::exit(1);
    }
}
