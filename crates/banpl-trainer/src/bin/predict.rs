//! Interactive classification with the model saved in `models/`.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use banpl_core::{logging, DeviceKind, ProjectLayout};
use banpl_trainer::{select_device, Predictor};
use clap::Parser;

#[derive(Parser)]
#[command(name = "predict")]
#[command(about = "Classify lines from stdin as harmful or non-harmful")]
#[command(version)]
struct Cli {
    /// Directory with model.safetensors, config.json and tokenizer.json [default: <root>/models]
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Force CPU even when CUDA is available
    #[arg(long)]
    cpu: bool,

    /// Debug output on the console
    #[arg(short, long)]
    verbose: bool,

    /// Project root
    #[arg(long, env = "BANPL_ROOT", default_value = ".")]
    root: PathBuf,
}

fn run(cli: Cli) -> Result<()> {
    let layout = ProjectLayout::new(cli.root);
    layout.ensure_dirs()?;
    logging::init("predict", &layout.logs, cli.verbose)?;

    let model_dir = cli.model_dir.unwrap_or_else(|| layout.models.clone());
    let device = select_device(if cli.cpu { DeviceKind::Cpu } else { DeviceKind::Auto })?;
    let predictor = Predictor::load(&model_dir, device)?;
    tracing::info!("Loaded classifier from {}", model_dir.display());

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()?;
    for line in stdin.lock().lines() {
        let line = line?;
        let text = line.trim();
        if !text.is_empty() {
            let prediction = predictor.predict(text)?;
            writeln!(stdout, "Prediction: {}", prediction.label)?;
            writeln!(stdout, "Confidence: {:.4}", prediction.confidence)?;
        }
        write!(stdout, "> ")?;
        stdout.flush()?;
    }
    writeln!(stdout)?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        // Once the subscriber is up its console layer already writes to stderr.
        if tracing::dispatcher::has_been_set() {
            tracing::error!("Prediction failed: {:#}", e);
        } else {
            eprintln!("Prediction failed: {:#}", e);
        }
        std::process::exit(1);
    }
}
