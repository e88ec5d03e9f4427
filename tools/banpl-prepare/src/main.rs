//! BAN-PL dataset preparation tool
//!
//! Unpacks the password-protected BAN-PL archives from the dataset
//! submodule into `datasets/` and rewrites them into the training schema.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use banpl_core::{logging, prepare_version, unpack_version, DatasetVersion, ProjectLayout};
use clap::{Parser, Subcommand};
use tracing::{error, info};

/// CLI arguments
#[derive(Parser)]
#[command(name = "banpl-prepare")]
#[command(about = "Unpack and sanitize the BAN-PL dataset archives")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root holding modules/ and datasets/
    #[arg(long, global = true, env = "BANPL_ROOT", default_value = ".")]
    root: PathBuf,

    /// Dataset release to process (1 or 2), repeatable [default: all]
    #[arg(long = "version", global = true)]
    versions: Vec<DatasetVersion>,

    /// Debug output on the console
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Extract the CSV of each release into datasets/
    Unpack,
    /// Extract and sanitize each release
    Prepare,
}

fn selected(versions: &[DatasetVersion]) -> Vec<DatasetVersion> {
    if versions.is_empty() {
        DatasetVersion::ALL.to_vec()
    } else {
        let mut unique = Vec::new();
        for &version in versions {
            if !unique.contains(&version) {
                unique.push(version);
            }
        }
        unique
    }
}

fn run(cli: Cli) -> Result<()> {
    let layout = ProjectLayout::new(cli.root);
    layout.ensure_dirs()?;
    let log = logging::init("banpl-prepare", &layout.logs, cli.verbose)?;
    tracing::debug!("Logging to {}", log.path().display());

    let started = Instant::now();
    for version in selected(&cli.versions) {
        match cli.command {
            Commands::Unpack => {
                let path = unpack_version(&layout, version)?;
                info!("Unpacked {} to {}", version, path.display());
            }
            Commands::Prepare => {
                let report = prepare_version(&layout, version)?;
                info!(
                    "Prepared {}: {} rows, columns [{}], dropped [{}]",
                    version,
                    report.rows,
                    report.columns.join(", "),
                    report.dropped.join(", ")
                );
            }
        }
    }

    info!(
        "All tasks successfully completed in {:.2}s",
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        // Once the subscriber is up its console layer already writes to stderr.
        if tracing::dispatcher::has_been_set() {
            error!("Error: {:#}", e);
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}
