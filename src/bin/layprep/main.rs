//! Ground-truth preprocessing CLI.
//!
//! # Usage
//!
//! ```bash
//! layprep convert --config configs/baseline.yaml -i scan.xml -o mask.png
//! layprep preprocess --config configs/baseline.yaml -i data/train -o output/train
//! layprep check-config --config configs/baseline.yaml
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use layprep::page::GroundTruthMode;

#[derive(Parser)]
#[command(name = "layprep")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Ground-truth preprocessing for document layout analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a single PAGE XML into a semantic segmentation mask
    Convert {
        /// Path to the training configuration YAML
        #[arg(long, short, env = "LAYPREP_CONFIG")]
        config: PathBuf,

        /// Input PAGE XML file
        #[arg(long, short)]
        input: PathBuf,

        /// Output mask path
        #[arg(long, short)]
        output: PathBuf,

        /// Override the configured extraction mode
        #[arg(long)]
        mode: Option<GroundTruthMode>,

        /// Override the configured region names
        #[arg(long, num_args = 1..)]
        regions: Vec<String>,

        /// Override the configured baseline thickness in pixels
        #[arg(long)]
        line_width: Option<u32>,

        /// Square off the round caps at baseline ends
        #[arg(long)]
        square_lines: bool,
    },
    /// Preprocess an annotated dataset into training ground truth
    Preprocess {
        /// Path to the training configuration YAML
        #[arg(long, short, env = "LAYPREP_CONFIG")]
        config: PathBuf,

        /// Input folders or image files
        #[arg(long, short, num_args = 1.., required = true)]
        input: Vec<PathBuf>,

        /// Output folder
        #[arg(long, short)]
        output: PathBuf,

        /// Rewrite outputs even when they are up to date
        #[arg(long)]
        overwrite: bool,

        /// Skip filesystem checks on the inputs
        #[arg(long)]
        disable_check: bool,

        /// Number of worker threads (defaults to number of CPUs)
        #[arg(long, env = "LAYPREP_WORKERS")]
        workers: Option<usize>,
    },
    /// Load a configuration, validate it, and print a summary
    CheckConfig {
        /// Path to the training configuration YAML
        #[arg(long, short, env = "LAYPREP_CONFIG")]
        config: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    layprep::utils::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            config,
            input,
            output,
            mode,
            regions,
            line_width,
            square_lines,
        } => commands::convert(
            &config,
            &input,
            &output,
            commands::ConvertOverrides {
                mode,
                regions,
                line_width,
                square_lines,
            },
        )?,
        Commands::Preprocess {
            config,
            input,
            output,
            overwrite,
            disable_check,
            workers,
        } => commands::preprocess(&config, &input, &output, overwrite, disable_check, workers)?,
        Commands::CheckConfig { config } => commands::check_config(&config)?,
    }

    Ok(())
}
