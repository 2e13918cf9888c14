use calibench_ingest::extract_all;
use clap::Parser;
use std::{path::PathBuf, process::ExitCode};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Convert Caliper HTML reports into per-experiment CSV tables
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// directory holding one sub directory of html reports per experiment
    #[arg(long, default_value = "reports_htmls/experiments")]
    input: PathBuf,
    /// directory receiving the mirrored csv directories
    #[arg(long, default_value = "reports_csv/experiments")]
    output: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    match extract_all(&args.input, &args.output) {
        Ok(_) => {
            info!("Extraction finished");
            ExitCode::SUCCESS
        }
        Err(error) => {
            error!("{error}");
            ExitCode::FAILURE
        }
    }
}
