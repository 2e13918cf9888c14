use calibench_analysis::{analyze, report};
use chrono::Local;
use clap::Parser;
use std::{path::PathBuf, process::ExitCode};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Consolidate all experiments and find the best performing configuration
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// directory holding one csv directory per experiment, outputs are written here as well
    #[arg(long, default_value = "reports_csv/experiments")]
    root: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let output = match analyze(&args.root, Local::now().naive_local()) {
        Ok(output) => output,
        Err(error) => {
            error!("{error}");
            return ExitCode::FAILURE;
        }
    };

    match report::render_table(&output.results) {
        Ok(table) => println!("\n{table}"),
        Err(error) => error!("Failed to render comparison table: {error}"),
    }

    if let Some(best) = output.best() {
        let mut text = String::new();

        match report::render_best(&mut text, best) {
            Ok(()) => println!("Best configuration\n\n{text}"),
            Err(error) => error!("Failed to render best configuration: {error}"),
        }
    }

    info!("Files generated:");
    for path in [
        &output.consolidated,
        &output.report,
        &output.consolidated_latest,
        &output.report_latest,
    ] {
        info!("  {}", path.to_string_lossy());
    }

    ExitCode::SUCCESS
}
