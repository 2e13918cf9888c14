use calibench_analysis::plot::{charts, load_summary, RATE_COLUMN};
use clap::Parser;
use std::{path::PathBuf, process::ExitCode};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Plot latency, throughput, CPU and memory against the target rate of one experiment
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// directory holding the performance and monitor csv files
    #[arg(long, default_value = "reports_csv/transfer")]
    dir: PathBuf,
    /// column holding the target rate
    #[arg(long, default_value = RATE_COLUMN)]
    rate_column: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let points = match load_summary(&args.dir, &args.rate_column) {
        Ok(points) => points,
        Err(error) => {
            error!("{error}");
            return ExitCode::FAILURE;
        }
    };

    println!("\nMeans per {}:", args.rate_column);
    println!(
        "{:>10} {:>16} {:>16} {:>10} {:>12}",
        args.rate_column, "Avg Latency (s)", "Throughput (TPS)", "CPU%(avg)", "Memory (GB)"
    );
    for point in points.iter() {
        let cell = |value: Option<f64>| value.map_or_else(|| "N/A".to_owned(), |value| format!("{value:.4}"));

        println!(
            "{:>10} {:>16} {:>16} {:>10} {:>12}",
            point.rate,
            cell(point.avg_latency),
            cell(point.throughput),
            cell(point.avg_cpu),
            cell(point.memory_gb)
        );
    }

    for plot in charts(&points) {
        plot.show();
    }

    ExitCode::SUCCESS
}
