mod config;
mod deploy;
mod executors;
mod mutator;
mod probe;
mod sweep;

use clap::{Parser, Subcommand};
use config::{ConfigErrors, SweepConfig};
use deploy::Deployer;
use probe::NetworkProbe;
use std::{error::Error, path::PathBuf, process::ExitCode};
use sweep::Sweep;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Benchmark sweep over a Besu network with Hyperledger Caliper
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// yaml config, every field falls back to its default when the file or the field is missing
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Probe the network, deploy the contract and run every function at every rate
    Sweep,
    /// Check that the JSON-RPC endpoint answers
    Probe,
    /// Deploy the benchmark contract and update the network config
    Deploy,
    /// Set the target rate of a benchmark config
    SetRate {
        file: PathBuf,
        rate: u32,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<SweepConfig, ConfigErrors> {
    let config = match path {
        Some(path) => {
            info!("Loading config from {}", path.to_string_lossy());
            SweepConfig::load(path)?
        }
        None => SweepConfig::default(),
    };

    Ok(config)
}

fn execute(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Sweep => {
            if config.preflight_checks() {
                return Err(ConfigErrors::PreflightFailed.into());
            }

            let summary = Sweep::new(config).run()?;

            info!(
                "Sweep finished: {} runs, {} reports, {} missing",
                summary.jobs, summary.reports, summary.missing
            );
        }
        Commands::Probe => {
            NetworkProbe::new(&config.network).wait_ready()?;
        }
        Commands::Deploy => {
            let address = Deployer::new(config.deploy).deploy()?;

            println!("{address}");
        }
        Commands::SetRate { file, rate } => {
            let replaced = mutator::update_rate(&file, &config.rate_key, rate, config.rate_indent)?;

            info!(
                "Set {} to {rate} in {} ({replaced} lines)",
                config.rate_key,
                file.to_string_lossy()
            );
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match execute(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!("{error}");

            let mut source = error.source();
            while let Some(cause) = source {
                error!("  caused by: {cause}");
                source = cause.source();
            }

            ExitCode::FAILURE
        }
    }
}
