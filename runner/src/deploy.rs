use crate::{config::DeployConfig, mutator::write_atomic};
use regex::Regex;
use serde_json::Value;
use std::{
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    thread::{self, sleep, JoinHandle},
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, info};
use wait_timeout::ChildExt;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Deployment directory not found: {0}")]
    WorkdirMissing(PathBuf),
    #[error("Deployment command is empty")]
    EmptyCommand,
    #[error("Failed to spawn the deployment command")]
    Spawn(#[source] io::Error),
    #[error("I/O error during deployment")]
    Io(#[from] io::Error),
    #[error("Deployment timed out after {0:?}")]
    Timeout(Duration),
    #[error("Deployment failed: {stderr}")]
    Failed { stderr: String },
    #[error("Invalid address pattern")]
    InvalidPattern(#[from] regex::Error),
    #[error("Contract address not found in deployment output:\n{stdout}")]
    AddressNotFound { stdout: String },
    #[error("Network config not found: {0}")]
    NetworkConfigMissing(PathBuf),
    #[error("Network config is not valid JSON")]
    InvalidNetworkConfig(#[from] serde_json::Error),
    #[error("Network config has no ethereum.contracts.{0} entry")]
    MissingContract(String),
}

/// read a child pipe to the end on a separate thread so the child never blocks on a full pipe
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut output = String::new();

        if let Some(mut pipe) = pipe {
            if let Err(error) = pipe.read_to_string(&mut output) {
                debug!(error = %error, "Failed to read child output");
            }
        }

        output
    })
}

fn joined(handle: JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

/// Find the deployed contract address in the tool output
pub fn extract_address(pattern: &str, stdout: &str) -> Result<String, DeployError> {
    Regex::new(pattern)?
        .captures(stdout)
        .and_then(|captures| captures.get(1))
        .map(|address| address.as_str().to_owned())
        .ok_or_else(|| DeployError::AddressNotFound {
            stdout: stdout.to_owned(),
        })
}

/// Store `address` as `ethereum.contracts.<contract>.address`, keeping the rest of the document
pub fn update_network_config(path: &Path, contract: &str, address: &str) -> Result<(), DeployError> {
    if !path.is_file() {
        return Err(DeployError::NetworkConfigMissing(path.to_path_buf()));
    }

    let mut document: Value = serde_json::from_str(&fs::read_to_string(path)?)?;

    let entry = document
        .get_mut("ethereum")
        .and_then(|ethereum| ethereum.get_mut("contracts"))
        .and_then(|contracts| contracts.get_mut(contract))
        .and_then(Value::as_object_mut)
        .ok_or_else(|| DeployError::MissingContract(contract.to_owned()))?;

    entry.insert("address".to_owned(), Value::String(address.to_owned()));

    let mut output = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut output, formatter);
    serde::Serialize::serialize(&document, &mut serializer)?;

    write_atomic(path, &output)?;

    Ok(())
}

/// Deploys the benchmark contract and records its address in the network config
#[derive(Debug, Clone)]
pub struct Deployer {
    config: DeployConfig,
}

impl Deployer {
    pub fn new(config: DeployConfig) -> Self {
        Self { config }
    }

    /// run the deployment tool and return its stdout
    fn run_command(&self) -> Result<String, DeployError> {
        let (program, args) = self
            .config
            .command
            .split_first()
            .ok_or(DeployError::EmptyCommand)?;

        if !self.config.workdir.is_dir() {
            return Err(DeployError::WorkdirMissing(self.config.workdir.clone()));
        }

        info!(
            "Running deployment in {}",
            self.config.workdir.to_string_lossy()
        );

        let mut child = Command::new(program)
            .args(args)
            .current_dir(&self.config.workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(DeployError::Spawn)?;

        if let Some(mut stdin) = child.stdin.take() {
            // a tool that exits without reading its prompts closes the pipe early
            if let Err(error) = stdin.write_all(self.config.input.as_bytes()) {
                debug!(error = %error, "Failed to write scripted input");
            }
            // dropping stdin closes it, the tool sees the end of its input
        }

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let timeout = Duration::from_secs(self.config.timeout_secs);

        let status = match child.wait_timeout(timeout)? {
            Some(status) => status,
            None => {
                child.kill()?;
                child.wait()?;

                return Err(DeployError::Timeout(timeout));
            }
        };

        let stdout = joined(stdout);
        let stderr = joined(stderr);

        debug!(status = ?status, "Deployment finished");

        if !status.success() {
            return Err(DeployError::Failed { stderr });
        }

        Ok(stdout)
    }

    /// Deploy the contract and persist the new address, returns the address
    pub fn deploy(&self) -> Result<String, DeployError> {
        info!("Deploying contract {}", self.config.contract);

        if self.config.warmup_secs > 0 {
            info!("Waiting {}s for the network to stabilize", self.config.warmup_secs);
            sleep(Duration::from_secs(self.config.warmup_secs));
        }

        let stdout = self.run_command()?;
        let address = extract_address(&self.config.address_pattern, &stdout)?;

        info!("Contract {} deployed at {address}", self.config.contract);

        update_network_config(&self.config.network_config, &self.config.contract, &address)?;

        info!(
            "Updated {} with the new address",
            self.config.network_config.to_string_lossy()
        );

        Ok(address)
    }
}

#[cfg(test)]
mod deploy_test;
