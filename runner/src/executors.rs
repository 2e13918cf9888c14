pub mod local;

use crate::probe::ProbeError;
use std::{io, path::PathBuf};
use thiserror::Error;

pub use local::LocalExecutor;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Failed to set the target rate in {path}")]
    Mutate {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    #[error("Failed to spawn the load generator")]
    Spawn(#[source] io::Error),
    #[error("Failed to wait for the load generator")]
    Wait(#[source] io::Error),
    #[error("Failed to store the report at {path}")]
    Report {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    #[error(transparent)]
    Cooldown(#[from] ProbeError),
}

/// One benchmark run of a function at a target rate
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    pub repetition: usize,
    pub function: String,
    pub bench_config: PathBuf,
    pub rate: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// the report was moved to its final location
    Report(PathBuf),
    /// the load generator did not leave a report behind
    ReportMissing,
}

pub trait Executor {
    fn run(&mut self, job: &Job) -> Result<RunOutcome, ExecutorError>;
}
