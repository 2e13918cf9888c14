use super::{Executor, ExecutorError, Job, RunOutcome};
use crate::{
    config::{CaliperConfig, Settle, SweepConfig},
    mutator::update_rate,
    probe::NetworkProbe,
};
use chrono::Local;
use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
    time::Duration,
};
use tracing::{debug, info, instrument, warn};
use wait_timeout::ChildExt;

/// Executor running the load generator as a local child process, one job at a time
#[derive(Debug)]
pub struct LocalExecutor {
    caliper: CaliperConfig,
    network_config: PathBuf,
    rate_key: String,
    rate_indent: usize,
    cooldown: Settle,
    probe: NetworkProbe,
}

/// `<reports_dir>/<function>/<function>_report_<rate>_<timestamp>.html`
pub fn report_path(reports_dir: &Path, function: &str, rate: u32, timestamp: &str) -> PathBuf {
    reports_dir
        .join(function)
        .join(format!("{function}_report_{rate}_{timestamp}.html"))
}

impl LocalExecutor {
    pub fn new(config: &SweepConfig, probe: NetworkProbe) -> Self {
        Self {
            caliper: config.caliper.clone(),
            network_config: config.deploy.network_config.clone(),
            rate_key: config.rate_key.clone(),
            rate_indent: config.rate_indent,
            cooldown: config.cooldown.clone(),
            probe,
        }
    }

    fn caliper_args(&self, job: &Job) -> Vec<OsString> {
        let mut args: Vec<OsString> = self
            .caliper
            .command
            .iter()
            .skip(1)
            .map(OsString::from)
            .collect();

        args.extend([
            "--caliper-workspace".into(),
            self.caliper.workspace.clone().into_os_string(),
            "--caliper-benchconfig".into(),
            job.bench_config.clone().into_os_string(),
            "--caliper-networkconfig".into(),
            self.network_config.clone().into_os_string(),
            "--caliper-bind-sut".into(),
            OsString::from(&self.caliper.bind_sut),
            "--caliper-flow-skip-install".into(),
        ]);

        args
    }

    /// run the load generator until it exits or the watchdog fires
    fn launch(&self, job: &Job) -> Result<Option<ExitStatus>, ExecutorError> {
        let program = self.caliper.command.first().ok_or_else(|| {
            ExecutorError::Spawn(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "caliper.command is empty",
            ))
        })?;

        let mut child = Command::new(program)
            .args(self.caliper_args(job))
            .spawn()
            .map_err(ExecutorError::Spawn)?;

        match self.caliper.timeout_secs {
            None => child.wait().map(Some).map_err(ExecutorError::Wait),
            Some(secs) => match child
                .wait_timeout(Duration::from_secs(secs))
                .map_err(ExecutorError::Wait)?
            {
                Some(status) => Ok(Some(status)),
                None => {
                    warn!("Load generator still running after {secs}s, killing it");
                    child.kill().map_err(ExecutorError::Wait)?;
                    child.wait().map_err(ExecutorError::Wait)?;

                    Ok(None)
                }
            },
        }
    }

    /// move the default report to its timestamped location
    fn collect_report(&self, job: &Job, started: &str) -> Result<RunOutcome, ExecutorError> {
        if !self.caliper.default_report.is_file() {
            warn!(
                "{} not found after {} at rate {}",
                self.caliper.default_report.to_string_lossy(),
                job.function,
                job.rate
            );
            return Ok(RunOutcome::ReportMissing);
        }

        let target = report_path(&self.caliper.reports_dir, &job.function, job.rate, started);

        let stored = target
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| fs::rename(&self.caliper.default_report, &target));

        if let Err(error) = stored {
            return Err(ExecutorError::Report {
                path: target,
                error,
            });
        }

        info!("Report stored at {}", target.to_string_lossy());

        Ok(RunOutcome::Report(target))
    }
}

impl Executor for LocalExecutor {
    #[instrument(skip(self, job), fields(function = %job.function, rate = job.rate, repetition = job.repetition))]
    fn run(&mut self, job: &Job) -> Result<RunOutcome, ExecutorError> {
        info!(
            "Running {} at {} {} (repetition {})",
            job.function, job.rate, self.rate_key, job.repetition
        );

        update_rate(&job.bench_config, &self.rate_key, job.rate, self.rate_indent).map_err(
            |error| ExecutorError::Mutate {
                path: job.bench_config.clone(),
                error,
            },
        )?;

        // reports are named after the start of the run
        let started = Local::now().format("%Y%m%d-%H%M%S").to_string();

        // the exit status does not decide anything, the report does
        match self.launch(job)? {
            Some(status) => debug!(status = ?status, "Load generator finished"),
            None => debug!("Load generator killed"),
        }

        let outcome = self.collect_report(job, &started)?;

        debug!("Cooling down");
        self.probe.settle(&self.cooldown)?;

        Ok(outcome)
    }
}
