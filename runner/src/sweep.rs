use crate::{
    config::{ConfigErrors, SweepConfig},
    deploy::{DeployError, Deployer},
    executors::{Executor, ExecutorError, Job, LocalExecutor, RunOutcome},
    probe::{NetworkProbe, ProbeError},
};
use calibench_ingest::{extract_all, ExtractError, ExtractSummary};
use itertools::iproduct;
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Network is not ready")]
    Probe(#[source] ProbeError),
    #[error("Network did not stabilize after the deployment")]
    Stabilization(#[source] ProbeError),
    #[error("Contract deployment failed")]
    Deploy(#[from] DeployError),
    #[error(transparent)]
    Config(#[from] ConfigErrors),
    #[error("Report extraction failed")]
    Extract(#[from] ExtractError),
    #[error("Run {index}/{total} failed")]
    Run {
        index: usize,
        total: usize,
        #[source]
        error: ExecutorError,
    },
}

/// Ordered queue of all runs of a sweep
#[derive(Clone, Debug, Default)]
pub struct JobQueue {
    pub jobs: VecDeque<Job>,
}

impl JobQueue {
    /// repetitions x functions (declaration order) x rates (list order)
    pub fn build(config: &SweepConfig) -> Result<Self, ConfigErrors> {
        // resolve every function up front so a missing rate list fails before any run
        let functions = config
            .functions
            .iter()
            .map(|function| Ok((function, config.rates_for(&function.name)?)))
            .collect::<Result<Vec<_>, ConfigErrors>>()?;

        let jobs = iproduct!(1..=config.repetitions, functions.iter())
            .flat_map(|(repetition, (function, rates))| {
                rates.iter().map(move |rate| Job {
                    repetition,
                    function: function.name.clone(),
                    bench_config: function.bench_config.clone(),
                    rate: *rate,
                })
            })
            .collect();

        Ok(Self { jobs })
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub jobs: usize,
    pub reports: usize,
    pub missing: usize,
}

/// Full benchmark pipeline: readiness, deployment, all runs and the report extraction
#[derive(Debug)]
pub struct Sweep {
    config: SweepConfig,
    probe: NetworkProbe,
}

impl Sweep {
    pub fn new(config: SweepConfig) -> Self {
        let probe = NetworkProbe::new(&config.network);

        Self { config, probe }
    }

    pub fn run(&self) -> Result<SweepSummary, SweepError> {
        let mut executor = LocalExecutor::new(&self.config, self.probe.clone());

        self.run_with(&mut executor)
    }

    #[instrument(skip_all)]
    pub fn run_with<E: Executor>(&self, executor: &mut E) -> Result<SweepSummary, SweepError> {
        let queue = JobQueue::build(&self.config)?;

        if queue.is_empty() {
            warn!("No runs configured");
        }

        self.probe.wait_ready().map_err(SweepError::Probe)?;

        let address = Deployer::new(self.config.deploy.clone()).deploy()?;
        info!("Using contract at {address}");

        self.probe
            .settle(&self.config.stabilization)
            .map_err(SweepError::Stabilization)?;

        let total = queue.len();
        let mut summary = SweepSummary {
            jobs: total,
            ..SweepSummary::default()
        };

        info!("Starting {total} runs");

        for (index, job) in queue.jobs.iter().enumerate() {
            let index = index + 1;
            info!("Run {index}/{total}");

            match executor.run(job) {
                Ok(RunOutcome::Report(path)) => {
                    debug!(path = ?path, "Run {index} stored its report");
                    summary.reports += 1;
                }
                Ok(RunOutcome::ReportMissing) => summary.missing += 1,
                Err(error) => return Err(SweepError::Run { index, total, error }),
            }
        }

        info!(
            "All runs finished, {} reports stored, {} missing",
            summary.reports, summary.missing
        );

        self.extract()?;

        Ok(summary)
    }

    /// convert the stored reports, a missing or empty experiment root is fatal while single
    /// experiments that fail to convert are only reported
    fn extract(&self) -> Result<ExtractSummary, ExtractError> {
        info!("Extracting reports");

        let extracted = extract_all(&self.config.extract.input, &self.config.extract.output)?;

        if extracted.failed > 0 {
            warn!(
                "Extraction finished, {} experiments converted, {} failed",
                extracted.processed, extracted.failed
            );
        } else {
            info!(
                "Extraction finished, {} experiments converted",
                extracted.processed
            );
        }

        Ok(extracted)
    }
}
