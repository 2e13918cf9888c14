use crate::{
    metrics::ExperimentMetrics,
    name::ExperimentName,
    report::{render_report, ReportError},
};
use chrono::NaiveDateTime;
use ignore::{DirEntry, WalkBuilder};
use itertools::Itertools;
use serde::Serialize;
use std::{
    cmp::Ordering,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{info, warn};

pub const CONSOLIDATED_PREFIX: &str = "CONSOLIDATED_RESULTS";
pub const REPORT_PREFIX: &str = "ANALYSIS_REPORT";

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Experiment directory not found: {0}")]
    RootMissing(PathBuf),
    #[error("No experiments found in {0}")]
    NoExperiments(PathBuf),
    #[error("No valid results found")]
    NoResults,
    #[error("Failed to write results")]
    Io(#[from] std::io::Error),
    #[error("Failed to write consolidated csv")]
    Csv(#[from] csv::Error),
    #[error("Failed to render report")]
    Report(#[from] ReportError),
}

/// One experiment with its decoded configuration and mean metrics
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentResult {
    pub name: ExperimentName,
    pub metrics: ExperimentMetrics,
}

/// Row layout of the consolidated csv
#[derive(Serialize)]
struct ConsolidatedRow<'a> {
    experiment: &'a str,
    experiment_base: &'a str,
    nodes: u32,
    blocktime: u32,
    consensus: &'a str,
    version: &'a str,
    timestamp: Option<&'a str>,
    avg_latency: Option<f64>,
    max_latency: Option<f64>,
    min_latency: Option<f64>,
    throughput: Option<f64>,
    success_rate: Option<f64>,
    avg_cpu: Option<f64>,
    avg_memory_gb: Option<f64>,
}

impl<'a> From<&'a ExperimentResult> for ConsolidatedRow<'a> {
    fn from(result: &'a ExperimentResult) -> Self {
        let name = &result.name;
        let metrics = &result.metrics;

        Self {
            experiment: &name.experiment,
            experiment_base: &name.experiment_base,
            nodes: name.nodes,
            blocktime: name.blocktime,
            consensus: &name.consensus,
            version: &name.version,
            timestamp: name.timestamp.as_deref(),
            avg_latency: metrics.avg_latency,
            max_latency: metrics.max_latency,
            min_latency: metrics.min_latency,
            throughput: metrics.throughput,
            success_rate: metrics.success_rate,
            avg_cpu: metrics.avg_cpu,
            avg_memory_gb: metrics.avg_memory_gb,
        }
    }
}

/// compare present values with `order`, missing values always sort last
fn missing_last(a: Option<f64>, b: Option<f64>, order: impl Fn(f64, f64) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => order(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Order results by throughput (descending) and average latency (ascending).
///
/// The sort is stable, ties keep their encounter order.
pub fn rank(results: &mut [ExperimentResult]) {
    results.sort_by(|a, b| {
        missing_last(a.metrics.throughput, b.metrics.throughput, |a, b| {
            b.total_cmp(&a)
        })
        .then_with(|| {
            missing_last(a.metrics.avg_latency, b.metrics.avg_latency, |a, b| {
                a.total_cmp(&b)
            })
        })
    });
}

/// all experiment directories below `root`, sorted by name
pub fn experiment_dirs(root: &Path) -> Vec<PathBuf> {
    WalkBuilder::new(root)
        .standard_filters(false)
        .max_depth(Some(1))
        .sort_by_file_name(|a, b| a.cmp(b))
        .build()
        .filter_map(Result::ok)
        .filter(|entry| {
            entry.depth() == 1 && entry.file_type().map_or(false, |kind| kind.is_dir())
        })
        .map(DirEntry::into_path)
        .collect_vec()
}

/// Load every parseable experiment below `root`, unranked
pub fn collect_results(root: &Path) -> Result<Vec<ExperimentResult>, AnalysisError> {
    if !root.is_dir() {
        return Err(AnalysisError::RootMissing(root.to_path_buf()));
    }

    let experiments = experiment_dirs(root);

    if experiments.is_empty() {
        return Err(AnalysisError::NoExperiments(root.to_path_buf()));
    }

    info!("Found {} experiments", experiments.len());

    let mut results = Vec::new();

    for dir in experiments {
        let experiment = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        info!("Processing {experiment}");

        let Some(name) = ExperimentName::parse(&experiment) else {
            warn!("Unable to parse experiment name: {experiment}");
            continue;
        };

        let Some(metrics) = ExperimentMetrics::load(&dir) else {
            warn!("No metrics found for {experiment}");
            continue;
        };

        match metrics.throughput {
            Some(throughput) => info!("Metrics loaded: throughput={throughput:.2} TPS"),
            None => info!("Metrics loaded: throughput=N/A"),
        }

        results.push(ExperimentResult { name, metrics });
    }

    if results.is_empty() {
        return Err(AnalysisError::NoResults);
    }

    Ok(results)
}

pub fn write_consolidated(path: &Path, results: &[ExperimentResult]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;

    for result in results {
        writer.serialize(ConsolidatedRow::from(result))?;
    }

    writer.flush()?;

    Ok(())
}

/// Files written by a single analysis
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    /// ranked results, the first entry is the best configuration
    pub results: Vec<ExperimentResult>,
    pub consolidated: PathBuf,
    pub consolidated_latest: PathBuf,
    pub report: PathBuf,
    pub report_latest: PathBuf,
}

impl AnalysisOutput {
    pub fn best(&self) -> Option<&ExperimentResult> {
        self.results.first()
    }
}

/// Rank all experiments below `root` and persist the consolidated csv and text report, each
/// once with the timestamp of `now` and once as the latest copy
pub fn analyze(root: &Path, now: NaiveDateTime) -> Result<AnalysisOutput, AnalysisError> {
    let unranked = collect_results(root)?;
    let mut results = unranked.clone();
    rank(&mut results);

    let stamp = now.format("%Y%m%d_%H%M%S");

    let consolidated = root.join(format!("{CONSOLIDATED_PREFIX}_{stamp}.csv"));
    let consolidated_latest = root.join(format!("{CONSOLIDATED_PREFIX}.csv"));
    let report = root.join(format!("{REPORT_PREFIX}_{stamp}.txt"));
    let report_latest = root.join(format!("{REPORT_PREFIX}.txt"));

    let text = render_report(&results, &unranked, now)?;

    write_consolidated(&consolidated, &results)?;
    info!("Consolidated csv saved: {}", consolidated.to_string_lossy());
    write_consolidated(&consolidated_latest, &results)?;
    info!("Latest csv saved: {}", consolidated_latest.to_string_lossy());

    fs::write(&report, text)?;
    info!("Text report saved: {}", report.to_string_lossy());
    fs::copy(&report, &report_latest)?;
    info!("Latest report saved: {}", report_latest.to_string_lossy());

    Ok(AnalysisOutput {
        results,
        consolidated,
        consolidated_latest,
        report,
        report_latest,
    })
}

#[cfg(test)]
mod aggregate_test;
