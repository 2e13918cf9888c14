use crate::{aggregate::ExperimentResult, metrics::mean};
use chrono::NaiveDateTime;
use itertools::Itertools;
use std::fmt::{self, Write};
use thiserror::Error;

const RULE_WIDTH: usize = 60;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Cannot report on an empty set of results")]
    Empty,
    #[error("Failed to format report")]
    Format(#[from] fmt::Error),
}

/// `value` with `precision` decimals or `N/A`
fn number(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "N/A".to_owned(), |value| format!("{value:.precision$}"))
}

fn section(out: &mut String, title: &str) -> fmt::Result {
    let rule = "=".repeat(RULE_WIDTH);

    writeln!(out, "{rule}")?;
    writeln!(out, "{title}")?;
    writeln!(out, "{rule}")?;
    writeln!(out)
}

/// Configuration and metrics of the best experiment
pub fn render_best(out: &mut String, best: &ExperimentResult) -> fmt::Result {
    let name = &best.name;
    let metrics = &best.metrics;

    writeln!(out, "Experiment: {}", name.experiment)?;
    writeln!(out)?;
    writeln!(out, "Configuration:")?;
    writeln!(out, "  Nodes: {}", name.nodes)?;
    writeln!(out, "  Block time: {}s", name.blocktime)?;
    writeln!(out, "  Consensus: {}", name.consensus.to_uppercase())?;
    writeln!(out, "  Besu version: {}", name.version)?;
    writeln!(out)?;
    writeln!(out, "Metrics:")?;
    writeln!(out, "  Throughput: {} TPS", number(metrics.throughput, 2))?;
    writeln!(out, "  Average latency: {}s", number(metrics.avg_latency, 4))?;

    if let Some(success_rate) = metrics.success_rate {
        writeln!(out, "  Success rate: {success_rate:.2}%")?;
    }
    if let Some(cpu) = metrics.avg_cpu {
        writeln!(out, "  Average CPU: {cpu:.2}%")?;
    }
    if let Some(memory) = metrics.avg_memory_gb {
        writeln!(out, "  Average memory: {memory:.2} GB")?;
    }

    Ok(())
}

/// mean throughput of all results sharing a factor value
fn factor_mean<'a, K: PartialEq>(
    results: &'a [ExperimentResult],
    key: impl Fn(&'a ExperimentResult) -> K,
    value: &K,
) -> Option<f64> {
    mean(
        results
            .iter()
            .filter(|result| key(*result) == *value)
            .map(|result| result.metrics.throughput),
    )
}

fn render_factors(out: &mut String, results: &[ExperimentResult]) -> fmt::Result {
    writeln!(out, "Impact of the number of nodes:")?;
    for nodes in results.iter().map(|result| result.name.nodes).sorted().dedup() {
        let tps = factor_mean(results, |result| result.name.nodes, &nodes);
        writeln!(out, "  {nodes} nodes: {} TPS mean", number(tps, 2))?;
    }

    writeln!(out)?;
    writeln!(out, "Impact of the block time:")?;
    for blocktime in results
        .iter()
        .map(|result| result.name.blocktime)
        .sorted()
        .dedup()
    {
        let tps = factor_mean(results, |result| result.name.blocktime, &blocktime);
        writeln!(out, "  {blocktime}s: {} TPS mean", number(tps, 2))?;
    }

    writeln!(out)?;
    writeln!(out, "Impact of the consensus algorithm:")?;
    for consensus in results
        .iter()
        .map(|result| result.name.consensus.as_str())
        .unique()
    {
        let tps = factor_mean(results, |result| result.name.consensus.as_str(), &consensus);
        writeln!(
            out,
            "  {}: {} TPS mean",
            consensus.to_uppercase(),
            number(tps, 2)
        )?;
    }

    writeln!(out)?;
    writeln!(out, "Impact of the version:")?;
    for version in results
        .iter()
        .map(|result| result.name.version.as_str())
        .sorted()
        .dedup()
    {
        let tps = factor_mean(results, |result| result.name.version.as_str(), &version);
        writeln!(out, "  {version}: {} TPS mean", number(tps, 2))?;
    }

    Ok(())
}

/// Render the text report.
///
/// `ranked` drives the best configuration and ranking sections, the factor breakdown keeps the
/// encounter order of `unranked` for values that have no natural order.
pub fn render_report(
    ranked: &[ExperimentResult],
    unranked: &[ExperimentResult],
    now: NaiveDateTime,
) -> Result<String, ReportError> {
    let best = ranked.first().ok_or(ReportError::Empty)?;
    let mut out = String::new();

    section(&mut out, "EXPERIMENT ANALYSIS REPORT")?;
    writeln!(out, "Total experiments: {}", ranked.len())?;
    writeln!(out, "Analysis date: {}", now.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(out)?;

    section(&mut out, "BEST CONFIGURATION (by throughput)")?;
    render_best(&mut out, best)?;
    writeln!(out)?;

    section(&mut out, "FULL RANKING (sorted by throughput)")?;
    for result in ranked {
        writeln!(
            out,
            "{}: {} TPS",
            result.name.experiment,
            number(result.metrics.throughput, 2)
        )?;
    }
    writeln!(out)?;

    section(&mut out, "OBSERVATIONS")?;
    render_factors(&mut out, unranked)?;

    Ok(out)
}

/// Fixed width comparison table for the console
pub fn render_table(ranked: &[ExperimentResult]) -> Result<String, ReportError> {
    let header = [
        "experiment",
        "nodes",
        "blocktime",
        "consensus",
        "version",
        "throughput",
        "avg_latency",
        "success_rate",
        "avg_cpu",
        "avg_memory_gb",
    ];

    let rows = ranked
        .iter()
        .map(|result| {
            let name = &result.name;
            let metrics = &result.metrics;

            [
                name.experiment.clone(),
                name.nodes.to_string(),
                name.blocktime.to_string(),
                name.consensus.clone(),
                name.version.clone(),
                number(metrics.throughput, 2),
                number(metrics.avg_latency, 4),
                number(metrics.success_rate, 2),
                number(metrics.avg_cpu, 2),
                number(metrics.avg_memory_gb, 2),
            ]
        })
        .collect_vec();

    let widths = header
        .iter()
        .enumerate()
        .map(|(index, title)| {
            rows.iter()
                .map(|row| row[index].len())
                .chain(std::iter::once(title.len()))
                .max()
                .unwrap_or_default()
        })
        .collect_vec();

    let mut out = String::new();

    writeln!(
        out,
        "{}",
        header
            .iter()
            .zip(widths.iter().copied())
            .map(|(title, width)| format!("{title:>width$}"))
            .join(" ")
    )?;

    for row in rows {
        writeln!(
            out,
            "{}",
            row.iter()
                .zip(widths.iter().copied())
                .map(|(cell, width)| format!("{cell:>width$}"))
                .join(" ")
        )?;
    }

    Ok(out)
}
