use crate::metrics::{
    mean, select_memory, MemoryError, MetricsTable, AVG_LATENCY, CPU_AVG, MONITOR_CSV,
    PERFORMANCE_CSV, THROUGHPUT,
};
use calibench_ingest::TEST_TYPE;
use itertools::Itertools;
use once_cell::sync::Lazy;
use ordered_float::OrderedFloat;
use plotly::{
    common::{Line, Marker, Mode},
    layout::Axis,
    Layout, Plot, Scatter,
};
use regex::Regex;
use std::{collections::BTreeMap, path::Path};
use thiserror::Error;
use tracing::debug;

/// column holding the target rate of a run
pub const RATE_COLUMN: &str = "TPS";

/// target rate encoded in report names, e.g. `transfer_report_90_20251112-133845`
static REPORT_RATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"_report_(\d+(?:\.\d+)?)(?:_|$)")
        .unwrap_or_else(|error| panic!("invalid report rate pattern: {error}"))
});

#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Failed to read {path}: {error}")]
    Read { path: String, error: csv::Error },
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error("No target rate is shared by the performance and monitor tables")]
    Empty,
}

/// Mean metrics for one target rate
#[derive(Debug, Clone, PartialEq)]
pub struct RatePoint {
    pub rate: f64,
    pub avg_latency: Option<f64>,
    pub throughput: Option<f64>,
    pub avg_cpu: Option<f64>,
    pub memory_gb: Option<f64>,
}

/// Target rate of every row, from `rate_column` if present, otherwise from the report name
pub fn row_rates(table: &MetricsTable, rate_column: &str) -> Vec<Option<f64>> {
    if let Some(rates) = table.numeric(rate_column) {
        return rates;
    }

    debug!("No {rate_column} column, deriving the rate from {TEST_TYPE}");

    table
        .column(TEST_TYPE)
        .map(|names| {
            names
                .into_iter()
                .map(|name| {
                    REPORT_RATE
                        .captures(name)
                        .and_then(|captures| captures[1].parse::<f64>().ok())
                })
                .collect()
        })
        .unwrap_or_else(|| vec![None; table.len()])
}

type Grouped = BTreeMap<OrderedFloat<f64>, Vec<Option<f64>>>;

/// Mean of each column per rate, rows without a rate are dropped
fn group_by_rate(rates: &[Option<f64>], columns: &[Vec<Option<f64>>]) -> Grouped {
    let mut rows: BTreeMap<OrderedFloat<f64>, Vec<usize>> = BTreeMap::new();

    for (index, rate) in rates.iter().enumerate() {
        if let Some(rate) = rate {
            rows.entry(OrderedFloat(*rate)).or_default().push(index);
        }
    }

    rows.into_iter()
        .map(|(rate, indices)| {
            let means = columns
                .iter()
                .map(|column| mean(indices.iter().map(|index| column.get(*index).copied().flatten())))
                .collect_vec();

            (rate, means)
        })
        .collect()
}

fn numeric_or_missing(table: &MetricsTable, name: &str) -> Vec<Option<f64>> {
    table
        .numeric(name)
        .unwrap_or_else(|| vec![None; table.len()])
}

/// Group both tables by rate and keep only the rates present in both
pub fn summarize(
    performance: &MetricsTable,
    monitor: &MetricsTable,
    rate_column: &str,
) -> Result<Vec<RatePoint>, PlotError> {
    let memory = select_memory(monitor)?;

    let performance = group_by_rate(
        &row_rates(performance, rate_column),
        &[
            numeric_or_missing(performance, AVG_LATENCY),
            numeric_or_missing(performance, THROUGHPUT),
        ],
    );
    let monitor = group_by_rate(
        &row_rates(monitor, rate_column),
        &[memory, numeric_or_missing(monitor, CPU_AVG)],
    );

    let points = performance
        .into_iter()
        .filter_map(|(rate, perf)| {
            monitor.get(&rate).map(|mon| RatePoint {
                rate: rate.into_inner(),
                avg_latency: perf[0],
                throughput: perf[1],
                memory_gb: mon[0],
                avg_cpu: mon[1],
            })
        })
        .collect_vec();

    if points.is_empty() {
        Err(PlotError::Empty)
    } else {
        Ok(points)
    }
}

/// Load both csv files of `dir` and summarize them
pub fn load_summary(dir: &Path, rate_column: &str) -> Result<Vec<RatePoint>, PlotError> {
    let read = |name: &str| {
        let path = dir.join(name);

        MetricsTable::from_csv(&path).map_err(|error| PlotError::Read {
            path: path.to_string_lossy().into_owned(),
            error,
        })
    };

    summarize(&read(PERFORMANCE_CSV)?, &read(MONITOR_CSV)?, rate_column)
}

fn line_chart(
    points: &[RatePoint],
    title: &str,
    y_title: &str,
    color: &'static str,
    value: impl Fn(&RatePoint) -> Option<f64>,
) -> Plot {
    let (x, y): (Vec<f64>, Vec<f64>) = points
        .iter()
        .filter_map(|point| value(point).map(|y| (point.rate, y)))
        .unzip();

    let mut plot = Plot::new();
    plot.add_trace(
        Scatter::new(x, y)
            .name(y_title)
            .mode(Mode::LinesMarkers)
            .line(Line::new().color(color))
            .marker(Marker::new().color(color)),
    );
    plot.set_layout(
        Layout::new()
            .title(format!("<b>{title}</b>"))
            .x_axis(Axis::new().title(RATE_COLUMN.to_string()).show_grid(true))
            .y_axis(Axis::new().title(y_title.to_string()).show_grid(true)),
    );

    plot
}

/// The four rate charts: latency, throughput, CPU and memory
pub fn charts(points: &[RatePoint]) -> Vec<Plot> {
    vec![
        line_chart(
            points,
            "TPS x average latency (s)",
            "Average latency (s)",
            "blue",
            |point| point.avg_latency,
        ),
        line_chart(
            points,
            "TPS x throughput (TPS)",
            "Throughput",
            "green",
            |point| point.throughput,
        ),
        line_chart(
            points,
            "TPS x average CPU (%)",
            "Average CPU (%)",
            "red",
            |point| point.avg_cpu,
        ),
        line_chart(
            points,
            "TPS x average memory (GB)",
            "Average memory (GB)",
            "purple",
            |point| point.memory_gb,
        ),
    ]
}
