use std::{io::Read, path::Path};
use thiserror::Error;
use tracing::{debug, warn};

pub use calibench_ingest::{MONITOR_CSV, PERFORMANCE_CSV};

pub const AVG_LATENCY: &str = "Avg Latency (s)";
pub const MAX_LATENCY: &str = "Max Latency (s)";
pub const MIN_LATENCY: &str = "Min Latency (s)";
pub const THROUGHPUT: &str = "Throughput (TPS)";
pub const SUCCESS_RATE: &str = "Success Rate";
pub const CPU_AVG: &str = "CPU%(avg)";
pub const MEMORY_AVG_GB: &str = "Memory(avg) [GB]";
pub const MEMORY_AVG_MB: &str = "Memory(avg) [MB]";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("No usable memory column ({MEMORY_AVG_GB} or {MEMORY_AVG_MB}) found")]
    NoMemoryColumn,
}

/// A csv file held as string cells, columns are addressed by header name
#[derive(Debug, Clone, Default)]
pub struct MetricsTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// coerce a cell, anything that is not a number counts as missing
pub fn coerce(cell: &str) -> Option<f64> {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| !value.is_nan())
}

/// mean over all present values
pub fn mean(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));

    (count > 0).then(|| sum / count as f64)
}

impl MetricsTable {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers = reader
            .headers()?
            .iter()
            .map(str::to_owned)
            .collect::<Vec<_>>();

        let rows = reader
            .records()
            .map(|record| record.map(|record| record.iter().map(str::to_owned).collect()))
            .collect::<Result<Vec<Vec<String>>, _>>()?;

        Ok(Self { headers, rows })
    }

    pub fn from_csv(path: &Path) -> Result<Self, csv::Error> {
        let file = std::fs::File::open(path)?;

        Self::from_reader(file)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// raw cells of a column, short rows yield empty cells
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.headers.iter().position(|header| header == name)?;

        Some(
            self.rows
                .iter()
                .map(|row| row.get(index).map_or("", String::as_str))
                .collect(),
        )
    }

    pub fn numeric(&self, name: &str) -> Option<Vec<Option<f64>>> {
        self.column(name)
            .map(|cells| cells.into_iter().map(coerce).collect())
    }

    /// mean of a numeric column, `None` if the column is absent or holds no numbers
    pub fn mean(&self, name: &str) -> Option<f64> {
        self.numeric(name).and_then(mean)
    }
}

/// Per row memory usage in GB.
///
/// The GB column wins as soon as one of its cells holds a number, otherwise the MB column is
/// converted.
pub fn select_memory(table: &MetricsTable) -> Result<Vec<Option<f64>>, MemoryError> {
    let populated = |name: &str| {
        table
            .numeric(name)
            .filter(|values| values.iter().any(Option::is_some))
    };

    if let Some(gigabytes) = populated(MEMORY_AVG_GB) {
        Ok(gigabytes)
    } else if let Some(megabytes) = populated(MEMORY_AVG_MB) {
        Ok(megabytes
            .into_iter()
            .map(|value| value.map(|mb| mb / 1024.0))
            .collect())
    } else {
        Err(MemoryError::NoMemoryColumn)
    }
}

/// Mean metrics of all runs of one experiment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExperimentMetrics {
    pub avg_latency: Option<f64>,
    pub max_latency: Option<f64>,
    pub min_latency: Option<f64>,
    pub throughput: Option<f64>,
    pub success_rate: Option<f64>,
    pub avg_cpu: Option<f64>,
    pub avg_memory_gb: Option<f64>,
}

impl ExperimentMetrics {
    pub fn from_tables(performance: Option<&MetricsTable>, monitor: Option<&MetricsTable>) -> Self {
        let mut metrics = Self::default();

        if let Some(table) = performance {
            metrics.avg_latency = table.mean(AVG_LATENCY);
            metrics.max_latency = table.mean(MAX_LATENCY);
            metrics.min_latency = table.mean(MIN_LATENCY);
            metrics.throughput = table.mean(THROUGHPUT);
            metrics.success_rate = table.mean(SUCCESS_RATE);
        }

        if let Some(table) = monitor {
            metrics.avg_cpu = table.mean(CPU_AVG);
            metrics.avg_memory_gb = select_memory(table).ok().and_then(mean);
        }

        metrics
    }

    /// Load the metrics of an experiment directory, `None` if neither csv could be read
    pub fn load(dir: &Path) -> Option<Self> {
        let read = |name: &str| {
            let path = dir.join(name);

            if !path.is_file() {
                debug!(path = ?path, "Metrics table not present");
                return None;
            }

            match MetricsTable::from_csv(&path) {
                Ok(table) => Some(table),
                Err(error) => {
                    warn!(error = %error, "Failed to read {}", path.to_string_lossy());
                    None
                }
            }
        };

        let performance = read(PERFORMANCE_CSV);
        let monitor = read(MONITOR_CSV);

        if performance.is_none() && monitor.is_none() {
            return None;
        }

        Some(Self::from_tables(performance.as_ref(), monitor.as_ref()))
    }
}
