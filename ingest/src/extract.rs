use crate::table::{Record, Table};
use globset::{Glob, GlobMatcher};
use ignore::{DirEntry, WalkBuilder};
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const PERFORMANCE_CSV: &str = "caliper_performance_metrics.csv";
pub const MONITOR_CSV: &str = "caliper_monitor_metrics.csv";

/// column added to every row, holding the stem of the source report
pub const TEST_TYPE: &str = "Test Type";

const PERFORMANCE_MARKER: &str = "Performance metrics";
const MONITOR_MARKER: &str = "Resource monitor";

static PERFORMANCE_HEADER: Lazy<Selector> = Lazy::new(|| selector("h3"));
static MONITOR_HEADER: Lazy<Selector> = Lazy::new(|| selector("h4"));
static HEADER_CELL: Lazy<Selector> = Lazy::new(|| selector("th"));
static ROW: Lazy<Selector> = Lazy::new(|| selector("tr"));
static CELL: Lazy<Selector> = Lazy::new(|| selector("td"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|error| panic!("invalid selector {css}: {error:?}"))
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Report directory not found: {0}")]
    InputMissing(PathBuf),
    #[error("No experiment directories found in {0}")]
    NoExperiments(PathBuf),
    #[error("Failed to read report")]
    Io(#[from] std::io::Error),
    #[error("Failed to write csv")]
    Csv(#[from] csv::Error),
    #[error("Invalid report glob")]
    Glob(#[from] globset::Error),
}

/// Both tables found in a single report
#[derive(Debug, Clone, Default)]
pub struct ExtractedTables {
    pub performance: Vec<Record>,
    pub monitor: Vec<Record>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub processed: usize,
    pub failed: usize,
}

/// Find the `skip`-th table (0 based) after the first `header` element containing `marker`,
/// in document order
fn following_table<'a>(
    document: &'a Html,
    header: &Selector,
    marker: &str,
    skip: usize,
) -> Option<ElementRef<'a>> {
    let mut found_header = false;
    let mut seen = 0;

    for element in document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
    {
        if !found_header {
            found_header =
                header.matches(&element) && element.text().collect::<String>().contains(marker);
        } else if element.value().name() == "table" {
            if seen == skip {
                return Some(element);
            }

            seen += 1;
        }
    }

    None
}

fn cell_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_owned()
}

/// Turn a html table into records, the first row is treated as the header row
fn table_records(table: ElementRef) -> Vec<Record> {
    let headers = table.select(&HEADER_CELL).map(cell_text).collect_vec();

    if headers.is_empty() {
        return Vec::new();
    }

    table
        .select(&ROW)
        .skip(1)
        .map(|row| row.select(&CELL).map(cell_text).collect_vec())
        .filter(|values| !values.is_empty() && values.len() == headers.len())
        .map(|values| Record::from_pairs(headers.iter().cloned(), values))
        .collect()
}

/// Extract the performance and resource monitor tables from a Caliper report
pub fn extract_tables(html: &str) -> ExtractedTables {
    let document = Html::parse_document(html);

    let performance = following_table(&document, &PERFORMANCE_HEADER, PERFORMANCE_MARKER, 0)
        .map(table_records)
        .unwrap_or_default();

    // the report places a table between the monitor header and the actual data
    let monitor = following_table(&document, &MONITOR_HEADER, MONITOR_MARKER, 1)
        .or_else(|| following_table(&document, &MONITOR_HEADER, MONITOR_MARKER, 0))
        .map(table_records)
        .unwrap_or_default();

    ExtractedTables {
        performance,
        monitor,
    }
}

/// Extract both tables of a report file, tagging every row with the file stem
pub fn extract_file(path: &Path) -> Result<ExtractedTables, ExtractError> {
    let html = fs::read_to_string(path)?;
    let test_type = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut tables = extract_tables(&html);

    for record in tables
        .performance
        .iter_mut()
        .chain(tables.monitor.iter_mut())
    {
        record.insert(TEST_TYPE, test_type.as_str());
    }

    debug!(
        path = ?path,
        performance = tables.performance.len(),
        monitor = tables.monitor.len(),
        "Extracted report"
    );

    Ok(tables)
}

fn report_matcher() -> Result<GlobMatcher, ExtractError> {
    Ok(Glob::new("*.html")?.compile_matcher())
}

/// all direct children of `dir` matching `filter`, sorted by name
fn children(dir: &Path, filter: impl Fn(&DirEntry) -> bool) -> Vec<PathBuf> {
    WalkBuilder::new(dir)
        .standard_filters(false)
        .max_depth(Some(1))
        .sort_by_file_name(|a, b| a.cmp(b))
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(error) => {
                warn!(error = %error, "Failed to list {}", dir.to_string_lossy());
                None
            }
        })
        .filter(|entry| entry.depth() == 1 && filter(entry))
        .map(DirEntry::into_path)
        .collect_vec()
}

fn is_dir(entry: &DirEntry) -> bool {
    entry.file_type().map_or(false, |kind| kind.is_dir())
}

/// Extract every report of one experiment directory into `output`.
///
/// Returns `Ok(false)` when no rows could be extracted, in which case nothing is written.
pub fn extract_experiment(dir: &Path, output: &Path) -> Result<bool, ExtractError> {
    let matcher = report_matcher()?;
    let reports = children(dir, |entry| {
        !is_dir(entry) && matcher.is_match(entry.file_name())
    });

    if reports.is_empty() {
        warn!("No html reports found in {}", dir.to_string_lossy());
        return Ok(false);
    }

    let mut performance = Table::new();
    let mut monitor = Table::new();

    for report in reports {
        match extract_file(&report) {
            Ok(tables) => {
                performance.extend(tables.performance);
                monitor.extend(tables.monitor);
            }
            Err(error) => {
                warn!(error = %error, "Failed to process {}", report.to_string_lossy());
            }
        }
    }

    if performance.is_empty() && monitor.is_empty() {
        warn!("No data extracted from {}", dir.to_string_lossy());
        return Ok(false);
    }

    fs::create_dir_all(output)?;

    let mut saved = Vec::new();

    if !performance.is_empty() {
        performance.write_csv(&output.join(PERFORMANCE_CSV))?;
        saved.push("performance");
    }

    if !monitor.is_empty() {
        monitor.write_csv(&output.join(MONITOR_CSV))?;
        saved.push("monitor");
    }

    info!("CSVs written for {}: {}", dir.to_string_lossy(), saved.join(", "));

    Ok(true)
}

/// Extract all experiment directories below `input` into mirrored directories below `output`
pub fn extract_all(input: &Path, output: &Path) -> Result<ExtractSummary, ExtractError> {
    if !input.is_dir() {
        return Err(ExtractError::InputMissing(input.to_path_buf()));
    }

    let experiments = children(input, is_dir);

    if experiments.is_empty() {
        return Err(ExtractError::NoExperiments(input.to_path_buf()));
    }

    info!("Found {} experiments", experiments.len());

    let mut summary = ExtractSummary::default();

    for experiment in experiments {
        let Some(name) = experiment.file_name() else {
            continue;
        };

        info!("Processing {}", name.to_string_lossy());

        match extract_experiment(&experiment, &output.join(name)) {
            Ok(true) => summary.processed += 1,
            Ok(false) => summary.failed += 1,
            Err(error) => {
                warn!(error = %error, "Failed to extract {}", name.to_string_lossy());
                summary.failed += 1;
            }
        }
    }

    info!("Processed successfully: {}", summary.processed);

    if summary.failed > 0 {
        warn!("Experiments with problems: {}", summary.failed);
    }

    Ok(summary)
}

#[cfg(test)]
mod extract_test;
