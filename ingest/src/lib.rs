//! Extraction of Caliper HTML reports into per-experiment CSV tables.

pub mod extract;
pub mod table;

pub use extract::{
    extract_all, extract_experiment, extract_file, extract_tables, ExtractError, ExtractSummary,
    ExtractedTables, MONITOR_CSV, PERFORMANCE_CSV, TEST_TYPE,
};
pub use table::{Record, Table};
