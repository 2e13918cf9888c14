//! Aggregation, ranking, and plotting of the per-experiment Caliper CSV tables.

pub mod aggregate;
pub mod metrics;
pub mod name;
pub mod plot;
pub mod report;

pub use aggregate::{analyze, rank, AnalysisError, AnalysisOutput, ExperimentResult};
pub use metrics::{select_memory, ExperimentMetrics, MemoryError, MetricsTable};
pub use name::ExperimentName;
