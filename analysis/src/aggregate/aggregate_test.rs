use super::{analyze, collect_results, rank, AnalysisError, ExperimentResult};
use crate::{
    metrics::{ExperimentMetrics, MONITOR_CSV, PERFORMANCE_CSV},
    name::ExperimentName,
};
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use tempfile::TempDir;

fn result(name: &str, throughput: Option<f64>, latency: Option<f64>) -> ExperimentResult {
    ExperimentResult {
        name: ExperimentName::parse(name).unwrap(),
        metrics: ExperimentMetrics {
            throughput,
            avg_latency: latency,
            ..Default::default()
        },
    }
}

fn names(results: &[ExperimentResult]) -> Vec<&str> {
    results
        .iter()
        .map(|result| result.name.experiment.as_str())
        .collect()
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 11, 12)
        .unwrap()
        .and_hms_opt(13, 38, 45)
        .unwrap()
}

#[test]
pub fn higher_throughput_ranks_first() {
    let mut results = vec![
        result("4n-2s-ibft-v1", Some(100.0), Some(0.5)),
        result("6n-2s-ibft-v1", Some(150.0), Some(0.8)),
    ];
    rank(&mut results);

    assert_eq!(names(&results), ["6n-2s-ibft-v1", "4n-2s-ibft-v1"]);
}

#[test]
pub fn lower_latency_breaks_ties() {
    let mut results = vec![
        result("4n-2s-ibft-v1", Some(100.0), Some(0.5)),
        result("6n-2s-ibft-v1", Some(100.0), Some(0.3)),
    ];
    rank(&mut results);

    assert_eq!(names(&results), ["6n-2s-ibft-v1", "4n-2s-ibft-v1"]);
}

#[test]
pub fn full_ties_keep_encounter_order_and_missing_sorts_last() {
    let mut results = vec![
        result("1n-2s-ibft-v1", None, Some(0.1)),
        result("2n-2s-ibft-v1", Some(10.0), None),
        result("3n-2s-ibft-v1", Some(10.0), Some(0.4)),
        result("4n-2s-ibft-v1", Some(10.0), Some(0.4)),
    ];
    rank(&mut results);

    assert_eq!(
        names(&results),
        [
            "3n-2s-ibft-v1",
            "4n-2s-ibft-v1",
            "2n-2s-ibft-v1",
            "1n-2s-ibft-v1"
        ]
    );
}

fn experiment(root: &std::path::Path, name: &str, throughput: &str, latency: &str) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join(PERFORMANCE_CSV),
        format!("Name,Avg Latency (s),Throughput (TPS),Test Type\nopen,{latency},{throughput},a\n"),
    )
    .unwrap();
    fs::write(
        dir.join(MONITOR_CSV),
        "Name,CPU%(avg),Memory(avg) [GB],Memory(avg) [MB],Test Type\nbesu,25,,2048,a\n",
    )
    .unwrap();
}

#[test]
pub fn unparseable_and_empty_experiments_are_skipped() {
    let root = TempDir::new().unwrap();
    experiment(root.path(), "6n-5s-qbft-v25.10.0_20251112_133845", "100", "0.5");
    experiment(root.path(), "malformed-name", "900", "0.1");
    fs::create_dir(root.path().join("4n-2s-ibft-v24.1")).unwrap();

    let results = collect_results(root.path()).unwrap();

    assert_eq!(names(&results), ["6n-5s-qbft-v25.10.0_20251112_133845"]);
    assert_eq!(results[0].metrics.avg_memory_gb, Some(2.0));
    assert_eq!(results[0].metrics.avg_cpu, Some(25.0));
}

#[test]
pub fn analyze_writes_timestamped_and_latest_outputs() {
    let root = TempDir::new().unwrap();
    experiment(root.path(), "4n-2s-ibft-v24.1", "100", "0.5");
    experiment(root.path(), "6n-5s-qbft-v25.10.0_20251112_133845", "150", "0.8");

    let output = analyze(root.path(), now()).unwrap();

    assert_eq!(
        output.best().map(|best| best.name.experiment.as_str()),
        Some("6n-5s-qbft-v25.10.0_20251112_133845")
    );
    assert_eq!(
        output.consolidated,
        root.path().join("CONSOLIDATED_RESULTS_20251112_133845.csv")
    );

    let consolidated = fs::read_to_string(&output.consolidated).unwrap();
    let lines = consolidated.lines().collect::<Vec<_>>();
    assert_eq!(
        lines[0],
        "experiment,experiment_base,nodes,blocktime,consensus,version,timestamp,avg_latency,\
         max_latency,min_latency,throughput,success_rate,avg_cpu,avg_memory_gb"
    );
    assert!(lines[1].starts_with("6n-5s-qbft-v25.10.0_20251112_133845,6n-5s-qbft-v25.10.0,6,5,qbft,25.10.0,20251112_133845,"));
    assert!(lines[2].starts_with("4n-2s-ibft-v24.1,4n-2s-ibft-v24.1,4,2,ibft,24.1,,"));
    assert_eq!(
        consolidated,
        fs::read_to_string(&output.consolidated_latest).unwrap()
    );

    assert_eq!(
        fs::read(&output.report).unwrap(),
        fs::read(&output.report_latest).unwrap()
    );
    assert!(output
        .report
        .ends_with("ANALYSIS_REPORT_20251112_133845.txt"));
}

#[test]
pub fn nothing_is_written_without_experiments() {
    let root = TempDir::new().unwrap();

    assert!(matches!(
        analyze(root.path(), now()),
        Err(AnalysisError::NoExperiments(_))
    ));
    assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);

    fs::create_dir(root.path().join("malformed-name")).unwrap();
    assert!(matches!(
        analyze(root.path(), now()),
        Err(AnalysisError::NoResults)
    ));
    assert_eq!(fs::read_dir(root.path()).unwrap().count(), 1);

    assert!(matches!(
        analyze(&root.path().join("missing"), now()),
        Err(AnalysisError::RootMissing(_))
    ));
}
