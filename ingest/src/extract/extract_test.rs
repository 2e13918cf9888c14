use super::{
    extract_all, extract_experiment, extract_file, extract_tables, ExtractError, MONITOR_CSV,
    PERFORMANCE_CSV, TEST_TYPE,
};
use std::fs;
use tempfile::TempDir;

const REPORT: &str = r#"<!DOCTYPE html>
<html>
<body>
  <h3>Summary of performance metrics</h3>
  <h3>Performance metrics for open</h3>
  <table>
    <tr><th>Name</th><th>Succ</th><th>Throughput (TPS)</th></tr>
    <tr><td>open</td><td>100</td><td>59.8</td></tr>
    <tr><td>open</td><td>7</td></tr>
    <tr><td> open </td><td>90</td><td>61.2</td></tr>
  </table>
  <h4>Resource monitor: docker</h4>
  <table>
    <tr><th>Type</th><th>Name</th></tr>
    <tr><td>docker</td><td>all</td></tr>
  </table>
  <table>
    <tr><th>Name</th><th>CPU%(avg)</th><th>Memory(avg) [MB]</th></tr>
    <tr><td>besu-1</td><td>12.5</td><td>812</td></tr>
  </table>
</body>
</html>"#;

#[test]
pub fn performance_rows_skip_mismatched_cells() {
    let tables = extract_tables(REPORT);

    assert_eq!(tables.performance.len(), 2);
    assert_eq!(tables.performance[0].get("Throughput (TPS)"), Some("59.8"));
    assert_eq!(tables.performance[1].get("Name"), Some("open"));
}

#[test]
pub fn monitor_uses_second_table_after_header() {
    let tables = extract_tables(REPORT);

    assert_eq!(tables.monitor.len(), 1);
    assert_eq!(tables.monitor[0].get("CPU%(avg)"), Some("12.5"));
    assert_eq!(tables.monitor[0].get("Type"), None);
}

#[test]
pub fn monitor_falls_back_to_first_table() {
    let html = r#"<h4>Resource monitor</h4>
<table><tr><th>Name</th><th>CPU%(avg)</th></tr><tr><td>a</td><td>3</td></tr></table>"#;

    let tables = extract_tables(html);

    assert!(tables.performance.is_empty());
    assert_eq!(tables.monitor.len(), 1);
    assert_eq!(tables.monitor[0].get("CPU%(avg)"), Some("3"));
}

#[test]
pub fn missing_headers_yield_nothing() {
    let tables = extract_tables("<html><body><table><tr><td>1</td></tr></table></body></html>");

    assert!(tables.performance.is_empty());
    assert!(tables.monitor.is_empty());
}

#[test]
pub fn file_rows_are_tagged_with_stem() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("open_report_60_20251112-133845.html");
    fs::write(&path, REPORT).unwrap();

    let tables = extract_file(&path).unwrap();

    assert_eq!(tables.performance.len(), 2);
    for record in tables.performance.iter().chain(tables.monitor.iter()) {
        assert_eq!(record.get(TEST_TYPE), Some("open_report_60_20251112-133845"));
    }
}

#[test]
pub fn experiment_accumulates_all_reports() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    fs::write(input.path().join("a.html"), REPORT).unwrap();
    fs::write(input.path().join("b.html"), REPORT).unwrap();
    fs::write(input.path().join("notes.txt"), "ignored").unwrap();

    assert!(extract_experiment(input.path(), output.path()).unwrap());

    let performance = fs::read_to_string(output.path().join(PERFORMANCE_CSV)).unwrap();
    let lines = performance.lines().collect::<Vec<_>>();
    assert_eq!(lines[0], "Name,Succ,Throughput (TPS),Test Type");
    assert_eq!(lines.len(), 5);
    assert!(lines[4].ends_with(",b"));

    let monitor = fs::read_to_string(output.path().join(MONITOR_CSV)).unwrap();
    assert_eq!(monitor.lines().count(), 3);
}

#[test]
pub fn experiment_without_rows_writes_nothing() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    fs::write(input.path().join("empty.html"), "<html></html>").unwrap();

    assert!(!extract_experiment(input.path(), &output.path().join("x")).unwrap());
    assert!(!output.path().join("x").exists());
}

#[test]
pub fn all_counts_processed_and_failed() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    let good = input.path().join("6n-5s-qbft-v25.10.0");
    let empty = input.path().join("4n-2s-ibft-v24.1");
    let no_html = input.path().join("broken");
    for dir in [&good, &empty, &no_html] {
        fs::create_dir(dir).unwrap();
    }
    fs::write(good.join("open.html"), REPORT).unwrap();
    fs::write(empty.join("open.html"), "<p>nothing</p>").unwrap();

    let summary = extract_all(input.path(), output.path()).unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 2);
    assert!(output
        .path()
        .join("6n-5s-qbft-v25.10.0")
        .join(PERFORMANCE_CSV)
        .is_file());
}

#[test]
pub fn all_requires_experiments() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    assert!(matches!(
        extract_all(input.path(), output.path()),
        Err(ExtractError::NoExperiments(_))
    ));
    assert!(matches!(
        extract_all(&input.path().join("missing"), output.path()),
        Err(ExtractError::InputMissing(_))
    ));
}
