use super::{rewrite_rate, update_rate};
use std::fs;
use tempfile::TempDir;

const BENCH: &str = "test:
  name: simple
  rounds:
    - label: open
      txNumber: 1000
      rateControl:
        type: fixed-rate
        opts:
          tps: 50
      workload:
        module: workload/open.js
";

#[test]
pub fn only_the_rate_line_changes() {
    let (updated, replaced) = rewrite_rate(BENCH, "tps", 120, 10);

    assert_eq!(replaced, 1);
    assert_eq!(updated.lines().count(), BENCH.lines().count());

    for (before, after) in BENCH.lines().zip(updated.lines()) {
        if before.trim().starts_with("tps:") {
            assert_eq!(after, "          tps: 120");
        } else {
            assert_eq!(before, after);
        }
    }
}

#[test]
pub fn missing_key_is_a_no_op() {
    let contents = "test:\n  rounds: []\n";

    assert_eq!(rewrite_rate(contents, "tps", 10, 10), (contents.to_owned(), 0));
}

#[test]
pub fn last_line_without_newline_gets_terminated() {
    let (updated, replaced) = rewrite_rate("a: 1\n    tps: 3", "tps", 4, 2);

    assert_eq!(replaced, 1);
    assert_eq!(updated, "a: 1\n  tps: 4\n");
}

#[test]
pub fn update_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config-open.yaml");
    fs::write(&path, BENCH).unwrap();

    assert_eq!(update_rate(&path, "tps", 180, 10).unwrap(), 1);
    let first = fs::read(&path).unwrap();

    assert_eq!(update_rate(&path, "tps", 180, 10).unwrap(), 1);
    assert_eq!(fs::read(&path).unwrap(), first);

    // no temporary files are left behind
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
pub fn update_missing_file_fails() {
    let dir = TempDir::new().unwrap();

    assert!(update_rate(&dir.path().join("missing.yaml"), "tps", 1, 10).is_err());
}
