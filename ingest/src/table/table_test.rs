use super::{Record, Table};
use std::fs;
use tempfile::TempDir;

fn record(pairs: &[(&str, &str)]) -> Record {
    Record::from_pairs(
        pairs.iter().map(|(column, _)| column.to_string()),
        pairs.iter().map(|(_, value)| value.to_string()),
    )
}

#[test]
pub fn insert_replaces_in_place() {
    let mut row = record(&[("Name", "open"), ("Succ", "10")]);
    row.insert("Name", "query");
    row.insert("Test Type", "open_report_60");

    assert_eq!(row.columns().collect::<Vec<_>>(), ["Name", "Succ", "Test Type"]);
    assert_eq!(row.get("Name"), Some("query"));
}

#[test]
pub fn columns_are_unioned_in_first_seen_order() {
    let mut table = Table::new();
    table.extend([
        record(&[("Name", "a"), ("Succ", "1")]),
        record(&[("Name", "b"), ("Fail", "2"), ("Succ", "3")]),
    ]);

    assert_eq!(table.columns(), ["Name", "Succ", "Fail"]);
}

#[test]
pub fn write_csv_leaves_missing_cells_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.csv");

    let mut table = Table::new();
    table.extend([
        record(&[("Name", "a"), ("Succ", "1")]),
        record(&[("Name", "b, c"), ("Fail", "2")]),
    ]);
    table.write_csv(&path).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "Name,Succ,Fail\na,1,\n\"b, c\",,2\n"
    );
}
