use super::ExperimentName;

#[test]
pub fn parse_with_timestamp() {
    let name = ExperimentName::parse("6n-5s-qbft-v25.10.0_20251112_133845").unwrap();

    assert_eq!(name.experiment, "6n-5s-qbft-v25.10.0_20251112_133845");
    assert_eq!(name.experiment_base, "6n-5s-qbft-v25.10.0");
    assert_eq!(name.nodes, 6);
    assert_eq!(name.blocktime, 5);
    assert_eq!(name.consensus, "qbft");
    assert_eq!(name.version, "25.10.0");
    assert_eq!(name.timestamp.as_deref(), Some("20251112_133845"));
}

#[test]
pub fn parse_without_timestamp() {
    let name = ExperimentName::parse("4n-2s-ibft-v24.1").unwrap();

    assert_eq!(name.experiment_base, "4n-2s-ibft-v24.1");
    assert_eq!(name.nodes, 4);
    assert_eq!(name.blocktime, 2);
    assert_eq!(name.consensus, "ibft");
    assert_eq!(name.version, "24.1");
    assert_eq!(name.timestamp, None);
}

#[test]
pub fn non_numeric_suffix_stays_in_base() {
    // `run_a` is not a timestamp, so the base keeps five dash separated fields
    assert_eq!(ExperimentName::parse("4n-2s-ibft-v24.1-x_run_a"), None);

    let name = ExperimentName::parse("4n-2s-clique-v24.1_2025_x").unwrap();
    assert_eq!(name.version, "24.1_2025_x");
    assert_eq!(name.timestamp, None);
}

#[test]
pub fn malformed_names_are_rejected() {
    assert_eq!(ExperimentName::parse("malformed-name"), None);
    assert_eq!(ExperimentName::parse("xn-5s-qbft-v1"), None);
    assert_eq!(ExperimentName::parse("6n-fast-qbft-v1"), None);
    assert_eq!(ExperimentName::parse("6n-5s-qbft-v1-extra"), None);
    assert_eq!(ExperimentName::parse(""), None);
}
