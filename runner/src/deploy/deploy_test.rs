use super::{extract_address, update_network_config, DeployError, Deployer};
use crate::config::DeployConfig;
use std::{fs, path::Path};
use tempfile::TempDir;

const ADDRESS: &str = "0x42699A7612A82f1d9C36148af9C77354759b210b";

const NETWORK: &str = r#"{
    "caliper": {
        "blockchain": "ethereum"
    },
    "ethereum": {
        "url": "ws://localhost:8546",
        "contracts": {
            "simple": {
                "address": "0x0000000000000000000000000000000000000000",
                "estimateGas": true,
                "gas": {
                    "open": 45000
                },
                "abi": []
            }
        }
    }
}"#;

fn deploy_config(dir: &Path, script: &str) -> DeployConfig {
    let network_config = dir.join("networkconfig.json");
    fs::write(&network_config, NETWORK).unwrap();

    DeployConfig {
        workdir: dir.to_path_buf(),
        command: vec!["sh".to_owned(), "-c".to_owned(), script.to_owned()],
        timeout_secs: 5,
        warmup_secs: 0,
        network_config,
        ..DeployConfig::default()
    }
}

#[test]
pub fn address_is_captured() {
    let stdout = format!("Deployed Addresses\n\nsimple#simple - {ADDRESS}\n");

    assert_eq!(
        extract_address(r"simple#simple - (0x[a-fA-F0-9]{40})", &stdout).unwrap(),
        ADDRESS
    );
    assert!(matches!(
        extract_address(r"simple#simple - (0x[a-fA-F0-9]{40})", "nothing here"),
        Err(DeployError::AddressNotFound { .. })
    ));
}

#[test]
pub fn network_config_keeps_order_and_indent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("networkconfig.json");
    fs::write(&path, NETWORK).unwrap();

    update_network_config(&path, "simple", ADDRESS).unwrap();

    let expected = NETWORK.replace("0x0000000000000000000000000000000000000000", ADDRESS);
    assert_eq!(fs::read_to_string(&path).unwrap(), expected);
}

#[test]
pub fn network_config_without_contract_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("networkconfig.json");
    fs::write(&path, NETWORK).unwrap();

    assert!(matches!(
        update_network_config(&path, "token", ADDRESS),
        Err(DeployError::MissingContract(name)) if name == "token"
    ));
    // untouched on failure
    assert_eq!(fs::read_to_string(&path).unwrap(), NETWORK);
}

#[test]
pub fn missing_network_config_fails() {
    let dir = TempDir::new().unwrap();

    assert!(matches!(
        update_network_config(&dir.path().join("missing.json"), "simple", ADDRESS),
        Err(DeployError::NetworkConfigMissing(_))
    ));
}

#[test]
pub fn deploy_answers_prompts_and_records_address() {
    let dir = TempDir::new().unwrap();
    // only prints the address when both confirmations arrive on stdin
    let script = format!(
        "read first && read second && [ \"$first$second\" = yy ] && echo 'simple#simple - {ADDRESS}'"
    );
    let config = deploy_config(dir.path(), &script);

    assert_eq!(Deployer::new(config.clone()).deploy().unwrap(), ADDRESS);

    let written = fs::read_to_string(&config.network_config).unwrap();
    assert!(written.contains(ADDRESS));
}

#[test]
pub fn failing_command_reports_stderr() {
    let dir = TempDir::new().unwrap();
    let config = deploy_config(dir.path(), "echo 'no network' >&2; exit 3");

    match Deployer::new(config).deploy() {
        Err(DeployError::Failed { stderr }) => assert_eq!(stderr.trim(), "no network"),
        other => panic!("expected a failed deployment, got {other:?}"),
    }
}

#[test]
pub fn output_without_address_fails() {
    let dir = TempDir::new().unwrap();
    let config = deploy_config(dir.path(), "echo 'Deployment complete'");

    assert!(matches!(
        Deployer::new(config).deploy(),
        Err(DeployError::AddressNotFound { stdout }) if stdout.contains("Deployment complete")
    ));
}

#[test]
pub fn hung_command_is_killed() {
    let dir = TempDir::new().unwrap();
    let mut config = deploy_config(dir.path(), "sleep 30");
    config.timeout_secs = 1;

    assert!(matches!(
        Deployer::new(config).deploy(),
        Err(DeployError::Timeout(_))
    ));
}

#[test]
pub fn missing_workdir_fails() {
    let dir = TempDir::new().unwrap();
    let mut config = deploy_config(dir.path(), "true");
    config.workdir = dir.path().join("Hardhat-contracts");

    assert!(matches!(
        Deployer::new(config).deploy(),
        Err(DeployError::WorkdirMissing(_))
    ));
}
