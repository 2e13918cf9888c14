use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::File,
    io::Error,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum ConfigErrors {
    #[error("Failed to read the config file")]
    FileNotReadable(#[from] Error),
    #[error("Failed to parse the config file")]
    InvalidYaml(#[from] serde_yaml::Error),
    #[error("No target rates configured for function {0}")]
    UnknownFunction(String),
    #[error("Config failed preflight checks")]
    PreflightFailed,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    // how often the whole function x rate grid is executed
    #[serde(default = "default_repetitions")]
    pub repetitions: usize,
    // functions in execution order, each with its Caliper benchmark config
    #[serde(default = "default_functions")]
    pub functions: Vec<FunctionConfig>,
    // target rates per function name, executed in list order
    #[serde(default = "default_rates")]
    pub rates: BTreeMap<String, Vec<u32>>,
    // key of the rate line inside the benchmark configs
    #[serde(default = "default_rate_key")]
    pub rate_key: String,
    #[serde(default = "default_rate_indent")]
    pub rate_indent: usize,

    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub deploy: DeployConfig,
    #[serde(default)]
    pub caliper: CaliperConfig,
    #[serde(default)]
    pub extract: ExtractConfig,

    // wait after deploying before the first run
    #[serde(default = "default_stabilization")]
    pub stabilization: Settle,
    // wait after each run so the load generator connections are closed
    #[serde(default = "default_cooldown")]
    pub cooldown: Settle,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FunctionConfig {
    pub name: String,
    pub bench_config: PathBuf,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields, default)]
pub struct NetworkConfig {
    pub endpoint: String,
    pub attempts: usize,
    pub timeout_secs: u64,
    pub interval_secs: u64,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields, default)]
pub struct DeployConfig {
    // directory the deployment command is executed in
    pub workdir: PathBuf,
    pub command: Vec<String>,
    // scripted answers to the confirmation prompts
    pub input: String,
    pub timeout_secs: u64,
    pub warmup_secs: u64,
    // name of the contract entry in the network config
    pub contract: String,
    // regex with one capture group for the deployed address
    pub address_pattern: String,
    pub network_config: PathBuf,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields, default)]
pub struct CaliperConfig {
    pub command: Vec<String>,
    pub workspace: PathBuf,
    pub bind_sut: String,
    // report written by Caliper into the working directory
    pub default_report: PathBuf,
    pub reports_dir: PathBuf,
    // kill a run after this many seconds, runs are unbounded when unset
    pub timeout_secs: Option<u64>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields, default)]
pub struct ExtractConfig {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// How to wait for an external resource to become quiescent
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "lowercase")]
pub enum Settle {
    /// sleep for a fixed amount of time
    Fixed { secs: u64 },
    /// poll the network endpoint with exponential backoff until it answers
    Poll { initial_ms: u64, max_wait_secs: u64 },
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8545".to_owned(),
            attempts: 10,
            timeout_secs: 5,
            interval_secs: 3,
        }
    }
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("../Hardhat-contracts"),
            command: [
                "npx",
                "hardhat",
                "ignition",
                "deploy",
                "./ignition/modules/Simple.ts",
                "--network",
                "besu",
                "--reset",
            ]
            .map(str::to_owned)
            .to_vec(),
            input: "y\ny\n".to_owned(),
            timeout_secs: 120,
            warmup_secs: 15,
            contract: "simple".to_owned(),
            address_pattern: r"simple#simple - (0x[a-fA-F0-9]{40})".to_owned(),
            network_config: PathBuf::from("networks/besu/networkconfig.json"),
        }
    }
}

impl Default for CaliperConfig {
    fn default() -> Self {
        Self {
            command: ["npx", "caliper", "launch", "manager"]
                .map(str::to_owned)
                .to_vec(),
            workspace: PathBuf::from("./"),
            bind_sut: "besu:latest".to_owned(),
            default_report: PathBuf::from("report.html"),
            reports_dir: PathBuf::from("reports_htmls"),
            timeout_secs: None,
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("reports_htmls/experiments"),
            output: PathBuf::from("reports_csv/experiments"),
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            repetitions: default_repetitions(),
            functions: default_functions(),
            rates: default_rates(),
            rate_key: default_rate_key(),
            rate_indent: default_rate_indent(),
            network: NetworkConfig::default(),
            deploy: DeployConfig::default(),
            caliper: CaliperConfig::default(),
            extract: ExtractConfig::default(),
            stabilization: default_stabilization(),
            cooldown: default_cooldown(),
        }
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl SweepConfig {
    /// read a yaml config, missing fields fall back to the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigErrors> {
        let file = File::open(path)?;

        Ok(serde_yaml::from_reader(file)?)
    }

    /// Target rates of a function, unknown functions are an error
    pub fn rates_for(&self, function: &str) -> Result<&[u32], ConfigErrors> {
        self.rates
            .get(function)
            .map(Vec::as_slice)
            .ok_or_else(|| ConfigErrors::UnknownFunction(function.to_owned()))
    }

    /// Check the config and report every problem at once, returns true if any error was found
    pub fn preflight_checks(&self) -> bool {
        let mut contains_error = false;

        if self.functions.is_empty() {
            error!("No function was defined, unable to build a queue of runs");
            contains_error = true;
        }

        if self.repetitions == 0 {
            warn!("repetitions is 0, no run will be executed");
        }

        let duplicates = self
            .functions
            .iter()
            .map(|function| function.name.as_str())
            .duplicates()
            .collect_vec();

        for name in duplicates {
            error!("Function {name} is defined more than once");
            contains_error = true;
        }

        for function in self.functions.iter() {
            let name = &function.name;

            match self.rates_for(name) {
                Ok([]) => {
                    error!("rates.{name} is empty, the function would never run");
                    contains_error = true;
                }
                Ok(rates) => {
                    if rates.contains(&0) {
                        error!("rates.{name} contains a rate of 0");
                        contains_error = true;
                    }
                }
                Err(e) => {
                    error!("{e}");
                    contains_error = true;
                }
            }

            if !function.bench_config.is_file() {
                error!(
                    "Failed to find the benchmark config of {name} at {}",
                    function.bench_config.to_string_lossy()
                );
                contains_error = true;
            }
        }

        for name in self.rates.keys() {
            if !self.functions.iter().any(|function| &function.name == name) {
                warn!("rates.{name} has no matching function and will be ignored");
            }
        }

        if self.network.attempts == 0 {
            error!("network.attempts cannot be 0, the network would never be considered ready");
            contains_error = true;
        }

        if self.deploy.command.is_empty() {
            error!("deploy.command cannot be empty");
            contains_error = true;
        }

        if self.caliper.command.is_empty() {
            error!("caliper.command cannot be empty");
            contains_error = true;
        }

        if let Err(e) = regex::Regex::new(&self.deploy.address_pattern) {
            error!("deploy.address_pattern is not a valid regex: {e}");
            contains_error = true;
        }

        contains_error
    }
}

fn default_repetitions() -> usize {
    5
}

fn default_functions() -> Vec<FunctionConfig> {
    ["open", "query", "transfer"]
        .into_iter()
        .map(|name| FunctionConfig {
            name: name.to_owned(),
            bench_config: PathBuf::from(format!(
                "benchmarks/scenario-monitoring/Simple/config-{name}.yaml"
            )),
        })
        .collect()
}

fn default_rates() -> BTreeMap<String, Vec<u32>> {
    BTreeMap::from([
        (
            "open".to_owned(),
            vec![60, 80, 100, 120, 140, 160, 180],
        ),
        (
            "query".to_owned(),
            vec![100, 200, 300, 400, 500, 600, 700],
        ),
        ("transfer".to_owned(), vec![70, 80, 90, 100, 110]),
    ])
}

fn default_rate_key() -> String {
    "tps".to_owned()
}

fn default_rate_indent() -> usize {
    10
}

fn default_stabilization() -> Settle {
    Settle::Fixed { secs: 15 }
}

fn default_cooldown() -> Settle {
    Settle::Fixed { secs: 10 }
}
