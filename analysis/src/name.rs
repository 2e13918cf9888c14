use serde::Serialize;

/// Configuration decoded from an experiment directory name such as
/// `6n-5s-qbft-v25.10.0_20251112_133845`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExperimentName {
    pub experiment: String,
    pub experiment_base: String,
    pub nodes: u32,
    pub blocktime: u32,
    pub consensus: String,
    pub version: String,
    pub timestamp: Option<String>,
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|byte| byte.is_ascii_digit())
}

/// split a trailing `_<digits>_<digits>` suffix off the name
fn split_timestamp(name: &str) -> (&str, Option<String>) {
    let mut parts = name.rsplitn(3, '_');

    match (parts.next(), parts.next(), parts.next()) {
        (Some(time), Some(date), Some(base)) if is_digits(date) && is_digits(time) => {
            (base, Some(format!("{date}_{time}")))
        }
        _ => (name, None),
    }
}

impl ExperimentName {
    /// Decode a directory name, `None` if it does not follow `<n>n-<s>s-<consensus>-v<version>`
    pub fn parse(name: &str) -> Option<Self> {
        let (base, timestamp) = split_timestamp(name);
        let fields: Vec<&str> = base.split('-').collect();

        let [nodes, blocktime, consensus, version] = fields.as_slice() else {
            return None;
        };

        Some(Self {
            experiment: name.to_owned(),
            experiment_base: base.to_owned(),
            nodes: nodes.replace('n', "").parse().ok()?,
            blocktime: blocktime.replace('s', "").parse().ok()?,
            consensus: consensus.to_string(),
            version: version.replace('v', ""),
            timestamp,
        })
    }
}

#[cfg(test)]
mod name_test;
