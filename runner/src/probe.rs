use crate::config::{NetworkConfig, Settle};
use serde_json::json;
use std::{
    thread::sleep,
    time::{Duration, Instant},
};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Network is not reachable after {attempts} attempts")]
    Unreachable { attempts: usize },
    #[error("Network did not settle within {waited:?}")]
    SettleTimeout { waited: Duration },
}

/// Liveness check of the JSON-RPC endpoint of the network under test
#[derive(Debug, Clone)]
pub struct NetworkProbe {
    agent: ureq::Agent,
    endpoint: String,
    attempts: usize,
    interval: Duration,
}

impl NetworkProbe {
    pub fn new(config: &NetworkConfig) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(config.timeout()).build(),
            endpoint: config.endpoint.clone(),
            attempts: config.attempts,
            interval: config.interval(),
        }
    }

    /// Single `eth_blockNumber` call, any HTTP answer counts as alive
    pub fn is_live(&self) -> bool {
        let request = json!({
            "jsonrpc": "2.0",
            "method": "eth_blockNumber",
            "params": [],
            "id": 1,
        });

        match self.agent.post(&self.endpoint).send_json(request) {
            Ok(_) => true,
            Err(ureq::Error::Status(status, _)) => {
                debug!(status = status, "Endpoint answered with an error status");
                true
            }
            Err(ureq::Error::Transport(error)) => {
                debug!(error = %error, "Endpoint not reachable");
                false
            }
        }
    }

    /// Retry the liveness check, returns the attempt that succeeded
    pub fn wait_ready(&self) -> Result<usize, ProbeError> {
        info!("Checking connectivity with {}", self.endpoint);

        for attempt in 1..=self.attempts {
            if self.is_live() {
                info!("Network reachable (attempt {attempt}/{})", self.attempts);
                return Ok(attempt);
            }

            warn!("Attempt {attempt}/{} failed", self.attempts);

            if attempt < self.attempts {
                sleep(self.interval);
            }
        }

        Err(ProbeError::Unreachable {
            attempts: self.attempts,
        })
    }

    /// Wait according to `settle`
    pub fn settle(&self, settle: &Settle) -> Result<(), ProbeError> {
        match settle {
            Settle::Fixed { secs } => {
                debug!("Waiting {secs}s");
                sleep(Duration::from_secs(*secs));

                Ok(())
            }
            Settle::Poll {
                initial_ms,
                max_wait_secs,
            } => self.poll(
                Duration::from_millis(*initial_ms),
                Duration::from_secs(*max_wait_secs),
            ),
        }
    }

    /// poll with exponential backoff until the endpoint answers or `max_wait` elapsed
    fn poll(&self, initial: Duration, max_wait: Duration) -> Result<(), ProbeError> {
        let start = Instant::now();
        let mut delay = initial.max(Duration::from_millis(1));

        loop {
            if self.is_live() {
                debug!("Network settled after {:?}", start.elapsed());
                return Ok(());
            }

            let waited = start.elapsed();

            if waited >= max_wait {
                return Err(ProbeError::SettleTimeout { waited });
            }

            sleep(delay.min(max_wait - waited));
            delay = delay.saturating_mul(2);
        }
    }
}
