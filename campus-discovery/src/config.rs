//! Heartbeat sweep configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the registry's heartbeat sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Seconds between sweep ticks, measured from the end of the previous
    /// tick's probes.
    pub sweep_interval_secs: u64,
    /// Probe attempts per instance within one tick.
    pub max_attempts: u32,
    /// Seconds to pause between attempts of the same tick.
    pub retry_backoff_secs: u64,
    /// Per-probe request timeout in seconds.
    pub probe_timeout_secs: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 3,
            max_attempts: 3,
            retry_backoff_secs: 1,
            probe_timeout_secs: 5,
        }
    }
}

impl HeartbeatConfig {
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }

    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}
