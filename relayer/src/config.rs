//! Process configuration.
//!
//! Plain serde types; how they are loaded (file, flags, environment) is the
//! embedding binary's business.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Ingest pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Scanner -> processor channel bound. Kept tiny on purpose: a slow
    /// processor is supposed to slow the scanner down and with it the rate
    /// of contract writes.
    pub channel_capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1,
        }
    }
}

/// Sign-or-submit loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitterConfig {
    /// Seconds between polls of the contract's pending operations.
    pub poll_interval_secs: u64,
    /// When false the loop runs a single cycle and exits (one-shot mode).
    pub repeat: bool,
}

impl SubmitterConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            repeat: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: SubmitterConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert!(config.repeat);

        let config: IngestConfig = serde_json::from_str(r#"{"channel_capacity": 16}"#).unwrap();
        assert_eq!(config.channel_capacity, 16);
    }
}
