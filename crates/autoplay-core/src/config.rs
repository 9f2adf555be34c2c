//! Sequencer timing configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on the number of delayed retries
pub const MAX_RETRY_DELAYS: usize = 10;

/// Upper bound on any single wait
pub const MAX_DELAY_MS: u64 = 60_000;

/// Timing knobs for the autoplay escalation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Waits before each delayed retry, tried in order
    pub retry_delays_ms: Vec<u64>,
    /// Pause before escalating to the next strategy
    pub step_pause_ms: u64,
    /// Delay between the ready notification and the first attempt
    pub ready_delay_ms: u64,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            retry_delays_ms: vec![1000, 2000, 3000],
            step_pause_ms: 500,
            ready_delay_ms: 100,
        }
    }
}

impl SequencerConfig {
    /// Shorter waits for pages that want the prompt quickly
    pub fn aggressive() -> Self {
        Self {
            retry_delays_ms: vec![250, 750],
            step_pause_ms: 200,
            ready_delay_ms: 50,
        }
    }

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.retry_delays_ms.len() > MAX_RETRY_DELAYS {
            return Err(Error::InvalidConfig(format!(
                "at most {} retry delays allowed, got {}",
                MAX_RETRY_DELAYS,
                self.retry_delays_ms.len()
            )));
        }

        let too_long = self
            .retry_delays_ms
            .iter()
            .chain([&self.step_pause_ms, &self.ready_delay_ms])
            .find(|&&ms| ms > MAX_DELAY_MS);

        if let Some(ms) = too_long {
            return Err(Error::InvalidConfig(format!(
                "delay of {}ms exceeds {}ms",
                ms, MAX_DELAY_MS
            )));
        }

        Ok(())
    }

    pub fn retry_delays(&self) -> impl Iterator<Item = Duration> + '_ {
        self.retry_delays_ms.iter().map(|&ms| Duration::from_millis(ms))
    }

    pub fn step_pause(&self) -> Duration {
        Duration::from_millis(self.step_pause_ms)
    }

    pub fn ready_delay(&self) -> Duration {
        Duration::from_millis(self.ready_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SequencerConfig::default();
        assert_eq!(config.retry_delays_ms, vec![1000, 2000, 3000]);
        assert_eq!(config.step_pause(), Duration::from_millis(500));
        assert_eq!(config.ready_delay(), Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = SequencerConfig::from_json(r#"{"step_pause_ms": 0}"#).unwrap();
        assert_eq!(config.step_pause_ms, 0);
        assert_eq!(config.retry_delays_ms.len(), 3);
    }

    #[test]
    fn test_rejects_long_delay() {
        let err = SequencerConfig::from_json(r#"{"retry_delays_ms": [1000, 120000]}"#).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_rejects_too_many_delays() {
        let config = SequencerConfig {
            retry_delays_ms: vec![10; MAX_RETRY_DELAYS + 1],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
