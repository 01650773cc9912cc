// THEORY:
// `PipelineConfig` holds every tunable of the capture pipeline. It is a plain
// struct with public fields so callers can build it in code, and it
// deserializes from TOML with every field defaulted so a config file only
// needs the values it changes.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Frames allowed in the recognizer at once. Clamped to `1..=max(num_cpus, 2)`.
    pub max_in_flight: usize,
    /// How long `stop_stream` waits for in-flight frames before detaching them.
    pub shutdown_grace_ms: u64,
    /// Capacity of the listener's event channel. Events that do not fit are dropped.
    pub event_capacity: usize,
    /// Producer sleep when the source has no frame ready.
    pub idle_backoff_ms: u64,
    /// Consecutive source read errors tolerated before the producer gives up.
    pub max_consecutive_read_failures: u32,
    /// Resolve portrait zones for passports from recorded artifacts.
    pub locate_portraits: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 1,
            shutdown_grace_ms: 2000,
            event_capacity: 16,
            idle_backoff_ms: 5,
            max_consecutive_read_failures: 30,
            locate_portraits: true,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(text)?;
        config.validated()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Rejects values the pipeline cannot run with and clamps the in-flight bound.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "event_capacity",
                reason: "must be at least 1".into(),
            });
        }
        if self.max_consecutive_read_failures == 0 {
            return Err(ConfigError::Invalid {
                field: "max_consecutive_read_failures",
                reason: "must be at least 1".into(),
            });
        }
        // Two is always allowed, even on a single core.
        let ceiling = num_cpus::get().max(2);
        let clamped = self.max_in_flight.clamp(1, ceiling);
        if clamped != self.max_in_flight {
            log::warn!("[CONFIG] max_in_flight {} clamped to {}", self.max_in_flight, clamped);
            self.max_in_flight = clamped;
        }
        Ok(self)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(PipelineConfig::from_toml_str("").expect("parse"), PipelineConfig::default());
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let config = PipelineConfig::from_toml_str("shutdown_grace_ms = 50\nlocate_portraits = false\n")
            .expect("parse");
        assert_eq!(config.shutdown_grace(), Duration::from_millis(50));
        assert!(!config.locate_portraits);
        assert_eq!(config.max_in_flight, 1);
    }

    #[test]
    fn in_flight_bound_is_clamped() {
        let zero = PipelineConfig { max_in_flight: 0, ..Default::default() };
        assert_eq!(zero.validated().expect("valid").max_in_flight, 1);
        let huge = PipelineConfig { max_in_flight: 100_000, ..Default::default() };
        assert_eq!(huge.validated().expect("valid").max_in_flight, num_cpus::get().max(2));
        let two = PipelineConfig { max_in_flight: 2, ..Default::default() };
        assert_eq!(two.validated().expect("valid").max_in_flight, 2);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            PipelineConfig::from_toml_str("event_capacity = 0"),
            Err(ConfigError::Invalid { field: "event_capacity", .. })
        ));
        assert!(matches!(
            PipelineConfig::from_toml_str("max_in_flight = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
