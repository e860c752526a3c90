use crate::error::{FallDetectorError, Result};
use crate::types::serde_millis;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_FALL_THRESHOLD: f64 = 2.0; // m/s²
pub const DEFAULT_MIN_FALL_DURATION_MS: u64 = 50;
pub const DEFAULT_COOLDOWN_MS: u64 = 5_000;

/// How repeat detections are suppressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RepeatPolicy {
    /// One event per sub-threshold episode.
    #[default]
    Episode,
    /// One event per episode, and no event until `interval` has passed since the
    /// last confirmed one.
    Cooldown {
        #[serde(with = "serde_millis", rename = "interval_ms")]
        interval: Duration,
    },
}

/// Detector tuning. Every field may be omitted from a JSON config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Magnitude (m/s²) strictly below which the device counts as falling
    pub fall_threshold: f64,
    /// Continuous time below threshold before a fall is confirmed
    #[serde(with = "serde_millis", rename = "min_fall_duration_ms")]
    pub min_fall_duration: Duration,
    pub repeat_policy: RepeatPolicy,
}

impl DetectorConfig {
    /// Tuning of the background alert service: 2.0 m/s² for 50 ms, once per episode.
    pub fn background_service() -> Self {
        Self {
            fall_threshold: DEFAULT_FALL_THRESHOLD,
            min_fall_duration: Duration::from_millis(DEFAULT_MIN_FALL_DURATION_MS),
            repeat_policy: RepeatPolicy::Episode,
        }
    }

    /// Tuning of the foreground service: 7.5 m/s², immediate, 5 s cooldown.
    pub fn foreground_service() -> Self {
        Self {
            fall_threshold: 7.5,
            min_fall_duration: Duration::ZERO,
            repeat_policy: RepeatPolicy::Cooldown {
                interval: Duration::from_millis(DEFAULT_COOLDOWN_MS),
            },
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: DetectorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.fall_threshold.is_finite() || self.fall_threshold <= 0.0 {
            return Err(FallDetectorError::InvalidConfig(format!(
                "fall_threshold must be a positive number, got {}",
                self.fall_threshold
            )));
        }
        Ok(())
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::background_service()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_background_service() {
        let config = DetectorConfig::default();
        assert_eq!(config.fall_threshold, 2.0);
        assert_eq!(config.min_fall_duration, Duration::from_millis(50));
        assert_eq!(config.repeat_policy, RepeatPolicy::Episode);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = DetectorConfig::from_json(r#"{"fall_threshold": 3.0}"#).unwrap();
        assert_eq!(config.fall_threshold, 3.0);
        assert_eq!(config.min_fall_duration, Duration::from_millis(50));
    }

    #[test]
    fn test_cooldown_policy_json() {
        let json = r#"{
            "fall_threshold": 7.5,
            "min_fall_duration_ms": 0,
            "repeat_policy": {"kind": "cooldown", "interval_ms": 5000}
        }"#;
        let config = DetectorConfig::from_json(json).unwrap();
        assert_eq!(config, DetectorConfig::foreground_service());
    }

    #[test]
    fn test_rejects_bad_threshold() {
        for bad in ["0.0", "-1.0"] {
            let json = format!(r#"{{"fall_threshold": {}}}"#, bad);
            assert!(matches!(
                DetectorConfig::from_json(&json),
                Err(FallDetectorError::InvalidConfig(_))
            ));
        }
        let config = DetectorConfig {
            fall_threshold: f64::NAN,
            ..DetectorConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
