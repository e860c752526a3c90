pub mod time;

pub use time::{serde_millis, Timestamp};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Standard gravity in m/s², the magnitude a device reads when at rest.
pub const STANDARD_GRAVITY: f64 = 9.80665;

/// One accelerometer reading in m/s², gravity included.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccelSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub timestamp: Timestamp,
}

impl AccelSample {
    pub fn new(x: f64, y: f64, z: f64, timestamp: Timestamp) -> Self {
        Self { x, y, z, timestamp }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// A confirmed free-fall detection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FallEvent {
    /// Magnitude of the sample that confirmed the fall, m/s²
    pub acceleration_at_detection: f64,
    #[serde(with = "serde_millis", rename = "duration_below_threshold_ms")]
    pub duration_below_threshold: Duration,
    pub detected_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accel_magnitude() {
        let accel = AccelSample::new(3.0, 4.0, 0.0, Timestamp::ZERO);
        assert_eq!(accel.magnitude(), 5.0);
    }

    #[test]
    fn test_non_finite_sample() {
        let accel = AccelSample::new(0.0, f64::NAN, 9.8, Timestamp::ZERO);
        assert!(!accel.is_finite());
        assert!(AccelSample::new(0.0, 0.0, 9.8, Timestamp::ZERO).is_finite());
    }

    #[test]
    fn test_event_json_uses_millis() {
        let event = FallEvent {
            acceleration_at_detection: 0.5,
            duration_below_threshold: Duration::from_millis(50),
            detected_at: Timestamp::from_millis(50),
        };
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["duration_below_threshold_ms"], 50);
        assert_eq!(json["detected_at"], 50_000_000u64);
    }
}
