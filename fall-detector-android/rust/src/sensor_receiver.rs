use crate::error::{BridgeError, JResult};
use fall_detector_rs::{AccelSample, LocationFix, Timestamp};

/// Accelerometer sample from Android SensorEvent (values in m/s², timestamp in
/// elapsedRealtimeNanos)
pub fn accel_sample(x: f64, y: f64, z: f64, timestamp_nanos: i64) -> JResult<AccelSample> {
    if timestamp_nanos < 0 {
        return Err(BridgeError::InvalidParameters(format!(
            "negative sensor timestamp {}",
            timestamp_nanos
        )));
    }
    Ok(AccelSample::new(
        x,
        y,
        z,
        Timestamp::from_nanos(timestamp_nanos as u64),
    ))
}

/// Last-known location from Android LocationManager
pub fn location_fix(
    latitude: f64,
    longitude: f64,
    accuracy: f64,
    provider: String,
    timestamp_ms: i64,
) -> JResult<LocationFix> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(BridgeError::InvalidParameters(format!(
            "coordinates out of range: {}, {}",
            latitude, longitude
        )));
    }
    Ok(LocationFix {
        latitude,
        longitude,
        accuracy: accuracy.max(0.0),
        provider,
        timestamp_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accel_sample_conversion() {
        let sample = accel_sample(3.0, 4.0, 0.0, 2_000_000).unwrap();
        assert_eq!(sample.magnitude(), 5.0);
        assert_eq!(sample.timestamp.as_millis(), 2);
        assert!(accel_sample(0.0, 0.0, 0.0, -1).is_err());
    }

    #[test]
    fn test_location_validation() {
        let fix = location_fix(6.9, 79.8, -1.0, "fused".to_string(), 0).unwrap();
        assert_eq!(fix.accuracy, 0.0);
        assert!(location_fix(91.0, 0.0, 5.0, "gps".to_string(), 0).is_err());
        assert!(location_fix(0.0, f64::NAN, 5.0, "gps".to_string(), 0).is_err());
    }
}
