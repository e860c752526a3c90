//! Recorded session logs as sample sources.
//!
//! Logs are the `comparison_*.json[.gz]` files written by the motion recorder:
//! `{"readings": [{"timestamp": <s>, "accel": {"timestamp": <s>, "x": .., "y": .., "z": ..}}]}`.
//! Readings without an accelerometer part are skipped.

use crate::error::Result;
use crate::types::{AccelSample, Timestamp};
use flate2::read::GzDecoder;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

#[derive(Deserialize)]
struct LoggedAccel {
    timestamp: Option<f64>,
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Deserialize)]
struct LoggedReading {
    timestamp: f64,
    accel: Option<LoggedAccel>,
}

#[derive(Deserialize)]
struct LogFile {
    readings: Vec<LoggedReading>,
}

/// Load accelerometer samples from a JSON log, gunzipping `.gz` files.
pub fn load_samples(path: &Path) -> Result<Vec<AccelSample>> {
    let file = File::open(path)?;
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        parse_samples(BufReader::new(GzDecoder::new(file)))
    } else {
        parse_samples(BufReader::new(file))
    }
}

pub fn parse_samples<R: Read>(reader: R) -> Result<Vec<AccelSample>> {
    let log: LogFile = serde_json::from_reader(reader)?;
    Ok(log
        .readings
        .into_iter()
        .filter_map(|reading| {
            let accel = reading.accel?;
            let secs = accel.timestamp.unwrap_or(reading.timestamp);
            Some(AccelSample::new(
                accel.x,
                accel.y,
                accel.z,
                Timestamp::from_secs_f64(secs),
            ))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const LOG: &str = r#"{
        "readings": [
            {"timestamp": 100.00, "accel": {"timestamp": 100.00, "x": 0.0, "y": 0.0, "z": 9.8}},
            {"timestamp": 100.02, "gps": {"latitude": 1.0}},
            {"timestamp": 100.04, "accel": {"x": 0.1, "y": 0.1, "z": 0.1}}
        ],
        "incidents": []
    }"#;

    #[test]
    fn test_parse_skips_readings_without_accel() {
        let samples = parse_samples(LOG.as_bytes()).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].timestamp, Timestamp::from_millis(100_000));
        // falls back to the reading timestamp
        assert_eq!(samples[1].timestamp, Timestamp::from_millis(100_040));
    }

    #[test]
    fn test_load_gzip_log() {
        let path = std::env::temp_dir().join(format!("fall_replay_{}.json.gz", std::process::id()));
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(LOG.as_bytes()).unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let samples = load_samples(&path).unwrap();
        assert_eq!(samples.len(), 2);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_malformed_log_is_an_error() {
        assert!(parse_samples("{\"readings\": 3}".as_bytes()).is_err());
    }
}
