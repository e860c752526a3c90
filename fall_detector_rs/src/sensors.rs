use crate::types::{AccelSample, Timestamp, STANDARD_GRAVITY};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::time::Instant;
use tokio::process::Command;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tokio::time::{interval, Duration};

/// Android sampling delay classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SensorDelay {
    /// SENSOR_DELAY_NORMAL, 200 ms
    Normal,
    /// SENSOR_DELAY_UI, ~67 ms
    Ui,
    /// SENSOR_DELAY_GAME, 20 ms
    Game,
    /// SENSOR_DELAY_FASTEST, as fast as the hardware allows (floored at 5 ms here)
    Fastest,
}

impl SensorDelay {
    pub fn interval(self) -> Duration {
        match self {
            SensorDelay::Normal => Duration::from_millis(200),
            SensorDelay::Ui => Duration::from_micros(66_667),
            SensorDelay::Game => Duration::from_millis(20),
            SensorDelay::Fastest => Duration::from_millis(5),
        }
    }
}

/// Scripted accelerometer: rests at gravity, then every cycle drops the device
/// (free fall, impact, rest again).
#[derive(Debug, Clone)]
pub struct MockAccelerometer {
    cycle_ms: u64,
    fall_start_ms: u64,
    fall_ms: u64,
    impact_ms: u64,
}

impl MockAccelerometer {
    pub fn new(cycle: Duration) -> Self {
        let cycle_ms = (cycle.as_millis() as u64).max(1_000);
        Self {
            cycle_ms,
            fall_start_ms: cycle_ms - 1_000,
            fall_ms: 400,
            impact_ms: 100,
        }
    }

    pub fn reading_at(&self, timestamp: Timestamp) -> AccelSample {
        use std::f64::consts::PI;

        let phase = timestamp.as_millis() % self.cycle_ms;
        let t = phase as f64 / 1000.0;
        let impact_start = self.fall_start_ms + self.fall_ms;

        let (x, y, z) = if (self.fall_start_ms..impact_start).contains(&phase) {
            (0.1, 0.2, 0.2)
        } else if (impact_start..impact_start + self.impact_ms).contains(&phase) {
            (3.0, -4.0, 25.0)
        } else {
            (
                (t * 2.0 * PI).sin() * 0.3,
                (t * 2.0 * PI).cos() * 0.2,
                STANDARD_GRAVITY + (t * PI).sin() * 0.1,
            )
        };

        AccelSample::new(x, y, z, timestamp)
    }
}

impl Default for MockAccelerometer {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

/// Whether a real accelerometer reader (Termux:API) is installed
pub async fn probe_accelerometer() -> bool {
    match Command::new("termux-sensor").arg("-l").output().await {
        Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout)
            .to_lowercase()
            .contains("accelerometer"),
        _ => false,
    }
}

/// Push accelerometer samples into `tx` at the given delay class until the receiver
/// goes away. Samples are dropped when the channel is full. In live mode a failed
/// read skips the tick, so a dead sensor shows up as silence.
pub async fn accel_loop(tx: Sender<AccelSample>, delay: SensorDelay, use_mock: bool) {
    if use_mock {
        let mock = MockAccelerometer::default();
        sample_loop(tx, delay, move |timestamp| {
            let sample = mock.reading_at(timestamp);
            async move { Some(sample) }
        })
        .await
    } else {
        sample_loop(tx, delay, |timestamp| async move {
            let (x, y, z) = read_accelerometer().await?;
            Some(AccelSample::new(x, y, z, timestamp))
        })
        .await
    }
}

async fn sample_loop<F, Fut>(tx: Sender<AccelSample>, delay: SensorDelay, mut read: F)
where
    F: FnMut(Timestamp) -> Fut,
    Fut: Future<Output = Option<AccelSample>>,
{
    let origin = Instant::now();
    let mut ticker = interval(delay.interval());
    let mut sample_count = 0u64;
    let mut dropped = 0u64;
    let mut failed_reads = 0u64;

    loop {
        ticker.tick().await;
        if tx.is_closed() {
            log::info!("[accel] Channel closed after {} samples", sample_count);
            break;
        }

        let timestamp = Timestamp::from_nanos(origin.elapsed().as_nanos() as u64);
        let Some(sample) = read(timestamp).await else {
            failed_reads += 1;
            if failed_reads % 100 == 1 {
                log::debug!("[accel] Read failed ({} so far)", failed_reads);
            }
            continue;
        };

        match tx.try_send(sample) {
            Ok(_) => {
                sample_count += 1;
                if sample_count % 500 == 0 {
                    log::debug!("[accel] {} samples ({} dropped)", sample_count, dropped);
                }
            }
            Err(TrySendError::Closed(_)) => {
                log::info!("[accel] Channel closed after {} samples", sample_count);
                break;
            }
            Err(TrySendError::Full(_)) => {
                dropped += 1;
            }
        }
    }
}

async fn read_accelerometer() -> Option<(f64, f64, f64)> {
    let output = Command::new("termux-sensor")
        .args(["-n", "1", "-s", "accelerometer"])
        .output()
        .await
        .ok()?;
    parse_accel_output(&String::from_utf8_lossy(&output.stdout))
}

/// Parse one `termux-sensor` reading: either the JSON form
/// `{"<sensor name>": {"values": [x, y, z]}}` or the legacy
/// `Accelerometer event: x=.., y=.., z=..` text form.
pub fn parse_accel_output(output: &str) -> Option<(f64, f64, f64)> {
    if let Ok(json) = serde_json::from_str::<Value>(output) {
        return json
            .as_object()?
            .values()
            .find_map(|sensor| sensor.get("values")?.as_array().and_then(|v| xyz(v)));
    }

    let mut axes = [None; 3];
    for part in output.split(',') {
        let token = part.trim().rsplit(' ').next().unwrap_or_default();
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        let slot = match key {
            "x" => 0,
            "y" => 1,
            "z" => 2,
            _ => continue,
        };
        axes[slot] = Some(value.trim().parse::<f64>().ok()?);
    }
    Some((axes[0]?, axes[1]?, axes[2]?))
}

fn xyz(values: &[Value]) -> Option<(f64, f64, f64)> {
    match values {
        [x, y, z, ..] => Some((x.as_f64()?, y.as_f64()?, z.as_f64()?)),
        _ => None,
    }
}
