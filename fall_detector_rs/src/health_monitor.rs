use std::sync::{Arc, Mutex};
use tokio::time::{sleep, Duration, Instant};

#[derive(Debug)]
struct WatchState {
    last_update: Instant,
    reported: bool,
}

/// Notices when a sensor stops delivering samples.
#[derive(Debug)]
pub struct SensorWatchdog {
    pub name: String,
    pub silence_threshold: Duration,
    state: Mutex<WatchState>,
}

impl SensorWatchdog {
    pub fn new(name: &str, silence_threshold: Duration) -> Self {
        SensorWatchdog {
            name: name.to_string(),
            silence_threshold,
            state: Mutex::new(WatchState {
                last_update: Instant::now(),
                reported: false,
            }),
        }
    }

    /// Record that a sample just arrived
    pub fn feed(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.last_update = Instant::now();
            state.reported = false;
        }
    }

    pub fn silence(&self) -> Option<Duration> {
        self.state.lock().ok().map(|s| s.last_update.elapsed())
    }

    pub fn is_silent(&self) -> bool {
        self.silence()
            .map(|d| d > self.silence_threshold)
            .unwrap_or(false)
    }

    /// The silence duration, reported once per silent stretch
    pub fn check(&self) -> Option<Duration> {
        let mut state = self.state.lock().ok()?;
        let silence = state.last_update.elapsed();
        if silence > self.silence_threshold && !state.reported {
            state.reported = true;
            return Some(silence);
        }
        None
    }
}

/// Periodically check the watchdog and log when the sensor goes quiet.
pub async fn watchdog_task(watchdog: Arc<SensorWatchdog>, check_interval: Duration) {
    loop {
        sleep(check_interval).await;

        if let Some(silence) = watchdog.check() {
            log::warn!(
                "[HEALTH] {} silent for {:.1}s, falls cannot be detected",
                watchdog.name,
                silence.as_secs_f64()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_silence_detection() {
        let watchdog = SensorWatchdog::new("Accel", Duration::from_millis(50));
        assert!(!watchdog.is_silent());
        assert_eq!(watchdog.check(), None);

        thread::sleep(Duration::from_millis(80));
        assert!(watchdog.is_silent());

        watchdog.feed();
        assert!(!watchdog.is_silent());
    }

    #[test]
    fn test_check_reports_once_per_silence() {
        let watchdog = SensorWatchdog::new("Accel", Duration::from_millis(20));
        thread::sleep(Duration::from_millis(40));

        assert!(watchdog.check().is_some());
        assert!(watchdog.check().is_none());

        watchdog.feed();
        thread::sleep(Duration::from_millis(40));
        assert!(watchdog.check().is_some());
    }
}
