use crate::config::{DetectorConfig, RepeatPolicy};
use crate::error::{FallDetectorError, Result};
use crate::types::{AccelSample, FallEvent, Timestamp};

/// Free-fall state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// Magnitude at or above the fall threshold
    Stable,
    /// Below threshold since `started_at`; `processed` once the episode has fired
    InEpisode { started_at: Timestamp, processed: bool },
}

/// Threshold + duration free-fall detector.
///
/// Feed samples in arrival order from a single source. A fall is confirmed once the
/// magnitude has stayed strictly below `fall_threshold` for `min_fall_duration`, and
/// at most one event is produced per episode. The episode re-arms only after the
/// magnitude climbs back to the threshold or above.
#[derive(Debug, Clone)]
pub struct FallDetector {
    config: DetectorConfig,
    state: DetectorState,
    last_sample_at: Option<Timestamp>,
    last_confirmed_at: Option<Timestamp>,
}

impl FallDetector {
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: DetectorState::Stable,
            last_sample_at: None,
            last_confirmed_at: None,
        })
    }

    /// Process one sample. Malformed or out-of-order samples are rejected and leave
    /// the detector untouched.
    pub fn observe(&mut self, sample: &AccelSample) -> Result<Option<FallEvent>> {
        if !sample.is_finite() {
            return Err(FallDetectorError::InvalidSample(format!(
                "non-finite reading ({}, {}, {}) at {}",
                sample.x, sample.y, sample.z, sample.timestamp
            )));
        }
        if let Some(previous) = self.last_sample_at {
            if sample.timestamp < previous {
                return Err(FallDetectorError::InvalidSampleOrdering {
                    previous,
                    current: sample.timestamp,
                });
            }
        }
        self.last_sample_at = Some(sample.timestamp);

        let magnitude = sample.magnitude();

        if magnitude >= self.config.fall_threshold {
            if let DetectorState::InEpisode { started_at, .. } = self.state {
                log::debug!(
                    "Free fall ended after {:?}, magnitude back to {:.2}",
                    sample.timestamp.saturating_duration_since(started_at),
                    magnitude
                );
            }
            self.state = DetectorState::Stable;
            return Ok(None);
        }

        let (started_at, processed) = match self.state {
            DetectorState::Stable => {
                log::debug!(
                    "Potential free fall at {}, magnitude {:.2}",
                    sample.timestamp,
                    magnitude
                );
                (sample.timestamp, false)
            }
            DetectorState::InEpisode {
                started_at,
                processed,
            } => (started_at, processed),
        };

        let elapsed = sample.timestamp.saturating_duration_since(started_at);
        let confirmed = !processed
            && elapsed >= self.config.min_fall_duration
            && self.cooldown_elapsed(sample.timestamp);

        self.state = DetectorState::InEpisode {
            started_at,
            processed: processed || confirmed,
        };

        if !confirmed {
            return Ok(None);
        }

        self.last_confirmed_at = Some(sample.timestamp);
        log::warn!(
            "FREE FALL DETECTED: {:?} below {:.2} m/s², magnitude {:.2}",
            elapsed,
            self.config.fall_threshold,
            magnitude
        );

        Ok(Some(FallEvent {
            acceleration_at_detection: magnitude,
            duration_below_threshold: elapsed,
            detected_at: sample.timestamp,
        }))
    }

    /// Lazily run `samples` through the detector, yielding only confirmed falls and
    /// rejected samples.
    pub fn events<'a, I>(&'a mut self, samples: I) -> impl Iterator<Item = Result<FallEvent>> + 'a
    where
        I: IntoIterator<Item = AccelSample>,
        I::IntoIter: 'a,
    {
        samples
            .into_iter()
            .filter_map(move |sample| self.observe(&sample).transpose())
    }

    fn cooldown_elapsed(&self, now: Timestamp) -> bool {
        match self.config.repeat_policy {
            RepeatPolicy::Episode => true,
            RepeatPolicy::Cooldown { interval } => self
                .last_confirmed_at
                .map_or(true, |last| now.saturating_duration_since(last) > interval),
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Forget all history, as if freshly constructed.
    pub fn reset(&mut self) {
        self.state = DetectorState::Stable;
        self.last_sample_at = None;
        self.last_confirmed_at = None;
    }
}
