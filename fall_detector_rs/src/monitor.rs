use crate::alert::{AlertSink, FallAlert};
use crate::config::DetectorConfig;
use crate::detector::FallDetector;
use crate::error::{FallDetectorError, Result};
use crate::location::LocationProvider;
use crate::record::{DeviceContext, EventStore, FallRecord};
use crate::types::{AccelSample, FallEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Monitoring lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorState {
    /// Created, no sensor subscription
    Idle,
    /// Receiving samples
    Monitoring,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStats {
    pub samples_observed: u64,
    pub samples_rejected: u64,
    pub events_detected: u64,
    pub alert_failures: u64,
    pub store_failures: u64,
}

/// Runtime adapter between a sample source and the fall detector.
///
/// Owns the monitoring lifecycle and routes every confirmed fall to the alert,
/// location and storage collaborators. Collaborator failures are logged and counted
/// so the sample loop keeps running.
pub struct MonitorService {
    config: DetectorConfig,
    context: DeviceContext,
    emergency_number: Option<String>,
    detector: Option<FallDetector>,
    alert: Box<dyn AlertSink + Send>,
    store: Option<Box<dyn EventStore + Send>>,
    location: Option<Box<dyn LocationProvider + Send>>,
    clock: fn() -> DateTime<Utc>,
    stats: MonitorStats,
}

impl MonitorService {
    pub fn new(
        config: DetectorConfig,
        context: DeviceContext,
        alert: Box<dyn AlertSink + Send>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            context,
            emergency_number: None,
            detector: None,
            alert,
            store: None,
            location: None,
            clock: Utc::now,
            stats: MonitorStats::default(),
        })
    }

    pub fn with_store(mut self, store: Box<dyn EventStore + Send>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_location(mut self, location: Box<dyn LocationProvider + Send>) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_emergency_number(mut self, number: impl Into<String>) -> Self {
        self.emergency_number = Some(number.into());
        self
    }

    /// Replace the wall clock used to stamp records
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Idle → Monitoring. `sensor_available` is the caller's accelerometer probe.
    /// Stats start from zero for each monitoring session.
    pub fn start(&mut self, sensor_available: bool) -> Result<()> {
        if self.detector.is_some() {
            return Err(FallDetectorError::AlreadyRunning);
        }
        if !sensor_available {
            log::error!("Accelerometer not available on this device");
            return Err(FallDetectorError::SensorUnavailable(
                "no accelerometer".to_string(),
            ));
        }
        self.detector = Some(FallDetector::new(self.config.clone())?);
        self.stats = MonitorStats::default();
        log::info!(
            "Monitoring started (threshold {:.2} m/s², min duration {:?})",
            self.config.fall_threshold,
            self.config.min_fall_duration
        );
        Ok(())
    }

    /// Monitoring → Idle, dropping the detector state.
    pub fn stop(&mut self) -> Result<()> {
        match self.detector.take() {
            Some(_) => {
                log::info!(
                    "Monitoring stopped after {} samples, {} falls",
                    self.stats.samples_observed,
                    self.stats.events_detected
                );
                Ok(())
            }
            None => Err(FallDetectorError::NotRunning),
        }
    }

    pub fn state(&self) -> MonitorState {
        if self.detector.is_some() {
            MonitorState::Monitoring
        } else {
            MonitorState::Idle
        }
    }

    pub fn stats(&self) -> &MonitorStats {
        &self.stats
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn context(&self) -> &DeviceContext {
        &self.context
    }

    pub fn set_context(&mut self, context: DeviceContext) {
        self.context = context;
    }

    pub fn set_emergency_number(&mut self, number: Option<String>) {
        self.emergency_number = number;
    }

    /// Feed one sample. Returns the stored record when it confirmed a fall.
    pub fn on_sample(&mut self, sample: AccelSample) -> Result<Option<FallRecord>> {
        let detector = self.detector.as_mut().ok_or(FallDetectorError::NotRunning)?;

        let event = match detector.observe(&sample) {
            Ok(event) => event,
            Err(e) => {
                self.stats.samples_rejected += 1;
                log::warn!("Rejected sample: {}", e);
                return Err(e);
            }
        };
        self.stats.samples_observed += 1;

        Ok(event.map(|event| self.dispatch(&event)))
    }

    fn dispatch(&mut self, event: &FallEvent) -> FallRecord {
        self.stats.events_detected += 1;

        let alert = FallAlert::for_event(event, self.emergency_number.as_deref());
        if let Err(e) = self.alert.raise(&alert) {
            self.stats.alert_failures += 1;
            log::error!("Error raising fall alert: {}", e);
        }

        let location = self.location.as_ref().and_then(|p| p.last_known());
        if location.is_none() {
            log::debug!("No last-known location for fall record");
        }

        let record = FallRecord::new(event, &self.context, location, (self.clock)());
        if let Some(store) = self.store.as_mut() {
            if let Err(e) = store.write(&record.user_id, &record.doc_id, &record) {
                self.stats.store_failures += 1;
                log::error!("Error saving fall record {}: {}", record.doc_id, e);
            }
        }

        record
    }
}
