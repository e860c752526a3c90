use crate::error::JResult;
use crate::storage::SessionExport;
use chrono::Utc;
use fall_detector_rs::{
    AccelSample, AlertSink, DetectorConfig, DeviceContext, FallAlert, FallDetectorError,
    FallRecord, LocationFix, MonitorService, MonitorState, MonitorStats,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Session metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub session_id: String,
    pub start_time: String,
    pub state: MonitorState,
    pub stats: MonitorStats,
}

/// What the Kotlin side needs to act on a fall: the document to persist and the
/// alert to present.
#[derive(Debug, Clone, Serialize)]
pub struct FallNotice {
    pub record: FallRecord,
    pub alert: Option<FallAlert>,
}

/// Keeps the most recent alert until the bridge collects it
#[derive(Clone, Default)]
struct AlertSlot(Arc<Mutex<Option<FallAlert>>>);

impl AlertSlot {
    fn take(&self) -> Option<FallAlert> {
        self.0.lock().ok().and_then(|mut slot| slot.take())
    }
}

impl AlertSink for AlertSlot {
    fn raise(&mut self, alert: &FallAlert) -> fall_detector_rs::Result<()> {
        let mut slot = self
            .0
            .lock()
            .map_err(|_| FallDetectorError::AlertFailed("alert slot poisoned".to_string()))?;
        *slot = Some(alert.clone());
        Ok(())
    }
}

/// Monitoring session driven by the Android service
pub struct MonitoringSession {
    metadata: SessionMetadata,
    config: Option<DetectorConfig>,
    context: DeviceContext,
    emergency_number: Option<String>,
    last_location: Arc<Mutex<Option<LocationFix>>>,
    alerts: AlertSlot,
    service: Option<MonitorService>,
    records: Vec<FallRecord>,
}

impl MonitoringSession {
    /// Create new session in Idle state
    pub fn new() -> Self {
        MonitoringSession {
            metadata: SessionMetadata {
                session_id: format!("session_{}", Utc::now().timestamp_millis()),
                start_time: Utc::now().to_rfc3339(),
                state: MonitorState::Idle,
                stats: MonitorStats::default(),
            },
            config: None,
            context: DeviceContext::default(),
            emergency_number: None,
            last_location: Arc::new(Mutex::new(None)),
            alerts: AlertSlot::default(),
            service: None,
            records: Vec::new(),
        }
    }

    /// Idle → Monitoring with a fresh detector
    pub fn start(&mut self, config: DetectorConfig, sensor_available: bool) -> JResult<()> {
        if self.service.is_some() {
            return Err(FallDetectorError::AlreadyRunning.into());
        }

        let location = Arc::clone(&self.last_location);
        let mut service = MonitorService::new(
            config.clone(),
            self.context.clone(),
            Box::new(self.alerts.clone()),
        )?
        .with_location(Box::new(move || {
            location.lock().ok().and_then(|fix| fix.clone())
        }));
        if let Some(number) = &self.emergency_number {
            service = service.with_emergency_number(number.clone());
        }
        service.start(sensor_available)?;

        let now = Utc::now();
        self.metadata = SessionMetadata {
            session_id: format!("session_{}", now.timestamp_millis()),
            start_time: now.to_rfc3339(),
            state: MonitorState::Monitoring,
            stats: MonitorStats::default(),
        };
        self.config = Some(config);
        self.records.clear();
        self.service = Some(service);
        Ok(())
    }

    /// Monitoring → Idle; records stay available for export
    pub fn stop(&mut self) -> JResult<()> {
        let mut service = self.service.take().ok_or(FallDetectorError::NotRunning)?;
        service.stop()?;
        self.metadata.stats = service.stats().clone();
        self.metadata.state = MonitorState::Idle;
        Ok(())
    }

    pub fn state(&self) -> MonitorState {
        self.metadata.state
    }

    pub fn set_user_context(&mut self, context: DeviceContext, emergency_number: Option<String>) {
        if let Some(service) = self.service.as_mut() {
            service.set_context(context.clone());
            service.set_emergency_number(emergency_number.clone());
        }
        self.context = context;
        self.emergency_number = emergency_number;
    }

    pub fn update_location(&mut self, fix: LocationFix) {
        if let Ok(mut last) = self.last_location.lock() {
            *last = Some(fix);
        }
    }

    /// Feed one accelerometer sample; returns the notice for a confirmed fall
    pub fn push_accel_sample(&mut self, sample: AccelSample) -> JResult<Option<FallNotice>> {
        let service = self.service.as_mut().ok_or(FallDetectorError::NotRunning)?;
        let result = service.on_sample(sample);
        self.metadata.stats = service.stats().clone();

        let Some(record) = result? else {
            return Ok(None);
        };
        self.records.push(record.clone());
        Ok(Some(FallNotice {
            record,
            alert: self.alerts.take(),
        }))
    }

    pub fn event_count(&self) -> usize {
        self.records.len()
    }

    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    pub fn export(&self) -> SessionExport {
        SessionExport {
            metadata: self.metadata.clone(),
            config: self.config.clone(),
            context: self.context.clone(),
            records: self.records.clone(),
        }
    }
}

impl Default for MonitoringSession {
    fn default() -> Self {
        Self::new()
    }
}
