use crate::error::{FallDetectorError, Result};
use crate::types::FallEvent;
use crossbeam::channel::Sender;
use serde::{Deserialize, Serialize};

pub const ALERT_CHANNEL_ID: &str = "FREE_FALL_CHANNEL";
pub const ALERT_CHANNEL_NAME: &str = "Free Fall Detection";

/// Haptic pattern in ms: wait, buzz, pause, buzz, pause, long buzz
pub const VIBRATION_PATTERN_MS: [u64; 6] = [0, 500, 200, 500, 200, 1000];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertPriority {
    High,
    Max,
}

/// Something the user can do straight from the alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlertAction {
    OpenApp,
    CallEmergency { number: String },
}

/// Presentation-neutral description of the alert raised for a fall. The host
/// platform turns it into a notification and a vibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallAlert {
    pub channel_id: String,
    pub title: String,
    pub text: String,
    pub long_text: String,
    pub priority: AlertPriority,
    pub vibration_pattern_ms: Vec<u64>,
    pub actions: Vec<AlertAction>,
    pub event: FallEvent,
}

impl FallAlert {
    pub fn for_event(event: &FallEvent, emergency_number: Option<&str>) -> Self {
        let duration_ms = event.duration_below_threshold.as_millis();
        let acceleration = event.acceleration_at_detection;

        let mut actions = vec![AlertAction::OpenApp];
        if let Some(number) = emergency_number.filter(|n| !n.trim().is_empty()) {
            actions.push(AlertAction::CallEmergency {
                number: number.trim().to_string(),
            });
        }

        FallAlert {
            channel_id: ALERT_CHANNEL_ID.to_string(),
            title: "CRITICAL: FREE FALL DETECTED!".to_string(),
            text: format!(
                "EMERGENCY - Duration: {}ms | Acceleration: {:.2} m/s²",
                duration_ms, acceleration
            ),
            long_text: format!(
                "Free fall event detected!\n\nDuration: {} milliseconds\n\
                 Acceleration: {:.2} m/s²\n\n\
                 Device may have been dropped or fallen!\n\nTap to open app immediately.",
                duration_ms, acceleration
            ),
            priority: AlertPriority::Max,
            vibration_pattern_ms: VIBRATION_PATTERN_MS.to_vec(),
            actions,
            event: *event,
        }
    }
}

/// Receives alerts for confirmed falls
pub trait AlertSink {
    fn raise(&mut self, alert: &FallAlert) -> Result<()>;
}

/// Writes alerts to the log; used when no notification surface exists.
#[derive(Debug, Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn raise(&mut self, alert: &FallAlert) -> Result<()> {
        log::warn!("[{}] {} - {}", alert.channel_id, alert.title, alert.text);
        Ok(())
    }
}

/// Hands alerts to another thread.
impl AlertSink for Sender<FallAlert> {
    fn raise(&mut self, alert: &FallAlert) -> Result<()> {
        self.send(alert.clone())
            .map_err(|_| FallDetectorError::AlertFailed("alert receiver disconnected".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;
    use crossbeam::channel;
    use std::time::Duration;

    fn event() -> FallEvent {
        FallEvent {
            acceleration_at_detection: 0.52,
            duration_below_threshold: Duration::from_millis(80),
            detected_at: Timestamp::from_millis(1_000),
        }
    }

    #[test]
    fn test_alert_content() {
        let alert = FallAlert::for_event(&event(), Some(" 112 "));
        assert_eq!(alert.channel_id, ALERT_CHANNEL_ID);
        assert_eq!(alert.priority, AlertPriority::Max);
        assert!(alert.text.contains("80ms"));
        assert!(alert.text.contains("0.52"));
        assert_eq!(alert.vibration_pattern_ms, vec![0, 500, 200, 500, 200, 1000]);
        assert_eq!(
            alert.actions,
            vec![
                AlertAction::OpenApp,
                AlertAction::CallEmergency {
                    number: "112".to_string()
                }
            ]
        );
    }

    #[test]
    fn test_no_call_action_without_number() {
        assert_eq!(FallAlert::for_event(&event(), None).actions, vec![AlertAction::OpenApp]);
        assert_eq!(FallAlert::for_event(&event(), Some("  ")).actions.len(), 1);
    }

    #[test]
    fn test_channel_sink() {
        let (mut tx, rx) = channel::unbounded();
        let alert = FallAlert::for_event(&event(), None);
        tx.raise(&alert).unwrap();
        assert_eq!(rx.try_recv().unwrap(), alert);

        drop(rx);
        assert!(matches!(tx.raise(&alert), Err(FallDetectorError::AlertFailed(_))));
    }
}
