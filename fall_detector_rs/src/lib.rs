//! Free-fall detection core for the personal-safety service.
//!
//! [`FallDetector`] turns a stream of accelerometer samples into discrete
//! [`FallEvent`]s. [`MonitorService`] wraps it with the monitoring lifecycle and hands
//! each fall to the alert, location and storage collaborators.

pub mod alert;
pub mod config;
pub mod detector;
pub mod error;
pub mod health_monitor;
pub mod location;
pub mod monitor;
pub mod record;
pub mod replay;
pub mod sensors;
pub mod types;

pub use alert::{AlertAction, AlertSink, FallAlert, LogAlertSink};
pub use config::{DetectorConfig, RepeatPolicy};
pub use detector::{DetectorState, FallDetector};
pub use error::{FallDetectorError, Result};
pub use location::{LocationFix, LocationProvider};
pub use monitor::{MonitorService, MonitorState, MonitorStats};
pub use record::{DeviceContext, EventStore, FallRecord, JsonDirStore, MemoryStore};
pub use types::{AccelSample, FallEvent, Timestamp};
