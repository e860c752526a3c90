use crate::types::Timestamp;
use thiserror::Error;

/// Fall detector error types
#[derive(Error, Debug)]
pub enum FallDetectorError {
    #[error("Sample at {current} arrived after a sample at {previous}")]
    InvalidSampleOrdering {
        previous: Timestamp,
        current: Timestamp,
    },

    #[error("Invalid sample: {0}")]
    InvalidSample(String),

    #[error("Sensor unavailable: {0}")]
    SensorUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Monitoring already running")]
    AlreadyRunning,

    #[error("Monitoring not running")]
    NotRunning,

    #[error("Alert delivery failed: {0}")]
    AlertFailed(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FallDetectorError>;
