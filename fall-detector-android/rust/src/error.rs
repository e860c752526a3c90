use fall_detector_rs::FallDetectorError;
use jni::JNIEnv;
use thiserror::Error;

/// Errors surfaced across the JNI boundary
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error(transparent)]
    Core(#[from] FallDetectorError),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("JNI error: {0}")]
    JniError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for JNI operations
pub type JResult<T> = Result<T, BridgeError>;

/// Java exception class a bridge error is thrown as
pub fn exception_class(error: &BridgeError) -> &'static str {
    match error {
        BridgeError::Core(core) => match core {
            FallDetectorError::AlreadyRunning | FallDetectorError::NotRunning => {
                "java/lang/IllegalStateException"
            }
            FallDetectorError::InvalidSampleOrdering { .. }
            | FallDetectorError::InvalidSample(_)
            | FallDetectorError::InvalidConfig(_) => "java/lang/IllegalArgumentException",
            FallDetectorError::SensorUnavailable(_)
            | FallDetectorError::StorageError(_)
            | FallDetectorError::Io(_) => "java/io/IOException",
            FallDetectorError::AlertFailed(_) | FallDetectorError::Serialization(_) => {
                "java/lang/RuntimeException"
            }
        },
        BridgeError::InvalidParameters(_) => "java/lang/IllegalArgumentException",
        BridgeError::JniError(_) | BridgeError::Internal(_) => "java/lang/RuntimeException",
    }
}

/// Throw Java exception from Rust error
pub fn throw_java_exception(env: &mut JNIEnv, error: &BridgeError) -> JResult<()> {
    log::error!("{}", error);
    env.throw_new(exception_class(error), error.to_string())
        .map_err(|_| BridgeError::JniError("Failed to throw exception".to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fall_detector_rs::Timestamp;

    #[test]
    fn test_exception_mapping() {
        let state: BridgeError = FallDetectorError::NotRunning.into();
        assert_eq!(exception_class(&state), "java/lang/IllegalStateException");

        let ordering: BridgeError = FallDetectorError::InvalidSampleOrdering {
            previous: Timestamp::from_millis(2),
            current: Timestamp::from_millis(1),
        }
        .into();
        assert_eq!(exception_class(&ordering), "java/lang/IllegalArgumentException");

        let sensor: BridgeError = FallDetectorError::SensorUnavailable("none".to_string()).into();
        assert_eq!(exception_class(&sensor), "java/io/IOException");

        let jni = BridgeError::JniError("boom".to_string());
        assert_eq!(exception_class(&jni), "java/lang/RuntimeException");
    }

    #[test]
    fn test_core_message_passes_through() {
        let err: BridgeError = FallDetectorError::AlreadyRunning.into();
        assert_eq!(err.to_string(), "Monitoring already running");
    }
}
