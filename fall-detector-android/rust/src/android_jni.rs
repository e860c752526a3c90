use crate::error::{throw_java_exception, BridgeError, JResult};
use crate::logging;
use crate::sensor_receiver;
use crate::session::MonitoringSession;
use fall_detector_rs::{DetectorConfig, DeviceContext, MonitorState, RepeatPolicy};
use jni::objects::{JClass, JString};
use jni::sys::{jboolean, jdouble, jint, jlong, jstring, JNI_TRUE};
use jni::JNIEnv;
use std::sync::Mutex;
use std::time::Duration;

// Global session state - stored as static to persist across JNI calls
lazy_static::lazy_static! {
    static ref GLOBAL_SESSION: Mutex<MonitoringSession> = Mutex::new(MonitoringSession::new());
}

fn with_session<T>(f: impl FnOnce(&mut MonitoringSession) -> JResult<T>) -> JResult<T> {
    let mut session = GLOBAL_SESSION.lock().map_err(|_| {
        BridgeError::Internal("Failed to acquire global session lock".to_string())
    })?;
    f(&mut session)
}

/// 0 on success, -1 after throwing the matching Java exception
fn status(env: &mut JNIEnv, result: JResult<()>) -> jint {
    match result {
        Ok(()) => 0,
        Err(e) => {
            let _ = throw_java_exception(env, &e);
            -1
        }
    }
}

/// A Java string, or null when `value` is `None` or on error (exception thrown)
fn string_result(env: &mut JNIEnv, result: JResult<Option<String>>) -> jstring {
    let value = match result {
        Ok(Some(value)) => value,
        Ok(None) => return std::ptr::null_mut(),
        Err(e) => {
            let _ = throw_java_exception(env, &e);
            return std::ptr::null_mut();
        }
    };
    match env.new_string(&value) {
        Ok(jstr) => jstr.into_raw(),
        Err(_) => {
            let _ = throw_java_exception(
                env,
                &BridgeError::JniError("Failed to create Java string".to_string()),
            );
            std::ptr::null_mut()
        }
    }
}

fn string_arg(env: &mut JNIEnv, value: &JString) -> JResult<Option<String>> {
    if value.is_null() {
        return Ok(None);
    }
    let java_str = env
        .get_string(value)
        .map_err(|e| BridgeError::JniError(format!("Failed to read Java string: {}", e)))?;
    Ok(Some(java_str.into()))
}

/// Detector config from the service's raw parameters. A cooldown of zero or less
/// selects one alert per episode.
pub fn detector_config(
    threshold: f64,
    min_duration_ms: i64,
    cooldown_ms: i64,
) -> JResult<DetectorConfig> {
    if min_duration_ms < 0 {
        return Err(BridgeError::InvalidParameters(format!(
            "negative minimum fall duration {}ms",
            min_duration_ms
        )));
    }
    let repeat_policy = if cooldown_ms > 0 {
        RepeatPolicy::Cooldown {
            interval: Duration::from_millis(cooldown_ms as u64),
        }
    } else {
        RepeatPolicy::Episode
    };
    let config = DetectorConfig {
        fall_threshold: threshold,
        min_fall_duration: Duration::from_millis(min_duration_ms as u64),
        repeat_policy,
    };
    config.validate()?;
    Ok(config)
}

/// JNI: Start monitoring with a fresh detector
/// Returns: 0 on success, -1 on error (throws Java exception)
#[no_mangle]
pub extern "system" fn Java_com_evercare_FallDetectionBridge_startMonitoring(
    mut env: JNIEnv,
    _class: JClass,
    threshold: jdouble,
    min_duration_ms: jlong,
    cooldown_ms: jlong,
    sensor_available: jboolean,
) -> jint {
    logging::init();
    let result = detector_config(threshold, min_duration_ms, cooldown_ms).and_then(|config| {
        with_session(|session| session.start(config, sensor_available == JNI_TRUE))
    });
    if result.is_ok() {
        log::info!("Monitoring started");
    }
    status(&mut env, result)
}

/// JNI: Stop monitoring
/// Returns: 0 on success, -1 on error (throws Java exception)
#[no_mangle]
pub extern "system" fn Java_com_evercare_FallDetectionBridge_stopMonitoring(
    mut env: JNIEnv,
    _class: JClass,
) -> jint {
    let result = with_session(|session| session.stop());
    if result.is_ok() {
        log::info!("Monitoring stopped");
    }
    status(&mut env, result)
}

/// JNI: Set the user and device recorded with each fall. `emergencyNumber` may be
/// null to omit the call action.
#[no_mangle]
pub extern "system" fn Java_com_evercare_FallDetectionBridge_setUserContext(
    mut env: JNIEnv,
    _class: JClass,
    user_id: JString,
    device_model: JString,
    emergency_number: JString,
) -> jint {
    let result = set_user_context_impl(&mut env, &user_id, &device_model, &emergency_number);
    status(&mut env, result)
}

fn set_user_context_impl(
    env: &mut JNIEnv,
    user_id: &JString,
    device_model: &JString,
    emergency_number: &JString,
) -> JResult<()> {
    let user_id = string_arg(env, user_id)?;
    let device_model = string_arg(env, device_model)?;
    let emergency_number = string_arg(env, emergency_number)?;
    let context = device_context(user_id, device_model)?;

    with_session(|session| {
        session.set_user_context(context, emergency_number);
        Ok(())
    })
}

/// User context from nullable Java strings. `userId` is required; a missing device
/// model is recorded as "unknown".
pub fn device_context(
    user_id: Option<String>,
    device_model: Option<String>,
) -> JResult<DeviceContext> {
    let user_id = user_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| BridgeError::InvalidParameters("userId is null or empty".to_string()))?;
    Ok(DeviceContext {
        user_id,
        device_model: device_model.unwrap_or_else(|| "unknown".to_string()),
    })
}

/// JNI: Remember the last-known location for subsequent fall records
#[no_mangle]
pub extern "system" fn Java_com_evercare_FallDetectionBridge_updateLocation(
    mut env: JNIEnv,
    _class: JClass,
    latitude: jdouble,
    longitude: jdouble,
    accuracy: jdouble,
    provider: JString,
    timestamp_ms: jlong,
) -> jint {
    let result = string_arg(&mut env, &provider).and_then(|provider| {
        let provider = provider.unwrap_or_else(|| "unknown".to_string());
        let fix =
            sensor_receiver::location_fix(latitude, longitude, accuracy, provider, timestamp_ms)?;
        with_session(|session| {
            session.update_location(fix);
            Ok(())
        })
    });
    status(&mut env, result)
}

/// JNI: Push accelerometer sample
/// Parameters: x, y, z (m/s²), timestamp (SensorEvent.timestamp, ns)
/// Returns: fall notice JSON (record + alert) when a fall is confirmed, else null
#[no_mangle]
pub extern "system" fn Java_com_evercare_FallDetectionBridge_pushAccelSample(
    mut env: JNIEnv,
    _class: JClass,
    x: jdouble,
    y: jdouble,
    z: jdouble,
    timestamp_nanos: jlong,
) -> jstring {
    let result = push_accel_sample_impl(x, y, z, timestamp_nanos);
    string_result(&mut env, result)
}

fn push_accel_sample_impl(x: f64, y: f64, z: f64, timestamp_nanos: i64) -> JResult<Option<String>> {
    let sample = sensor_receiver::accel_sample(x, y, z, timestamp_nanos)?;
    let notice = with_session(|session| session.push_accel_sample(sample))?;
    notice
        .map(|notice| {
            serde_json::to_string(&notice)
                .map_err(|e| BridgeError::Internal(format!("JSON serialization failed: {}", e)))
        })
        .transpose()
}

/// JNI: Get monitoring state as string
/// Returns: "IDLE" or "MONITORING"
#[no_mangle]
pub extern "system" fn Java_com_evercare_FallDetectionBridge_getMonitoringState(
    mut env: JNIEnv,
    _class: JClass,
) -> jstring {
    let result = with_session(|session| Ok(Some(state_name(session.state()).to_string())));
    string_result(&mut env, result)
}

fn state_name(state: MonitorState) -> &'static str {
    match state {
        MonitorState::Idle => "IDLE",
        MonitorState::Monitoring => "MONITORING",
    }
}

/// JNI: Number of falls confirmed in the current session
#[no_mangle]
pub extern "system" fn Java_com_evercare_FallDetectionBridge_getEventCount(
    mut env: JNIEnv,
    _class: JClass,
) -> jint {
    match with_session(|session| Ok(session.event_count())) {
        Ok(count) => count.min(i32::MAX as usize) as jint,
        Err(e) => {
            let _ = throw_java_exception(&mut env, &e);
            -1
        }
    }
}

/// JNI: Export session as JSON string
/// Returns: JSON string or null on error (throws Java exception)
#[no_mangle]
pub extern "system" fn Java_com_evercare_FallDetectionBridge_getSessionJson(
    mut env: JNIEnv,
    _class: JClass,
) -> jstring {
    let result = with_session(|session| {
        session
            .export()
            .to_json()
            .map(Some)
            .map_err(|e| BridgeError::Internal(format!("JSON serialization failed: {}", e)))
    });
    string_result(&mut env, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::exception_class;
    use fall_detector_rs::FallDetectorError;

    #[test]
    fn test_detector_config_from_raw_params() {
        let config = detector_config(2.0, 50, 0).unwrap();
        assert_eq!(config, DetectorConfig::background_service());

        let config = detector_config(7.5, 0, 5_000).unwrap();
        assert_eq!(config, DetectorConfig::foreground_service());

        assert!(matches!(
            detector_config(2.0, -5, 0),
            Err(BridgeError::InvalidParameters(_))
        ));
        assert!(matches!(
            detector_config(-2.0, 50, 0),
            Err(BridgeError::Core(FallDetectorError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_device_context_requires_user_id() {
        let context = device_context(Some("uid-3".to_string()), None).unwrap();
        assert_eq!(context.user_id, "uid-3");
        assert_eq!(context.device_model, "unknown");

        let missing = device_context(None, Some("Pixel 8".to_string())).unwrap_err();
        assert!(matches!(missing, BridgeError::InvalidParameters(_)));
        assert_eq!(exception_class(&missing), "java/lang/IllegalArgumentException");

        assert!(matches!(
            device_context(Some("  ".to_string()), None),
            Err(BridgeError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_state_names() {
        assert_eq!(state_name(MonitorState::Idle), "IDLE");
        assert_eq!(state_name(MonitorState::Monitoring), "MONITORING");
    }

    #[test]
    fn test_push_through_global_session() {
        with_session(|session| {
            if session.state() == MonitorState::Monitoring {
                session.stop()?;
            }
            session.start(DetectorConfig::default(), true)
        })
        .unwrap();

        let mut notices = Vec::new();
        for i in 0..8i64 {
            if let Some(json) = push_accel_sample_impl(0.0, 0.3, 0.0, i * 10_000_000).unwrap() {
                notices.push(json);
            }
        }
        assert_eq!(notices.len(), 1);
        let value: serde_json::Value = serde_json::from_str(&notices[0]).unwrap();
        assert_eq!(value["record"]["duration"], 50);
        assert_eq!(value["alert"]["channel_id"], "FREE_FALL_CHANNEL");

        assert!(push_accel_sample_impl(0.0, 0.0, 9.8, -1).is_err());
        with_session(|session| session.stop()).unwrap();
    }
}
