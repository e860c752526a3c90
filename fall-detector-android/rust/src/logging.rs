use std::sync::Once;

static INIT: Once = Once::new();

#[cfg_attr(not(target_os = "android"), allow(dead_code))]
const LOG_TAG: &str = "FallDetector";

/// Route `log` output to logcat. Safe to call from every JNI entry point.
pub fn init() {
    INIT.call_once(install);
}

#[cfg(target_os = "android")]
fn install() {
    if android_log::init(LOG_TAG).is_err() {
        eprintln!("[{}] logger already installed", LOG_TAG);
    }
}

#[cfg(not(target_os = "android"))]
fn install() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
        assert!(INIT.is_completed());
    }
}
