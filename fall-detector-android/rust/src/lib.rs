// Fall Detector Android JNI Library
// Exposes the Rust fall detection core to the Android foreground service via JNI

pub mod android_jni;
pub mod error;
pub mod logging;
pub mod sensor_receiver;
pub mod session;
pub mod storage;

pub use error::{BridgeError, JResult};
pub use session::{MonitoringSession, SessionMetadata};
pub use storage::SessionExport;
