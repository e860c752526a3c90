use crate::error::{FallDetectorError, Result};
use crate::location::LocationFix;
use crate::types::FallEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

const TIMESTAMP_STRING_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static DOC_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Who and what produced the samples
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceContext {
    pub user_id: String,
    pub device_model: String,
}

impl Default for DeviceContext {
    fn default() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            device_model: "unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationBlock {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
    pub provider: String,
    pub timestamp: i64,
}

impl From<LocationFix> for LocationBlock {
    fn from(fix: LocationFix) -> Self {
        LocationBlock {
            latitude: fix.latitude,
            longitude: fix.longitude,
            accuracy: fix.accuracy,
            provider: fix.provider,
            timestamp: fix.timestamp_ms,
        }
    }
}

/// Persisted form of a fall, one document per event in the user's collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallRecord {
    pub doc_id: String,
    /// Wall clock, ms since the Unix epoch
    pub timestamp: i64,
    /// m/s²
    pub acceleration: f64,
    /// ms spent below threshold
    pub duration: u64,
    pub device_model: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationBlock>,
    pub timestamp_string: String,
}

impl FallRecord {
    pub fn new(
        event: &FallEvent,
        context: &DeviceContext,
        location: Option<LocationFix>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        FallRecord {
            doc_id: generate_document_id(recorded_at),
            timestamp: recorded_at.timestamp_millis(),
            acceleration: event.acceleration_at_detection,
            duration: event.duration_below_threshold.as_millis() as u64,
            device_model: context.device_model.clone(),
            user_id: context.user_id.clone(),
            location: location.map(LocationBlock::from),
            timestamp_string: recorded_at.format(TIMESTAMP_STRING_FORMAT).to_string(),
        }
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// `fall_<wall ms>_<seq>`, unique within the process
pub fn generate_document_id(recorded_at: DateTime<Utc>) -> String {
    let seq = DOC_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("fall_{}_{:04}", recorded_at.timestamp_millis(), seq)
}

/// Persistence collaborator for fall records
pub trait EventStore {
    fn write(&mut self, user_id: &str, doc_id: &str, record: &FallRecord) -> Result<()>;
}

/// Stores each record as `<root>/users/<user_id>/falls/<doc_id>.json`.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn collection_dir(&self, user_id: &str) -> PathBuf {
        self.root.join("users").join(user_id).join("falls")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn check_path_segment(kind: &str, segment: &str) -> Result<()> {
    let bad = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\']);
    if bad {
        return Err(FallDetectorError::StorageError(format!(
            "invalid {} {:?}",
            kind, segment
        )));
    }
    Ok(())
}

impl EventStore for JsonDirStore {
    fn write(&mut self, user_id: &str, doc_id: &str, record: &FallRecord) -> Result<()> {
        check_path_segment("user id", user_id)?;
        check_path_segment("document id", doc_id)?;

        let dir = self.collection_dir(user_id);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.json", doc_id));
        fs::write(&path, record.to_json()?)?;
        log::info!("Saved fall record to {}", path.display());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub user_id: String,
    pub doc_id: String,
    pub record: FallRecord,
}

/// Keeps documents in memory, mostly for tests and the JNI session export.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub documents: Vec<StoredDocument>,
}

impl EventStore for MemoryStore {
    fn write(&mut self, user_id: &str, doc_id: &str, record: &FallRecord) -> Result<()> {
        self.documents.push(StoredDocument {
            user_id: user_id.to_string(),
            doc_id: doc_id.to_string(),
            record: record.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;
    use chrono::TimeZone;
    use std::time::Duration;

    fn event() -> FallEvent {
        FallEvent {
            acceleration_at_detection: 0.75,
            duration_below_threshold: Duration::from_millis(120),
            detected_at: Timestamp::from_millis(42),
        }
    }

    fn context() -> DeviceContext {
        DeviceContext {
            user_id: "user-7".to_string(),
            device_model: "Pixel 7".to_string(),
        }
    }

    fn recorded_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap()
    }

    #[test]
    fn test_record_fields() {
        let record = FallRecord::new(&event(), &context(), None, recorded_at());
        assert_eq!(record.timestamp, 1_741_944_413_000);
        assert_eq!(record.duration, 120);
        assert_eq!(record.acceleration, 0.75);
        assert_eq!(record.user_id, "user-7");
        assert_eq!(record.device_model, "Pixel 7");
        assert_eq!(record.timestamp_string, "2025-03-14 09:26:53");
        assert!(record.doc_id.starts_with("fall_1741944413000_"));
    }

    #[test]
    fn test_record_json_shape() {
        let record = FallRecord::new(&event(), &context(), None, recorded_at());
        let json: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(json["deviceModel"], "Pixel 7");
        assert_eq!(json["userId"], "user-7");
        assert_eq!(json["timestampString"], "2025-03-14 09:26:53");
        assert!(json.get("location").is_none());

        let fix = LocationFix {
            latitude: 51.5,
            longitude: -0.12,
            accuracy: 8.0,
            provider: "gps".to_string(),
            timestamp_ms: 1_741_944_400_000,
        };
        let record = FallRecord::new(&event(), &context(), Some(fix), recorded_at());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["location"]["provider"], "gps");
        assert_eq!(json["location"]["timestamp"], 1_741_944_400_000i64);
    }

    #[test]
    fn test_document_ids_unique() {
        let a = generate_document_id(recorded_at());
        let b = generate_document_id(recorded_at());
        assert_ne!(a, b);
    }

    #[test]
    fn test_json_dir_store_layout() {
        let root = std::env::temp_dir().join(format!(
            "fall_detector_store_{}_{}",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let mut store = JsonDirStore::new(&root);
        let record = FallRecord::new(&event(), &context(), None, recorded_at());

        store.write(&record.user_id, &record.doc_id, &record).unwrap();

        let path = store
            .collection_dir("user-7")
            .join(format!("{}.json", record.doc_id));
        let loaded: FallRecord = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(loaded, record);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_json_dir_store_rejects_traversal() {
        let mut store = JsonDirStore::new(std::env::temp_dir());
        let record = FallRecord::new(&event(), &context(), None, recorded_at());
        for user in ["", "..", "a/b"] {
            assert!(matches!(
                store.write(user, "doc", &record),
                Err(FallDetectorError::StorageError(_))
            ));
        }
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::default();
        let record = FallRecord::new(&event(), &context(), None, recorded_at());
        store.write("user-7", &record.doc_id, &record).unwrap();
        assert_eq!(store.documents.len(), 1);
        assert_eq!(store.documents[0].record, record);
    }
}
