use crate::session::SessionMetadata;
use fall_detector_rs::{DetectorConfig, DeviceContext, FallRecord};
use serde::{Deserialize, Serialize};

/// Complete session export (JSON-serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionExport {
    pub metadata: SessionMetadata,
    pub config: Option<DetectorConfig>,
    pub context: DeviceContext,
    pub records: Vec<FallRecord>,
}

impl SessionExport {
    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Records grouped the way the app persists them: `users/<uid>/falls/<docId>`
    pub fn document_paths(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| format!("users/{}/falls/{}", r.user_id, r.doc_id))
            .collect()
    }
}
