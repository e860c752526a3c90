use serde::{Deserialize, Serialize};

/// Last-known position supplied by the host's location service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius in meters
    pub accuracy: f64,
    pub provider: String,
    /// Wall-clock time of the fix, ms since the Unix epoch
    pub timestamp_ms: i64,
}

pub trait LocationProvider {
    fn last_known(&self) -> Option<LocationFix>;
}

impl<F> LocationProvider for F
where
    F: Fn() -> Option<LocationFix>,
{
    fn last_known(&self) -> Option<LocationFix> {
        self()
    }
}
