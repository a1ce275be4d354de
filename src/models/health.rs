use serde::{Deserialize, Serialize};

use super::enums::HealthState;

/// Advisory connectivity status. Never blocks any other flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: HealthState,
    /// Milliseconds since the Unix epoch; 0 until the first check.
    pub last_check: i64,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            status: HealthState::Offline,
            last_check: 0,
        }
    }
}

/// Body of `GET /health`. Only `status` is interpreted.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl HealthReport {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
