use serde::{Deserialize, Serialize};

/// Display data for a scanned event, fetched from the backend and rendered
/// in the confirmation step. Owned by the backend; this subsystem only reads
/// it. The date stays a string because it is display-only and the backend's
/// datetime formatting is not ours to second-guess.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub checkin_before_minutes: Option<i64>,
    #[serde(default)]
    pub checkin_after_minutes: Option<i64>,
}
