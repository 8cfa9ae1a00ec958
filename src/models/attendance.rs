use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geolocation fix attached to a submission when one could be obtained
/// within the bounded wait. Sent to the backend as a JSON-encoded blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationBlob {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

/// One attendance submission. Built once per confirmed check-in; the
/// optional fields are explicit so the wire contract is visible in the type
/// rather than assembled ad hoc.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRequest {
    pub student: String,
    pub event: String,
    pub location: Option<LocationBlob>,
    pub device_id: Option<String>,
}

/// Outcome of a submission. The backend enforces uniqueness over
/// (student, event); tripping that constraint is the `AlreadyAttended`
/// outcome, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed,
    AlreadyAttended,
}
