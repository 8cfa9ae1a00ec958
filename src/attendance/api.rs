use async_trait::async_trait;
use thiserror::Error;

use crate::models::{AttendanceRequest, EventSummary};

/// Backend failure as seen by the submitter. The uniqueness-constraint
/// violation gets its own variant because it is the one error shape that is
/// not an error to the user.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("attendance already recorded for this student and event")]
    DuplicateAttendance,

    #[error("backend returned status {code}")]
    Status { code: u16, message: Option<String> },

    #[error("request failed: {0}")]
    Transport(String),
}

impl ApiError {
    /// Server-provided message, when the response carried one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// The two backend operations this subsystem consumes. A trait so the flow
/// is exercisable against an in-memory backend in tests; production wires in
/// [`super::BackendClient`].
#[async_trait]
pub trait AttendanceApi: Send + Sync {
    /// `GET /api/events/{id}/`.
    async fn fetch_event(&self, event_id: &str) -> Result<EventSummary, ApiError>;

    /// `POST /api/attendance/`. Exactly one wire write per call.
    async fn submit_attendance(&self, request: &AttendanceRequest) -> Result<(), ApiError>;
}
