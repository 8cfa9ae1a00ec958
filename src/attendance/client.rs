use async_trait::async_trait;
use log::warn;
use serde_json::{json, Value};

use super::api::{ApiError, AttendanceApi};
use crate::models::{AttendanceRequest, EventSummary};

/// The Django REST backend speaks a uniqueness violation as a 400 whose
/// `non_field_errors` names the (student, event) unique set.
const UNIQUE_SET_MARKER: &str = "unique set";

/// HTTP client for the attendance backend.
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn from_config(config: &crate::config::CheckinConfig) -> Self {
        Self::new(config.base_url.clone())
    }
}

#[async_trait]
impl AttendanceApi for BackendClient {
    async fn fetch_event(&self, event_id: &str) -> Result<EventSummary, ApiError> {
        let url = format!("{}/api/events/{}/", self.base_url, event_id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("event lookup for {event_id} returned {status}");
            return Err(ApiError::Status {
                code: status.as_u16(),
                message: extract_message(&body),
            });
        }

        response
            .json()
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))
    }

    async fn submit_attendance(&self, request: &AttendanceRequest) -> Result<(), ApiError> {
        let url = format!("{}/api/attendance/", self.base_url);

        // The backend stores the location blob as an opaque string.
        let location = match &request.location {
            Some(blob) => Some(
                serde_json::to_string(blob)
                    .map_err(|err| ApiError::Transport(err.to_string()))?,
            ),
            None => None,
        };

        let body = json!({
            "student": request.student,
            "event": request.event,
            "location": location,
            "device_id": request.device_id,
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        Err(classify_submit_error(status.as_u16(), &text))
    }
}

/// Map a non-success submission response onto [`ApiError`], picking the
/// uniqueness violation out of the 400 body.
fn classify_submit_error(status: u16, body: &str) -> ApiError {
    if status == 400 {
        if let Ok(parsed) = serde_json::from_str::<Value>(body) {
            let is_duplicate = parsed["non_field_errors"]
                .as_array()
                .is_some_and(|errors| {
                    errors
                        .iter()
                        .filter_map(Value::as_str)
                        .any(|msg| msg.contains(UNIQUE_SET_MARKER))
                });
            if is_duplicate {
                return ApiError::DuplicateAttendance;
            }
        }
    }

    ApiError::Status {
        code: status,
        message: extract_message(body),
    }
}

/// Best-effort human-readable message from an error body. DRF uses
/// `detail`; some endpoints use `message` or `non_field_errors`.
fn extract_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;

    if let Some(detail) = parsed["detail"].as_str() {
        return Some(detail.to_string());
    }
    if let Some(message) = parsed["message"].as_str() {
        return Some(message.to_string());
    }
    parsed["non_field_errors"]
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .next()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_set_violation_is_duplicate() {
        let body = r#"{"non_field_errors":["The fields student, event must make a unique set."]}"#;
        assert!(matches!(
            classify_submit_error(400, body),
            ApiError::DuplicateAttendance
        ));
    }

    #[test]
    fn other_400_keeps_status_and_message() {
        let body = r#"{"detail":"Check-in window has closed."}"#;
        match classify_submit_error(400, body) {
            ApiError::Status { code, message } => {
                assert_eq!(code, 400);
                assert_eq!(message.as_deref(), Some("Check-in window has closed."));
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn unique_set_body_on_500_is_not_duplicate() {
        let body = r#"{"non_field_errors":["The fields student, event must make a unique set."]}"#;
        assert!(matches!(
            classify_submit_error(500, body),
            ApiError::Status { code: 500, .. }
        ));
    }

    #[test]
    fn unparseable_body_yields_no_message() {
        match classify_submit_error(502, "<html>bad gateway</html>") {
            ApiError::Status { code, message } => {
                assert_eq!(code, 502);
                assert_eq!(message, None);
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn non_field_errors_double_as_message() {
        let body = r#"{"non_field_errors":["Event has not started yet."]}"#;
        assert_eq!(
            extract_message(body).as_deref(),
            Some("Event has not started yet.")
        );
    }
}
