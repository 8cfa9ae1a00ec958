use std::sync::Arc;
use std::time::Duration;

use log::info;

use super::api::{ApiError, AttendanceApi};
use super::fingerprint::{DeviceSignals, FingerprintStore};
use super::geolocation::{acquire_location, LocationProvider};
use crate::error::CheckinError;
use crate::models::{AttendanceRequest, ConfirmOutcome, EventSummary};

const GENERIC_SUBMIT_FAILURE: &str = "Failed to record attendance. Please try again.";

/// Resolves a scanned event to display data and submits a single attendance
/// record on user consent, enriched with whichever of geolocation and device
/// fingerprint could be obtained.
pub struct AttendanceSubmitter {
    api: Arc<dyn AttendanceApi>,
    location: Arc<dyn LocationProvider>,
    fingerprints: Arc<FingerprintStore>,
    signals: Option<DeviceSignals>,
    geolocation_timeout: Duration,
}

impl AttendanceSubmitter {
    pub fn new(
        api: Arc<dyn AttendanceApi>,
        location: Arc<dyn LocationProvider>,
        fingerprints: Arc<FingerprintStore>,
        signals: Option<DeviceSignals>,
        geolocation_timeout: Duration,
    ) -> Self {
        Self {
            api,
            location,
            fingerprints,
            signals,
            geolocation_timeout,
        }
    }

    pub async fn fetch_event_summary(&self, event_id: &str) -> Result<EventSummary, CheckinError> {
        self.api
            .fetch_event(event_id)
            .await
            .map_err(|err| CheckinError::EventLookupFailed(err.to_string()))
    }

    /// One submission attempt for a confirmed decode. Geolocation failure
    /// degrades silently; the duplicate-record response is the benign
    /// `AlreadyAttended` outcome. Never retries.
    pub async fn confirm_attendance(
        &self,
        student_id: &str,
        event_id: &str,
    ) -> Result<ConfirmOutcome, CheckinError> {
        let location =
            acquire_location(Arc::clone(&self.location), self.geolocation_timeout).await;
        let device_id = self.fingerprints.device_id(self.signals.as_ref());

        let request = AttendanceRequest {
            student: student_id.to_string(),
            event: event_id.to_string(),
            location,
            device_id,
        };

        match self.api.submit_attendance(&request).await {
            Ok(()) => {
                info!("attendance recorded for event {event_id}");
                Ok(ConfirmOutcome::Confirmed)
            }
            Err(ApiError::DuplicateAttendance) => {
                info!("attendance already recorded for event {event_id}");
                Ok(ConfirmOutcome::AlreadyAttended)
            }
            Err(err) => {
                let message = err
                    .server_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| GENERIC_SUBMIT_FAILURE.to_string());
                Err(CheckinError::SubmissionFailed(message))
            }
        }
    }
}
