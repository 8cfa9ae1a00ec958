use thiserror::Error;

/// Failure taxonomy for the check-in flow. Platform and network errors are
/// translated into one of these at the boundary that produced them; nothing
/// rawer reaches the session controller.
///
/// "Already attended" is deliberately absent: a duplicate submission is a
/// benign outcome, not an error (see `ConfirmOutcome`).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CheckinError {
    #[error("camera capture is not available on this device")]
    CaptureUnavailable,

    #[error("camera access denied: {0}")]
    CaptureDenied(String),

    #[error("camera error: {0}")]
    CaptureError(String),

    #[error("QR payload could not be interpreted")]
    PayloadMalformed,

    #[error("event lookup failed: {0}")]
    EventLookupFailed(String),

    #[error("attendance submission failed: {0}")]
    SubmissionFailed(String),

    #[error("no signed-in student")]
    NotAuthenticated,
}
