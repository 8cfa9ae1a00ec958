//! QR attendance check-in engine for TrueAttend.
//!
//! Students check in to events by scanning a QR code: this crate owns the
//! camera lifecycle, the periodic decode loop, payload interpretation,
//! geolocation and device-fingerprint enrichment, and the single idempotent
//! attendance submission, orchestrated by [`CheckinController`]'s state
//! machine. The hosting UI supplies the platform seams (camera, geolocation,
//! session identity) and renders the controller's state snapshots; the
//! attendance backend is reached over HTTP via [`BackendClient`].

mod attendance;
mod auth;
mod capture;
mod config;
mod error;
mod models;
mod scan;
mod session;
mod utils;

pub use attendance::{
    compute_fingerprint, ApiError, AttendanceApi, AttendanceSubmitter, BackendClient,
    DeviceSignals, FingerprintStore, GeoFix, LocationProvider, NoLocationProvider,
};
pub use auth::{AuthContext, StaticAuth};
pub use capture::{CaptureDevice, CaptureDeviceFactory, CaptureOpenError, FacingMode};
pub use config::CheckinConfig;
pub use error::CheckinError;
pub use models::{AttendanceRequest, ConfirmOutcome, EventSummary, LocationBlob, ScanFrame};
pub use scan::{decode_frame, interpret_payload};
pub use session::{CheckinController, CheckinPhase, CheckinSnapshot, TerminalOutcome};
