mod api;
mod client;
mod fingerprint;
mod geolocation;
mod submitter;

pub use api::{ApiError, AttendanceApi};
pub use client::BackendClient;
pub use fingerprint::{compute_fingerprint, DeviceSignals, FingerprintStore};
pub use geolocation::{GeoFix, LocationProvider, NoLocationProvider};
pub use submitter::AttendanceSubmitter;
