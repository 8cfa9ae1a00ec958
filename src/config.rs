use std::time::Duration;

/// Tunables for the check-in subsystem. Defaults mirror the behavior of the
/// production web client: half-second decode sampling, a five second bound on
/// geolocation, and a short terminal-state display before resetting so the
/// student can scan again.
#[derive(Debug, Clone)]
pub struct CheckinConfig {
    /// Base URL of the attendance backend, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Period between decode attempts while scanning.
    pub sample_period: Duration,
    /// Upper bound on a single capture-and-decode tick before it is dropped.
    pub sample_timeout: Duration,
    /// How long to wait for a geolocation fix before submitting without one.
    pub geolocation_timeout: Duration,
    /// Delay before `Confirmed` / `AlreadyAttended` resets back to idle.
    pub auto_reset_delay: Duration,
    /// Viewport width of the hosting surface, in CSS pixels.
    pub viewport_width: u32,
    /// Widths at or below this are treated as handheld (back camera).
    pub handheld_max_width: u32,
    /// True when the flow is embedded in the dashboard rather than the
    /// standalone scanner route. Presentation-only.
    pub embedded: bool,
    /// Sign-in route students are redirected to when unauthenticated.
    pub sign_in_path: String,
    /// Route of the scanner screen, used as the post-sign-in return target.
    pub scan_path: String,
}

impl Default for CheckinConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            sample_period: Duration::from_millis(500),
            sample_timeout: Duration::from_secs(10),
            geolocation_timeout: Duration::from_secs(5),
            auto_reset_delay: Duration::from_millis(2500),
            viewport_width: 1280,
            handheld_max_width: 768,
            embedded: false,
            sign_in_path: "/student/signin".into(),
            scan_path: "/scan".into(),
        }
    }
}
