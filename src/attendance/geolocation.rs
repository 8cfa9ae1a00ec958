use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use chrono::Utc;
use log::warn;

use crate::models::LocationBlob;

/// A raw geolocation fix from the platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Reported accuracy radius in meters.
    pub accuracy: f64,
}

/// Platform seam for geolocation. High accuracy is requested; the call may
/// block for seconds waiting on a fix or a permission prompt, so it runs on
/// a blocking worker under a bounded wait.
pub trait LocationProvider: Send + Sync {
    fn current_fix(&self) -> anyhow::Result<GeoFix>;
}

/// Provider for hosts without geolocation capability. Every acquisition
/// degrades to "no location", which the submitter already tolerates.
pub struct NoLocationProvider;

impl LocationProvider for NoLocationProvider {
    fn current_fix(&self) -> anyhow::Result<GeoFix> {
        bail!("geolocation not available on this host")
    }
}

/// Try to obtain a location within `wait`. Denial, timeout, and provider
/// errors all degrade to `None`; the submission proceeds without location
/// data and the failure is never surfaced to the user.
pub(crate) async fn acquire_location(
    provider: Arc<dyn LocationProvider>,
    wait: Duration,
) -> Option<LocationBlob> {
    let fix_fut = tokio::task::spawn_blocking(move || provider.current_fix());

    match tokio::time::timeout(wait, fix_fut).await {
        Ok(Ok(Ok(fix))) => Some(LocationBlob {
            latitude: fix.latitude,
            longitude: fix.longitude,
            accuracy: fix.accuracy,
            timestamp: Utc::now(),
        }),
        Ok(Ok(Err(err))) => {
            warn!("geolocation unavailable, submitting without it: {err}");
            None
        }
        Ok(Err(err)) => {
            warn!("geolocation worker join failed: {err}");
            None
        }
        Err(_) => {
            warn!(
                "geolocation fix not obtained within {}s, submitting without it",
                wait.as_secs()
            );
            None
        }
    }
}
