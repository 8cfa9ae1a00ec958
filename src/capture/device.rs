use thiserror::Error;

use crate::models::ScanFrame;

/// Which camera to request. Picked by a coarse viewport-width check, not
/// device detection: handheld-sized viewports get the back camera so the
/// student can point the phone at a poster, everything else the front one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    /// Front-facing camera.
    User,
    /// Back-facing camera.
    Environment,
}

impl FacingMode {
    pub fn for_viewport(viewport_width: u32, handheld_max_width: u32) -> Self {
        if viewport_width <= handheld_max_width {
            FacingMode::Environment
        } else {
            FacingMode::User
        }
    }
}

/// Why camera acquisition failed. Mapped onto the public error taxonomy by
/// the controller.
#[derive(Debug, Clone, Error)]
pub enum CaptureOpenError {
    #[error("no camera capture capability on this platform")]
    Unavailable,
    #[error("camera permission denied: {0}")]
    Denied(String),
    #[error("camera acquisition failed: {0}")]
    Hardware(String),
}

/// Platform seam for the camera. The host supplies the actual binding
/// (browser media stream, platform capture API, test double); this crate
/// only drives the lifecycle.
///
/// `poll_frame` is called from a blocking worker, so it may do real pixel
/// work, but it must return promptly: `Ok(None)` when no frame has buffered
/// yet rather than waiting for one. Implementations must tolerate a stray
/// `poll_frame` after `release` (return `Ok(None)` or an error; either is
/// handled).
pub trait CaptureDevice: Send + Sync {
    /// Latest available frame, or `None` if the device has not buffered
    /// enough data yet.
    fn poll_frame(&self) -> anyhow::Result<Option<ScanFrame>>;

    /// Stop every underlying media track and drop the hardware lock.
    /// Idempotent.
    fn release(&self);
}

/// Opens capture devices. Called through `spawn_blocking`: acquisition may
/// block on a permission prompt.
pub trait CaptureDeviceFactory: Send + Sync {
    fn open(&self, facing: FacingMode) -> Result<Box<dyn CaptureDevice>, CaptureOpenError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handheld_viewport_prefers_back_camera() {
        assert_eq!(FacingMode::for_viewport(390, 768), FacingMode::Environment);
        assert_eq!(FacingMode::for_viewport(768, 768), FacingMode::Environment);
    }

    #[test]
    fn desktop_viewport_prefers_front_camera() {
        assert_eq!(FacingMode::for_viewport(1280, 768), FacingMode::User);
    }
}
