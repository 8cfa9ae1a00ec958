use std::sync::Arc;

use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::device::{CaptureDevice, FacingMode};

/// One camera-acquisition lifetime. Owns the exclusive device handle plus
/// the cancellation token of the sampler task bound to it; both are torn
/// down in the same `stop` so the hardware lock and the polling loop can
/// never outlive each other.
pub struct CaptureSession {
    id: String,
    facing: FacingMode,
    device: Arc<dyn CaptureDevice>,
    cancel: CancellationToken,
    sampler: Option<JoinHandle<()>>,
    released: bool,
}

impl CaptureSession {
    pub fn new(device: Arc<dyn CaptureDevice>, facing: FacingMode) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            facing,
            device,
            cancel: CancellationToken::new(),
            sampler: None,
            released: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn facing(&self) -> FacingMode {
        self.facing
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Attach the sampler task driving this session's decode loop.
    pub fn set_sampler(&mut self, handle: JoinHandle<()>) {
        self.sampler = Some(handle);
    }

    /// Halt the sampler and release the camera. Idempotent and safe from any
    /// cleanup path, including `Drop`.
    pub fn stop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        self.cancel.cancel();
        if let Some(handle) = self.sampler.take() {
            handle.abort();
        }
        self.device.release();
        info!("capture session {} released", self.id);
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}
