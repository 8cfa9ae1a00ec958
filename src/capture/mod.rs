mod device;
mod session;

pub use device::{CaptureDevice, CaptureDeviceFactory, CaptureOpenError, FacingMode};
pub use session::CaptureSession;
