use chrono::{DateTime, Utc};

/// One RGBA sample pulled from the camera. Ephemeral: built for a single
/// decode attempt and discarded, whatever the outcome.
#[derive(Debug, Clone)]
pub struct ScanFrame {
    pub width: u32,
    pub height: u32,
    /// Raw RGBA pixel buffer, `width * height * 4` bytes.
    pub data: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

impl ScanFrame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
            captured_at: Utc::now(),
        }
    }

    /// A frame with zero intrinsic dimensions is an unready sample, skipped
    /// silently by the sampler.
    pub fn has_pixels(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}
