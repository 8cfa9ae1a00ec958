use image::{DynamicImage, RgbaImage};
use log::warn;

use crate::models::ScanFrame;

/// Attempt exactly one QR decode against a frame. `None` is the
/// overwhelmingly common case (no code in view) and is not an error; the
/// sampler just waits for the next tick.
pub fn decode_frame(frame: ScanFrame) -> Option<String> {
    if !frame.has_pixels() {
        return None;
    }

    let ScanFrame {
        width,
        height,
        data,
        ..
    } = frame;

    let Some(rgba) = RgbaImage::from_raw(width, height, data) else {
        warn!("frame buffer does not match {width}x{height} RGBA dimensions, dropping");
        return None;
    };

    let luma = DynamicImage::ImageRgba8(rgba).to_luma8();
    let mut prepared = rqrr::PreparedImage::prepare(luma);

    for grid in prepared.detect_grids() {
        match grid.decode() {
            Ok((_meta, content)) if !content.is_empty() => return Some(content),
            Ok(_) => {}
            // Partial or corrupted grid in frame; the next sample usually
            // resolves it.
            Err(_) => {}
        }
    }

    None
}
