//! Raw frame → observation conversion.

use ctrl_core::{CaptureError, Observation, OBS_HEIGHT, OBS_WIDTH};
use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::{CapturedFrame, PixelFormat};

const BYTES_PER_PIXEL: usize = 4;

/// Drop alpha, reorder to RGB, and nearest-neighbour resize to 144×256.
pub fn to_observation(frame: &CapturedFrame) -> Result<Observation, CaptureError> {
    let rgb = to_rgb(frame)?;
    let resized = if rgb.dimensions() == (OBS_WIDTH, OBS_HEIGHT) {
        rgb
    } else {
        // Nearest keeps hard edges and never invents colours.
        imageops::resize(&rgb, OBS_WIDTH, OBS_HEIGHT, FilterType::Nearest)
    };
    Observation::from_image(resized)
}

/// Packed RGB copy of `frame` at its native resolution.
pub fn to_rgb(frame: &CapturedFrame) -> Result<RgbImage, CaptureError> {
    let width = frame.width as usize;
    let height = frame.height as usize;
    if width == 0 || height == 0 {
        return Err(malformed(format!("empty frame {}x{}", frame.width, frame.height)));
    }
    let row_bytes = width * BYTES_PER_PIXEL;
    if frame.stride < row_bytes {
        return Err(malformed(format!(
            "stride {} shorter than {} pixels × {} bytes",
            frame.stride, width, BYTES_PER_PIXEL
        )));
    }
    if frame.data.len() < frame.stride * height {
        return Err(malformed(format!(
            "{} bytes for {} rows of stride {}",
            frame.data.len(),
            height,
            frame.stride
        )));
    }

    let (r, g, b) = match frame.format {
        PixelFormat::Bgra => (2, 1, 0),
        PixelFormat::Rgba => (0, 1, 2),
    };

    let mut out = Vec::with_capacity(width * height * 3);
    for row in frame.data.chunks_exact(frame.stride).take(height) {
        for px in row[..row_bytes].chunks_exact(BYTES_PER_PIXEL) {
            out.extend_from_slice(&[px[r], px[g], px[b]]);
        }
    }

    RgbImage::from_raw(frame.width, frame.height, out)
        .ok_or_else(|| malformed("RGB buffer does not match frame size".to_owned()))
}

fn malformed(reason: String) -> CaptureError {
    CaptureError::MalformedFrame { reason }
}
