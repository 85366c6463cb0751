//! Display capture through `scrap`.
//!
//! The capture handle is owned by [`ScreenCapturer`] and released when it is
//! dropped; there is no process-wide capture state.

use std::io::ErrorKind;
use std::time::Duration;

use async_trait::async_trait;
use ctrl_core::CaptureError;
use scrap::{Capturer, Display};
use tracing::{debug, info};

use crate::{CapturedFrame, PixelFormat, ScreenGrabber};

/// Pause between polls while the platform has no new frame yet (DXGI
/// reports `WouldBlock` when the desktop has not changed).
const FRAME_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Screen capturer for one display.
pub struct ScreenCapturer {
    monitor:  usize,
    capturer: Capturer,
    width:    u32,
    height:   u32,
}

impl ScreenCapturer {
    /// Open a capture session on `monitor`.
    ///
    /// `0` selects the primary display; `n >= 1` selects the n-th display in
    /// platform enumeration order. On multi-monitor setups `0` is therefore a
    /// single screen, never the combined area of all monitors.
    pub fn open(monitor: usize) -> Result<Self, CaptureError> {
        let display = select_display(monitor)?;
        let width = display.width() as u32;
        let height = display.height() as u32;
        let capturer = Capturer::new(display)?;
        info!("Display[{}] capture opened ({}x{})", monitor, width, height);
        Ok(Self { monitor, capturer, width, height })
    }
}

fn select_display(monitor: usize) -> Result<Display, CaptureError> {
    if monitor == 0 {
        return Ok(Display::primary()?);
    }
    let displays = Display::all()?;
    let available = displays.len();
    displays
        .into_iter()
        .nth(monitor - 1)
        .ok_or(CaptureError::DisplayNotFound { index: monitor, available })
}

#[async_trait(?Send)]
impl ScreenGrabber for ScreenCapturer {
    async fn grab(&mut self) -> Result<CapturedFrame, CaptureError> {
        loop {
            match self.capturer.frame() {
                Ok(frame) => {
                    let data = frame.to_vec();
                    let stride = data.len() / self.height.max(1) as usize;
                    return Ok(CapturedFrame {
                        data,
                        width: self.width,
                        height: self.height,
                        stride,
                        format: PixelFormat::Bgra,
                    });
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    tokio::time::sleep(FRAME_POLL_INTERVAL).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Drop for ScreenCapturer {
    fn drop(&mut self) {
        debug!("Display[{}] capture released", self.monitor);
    }
}
