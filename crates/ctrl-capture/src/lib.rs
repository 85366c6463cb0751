//! ctrl-capture: Screen capture frame source for the Ctrl environment.
//!
//! # Pipeline
//!
//! ```text
//! ScreenGrabber::grab()          (scrap: XCB / DXGI / CoreGraphics)
//!        │  CapturedFrame, BGRA, full display resolution
//!        ▼
//! preprocess::to_rgb()           drop alpha, BGR → RGB, skip row padding
//!        │
//!        ▼
//! imageops::resize(Nearest)      → 256×144, no smoothing
//!        │
//!        ▼
//! Observation (144×256×3 u8) ──► cached for render() when enabled
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), ctrl_core::CaptureError> {
//! use ctrl_capture::{FrameSource, ScreenCapturer};
//! let capturer = ScreenCapturer::open(0)?;
//! let mut frames = FrameSource::new(capturer, false);
//! let obs = frames.capture().await?;
//! assert_eq!(obs.shape(), [144, 256, 3]);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use ctrl_core::{CaptureError, Observation};
use tracing::debug;

pub mod preprocess;
pub mod screen;

pub use screen::ScreenCapturer;

// ── Public types ──────────────────────────────────────────────────────────────

/// A raw frame straight from the platform capturer.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Pixel rows, each `stride` bytes long (4 bytes per pixel + padding).
    pub data:   Vec<u8>,
    pub width:  u32,
    pub height: u32,
    /// Bytes per row, `>= width * 4`.
    pub stride: usize,
    pub format: PixelFormat,
}

/// Channel order of a 4-byte captured pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Blue, Green, Red, Alpha. Every scrap backend produces this.
    Bgra,
    /// Red, Green, Blue, Alpha.
    Rgba,
}

// ── ScreenGrabber ─────────────────────────────────────────────────────────────

/// Source of raw display frames.
///
/// Platform capture handles are usually tied to the thread that created
/// them, so the returned futures are not required to be `Send`.
#[async_trait(?Send)]
pub trait ScreenGrabber {
    /// Grab the current display contents.
    async fn grab(&mut self) -> Result<CapturedFrame, CaptureError>;
}

// ── FrameSource ───────────────────────────────────────────────────────────────

/// Captures, converts, and downsamples frames into [`Observation`]s.
///
/// When `cache_frames` is set, the most recent observation is kept so a
/// render call can return it without grabbing the screen again.
pub struct FrameSource<G> {
    grabber:      G,
    cache_frames: bool,
    last:         Option<Observation>,
    captures:     u64,
}

impl<G: ScreenGrabber> FrameSource<G> {
    pub fn new(grabber: G, cache_frames: bool) -> Self {
        Self { grabber, cache_frames, last: None, captures: 0 }
    }

    /// Grab the screen and turn it into an observation.
    pub async fn capture(&mut self) -> Result<Observation, CaptureError> {
        let frame = self.grabber.grab().await?;
        let obs = preprocess::to_observation(&frame)?;
        self.captures += 1;
        debug!(
            "Captured frame #{} ({}x{} → {}x{})",
            self.captures,
            frame.width,
            frame.height,
            obs.shape()[1],
            obs.shape()[0]
        );
        if self.cache_frames {
            self.last = Some(obs.clone());
        }
        Ok(obs)
    }

    /// Most recent cached observation, `None` until the first capture or
    /// when caching is disabled.
    pub fn last(&self) -> Option<&Observation> {
        self.last.as_ref()
    }

    /// Number of successful captures so far.
    pub fn captures(&self) -> u64 {
        self.captures
    }

    pub fn grabber(&self) -> &G {
        &self.grabber
    }
}

#[cfg(test)]
mod tests {
    use ctrl_core::EnvSpec;

    use super::*;

    struct SolidGrabber {
        bgra: [u8; 4],
        grabs: usize,
    }

    #[async_trait(?Send)]
    impl ScreenGrabber for SolidGrabber {
        async fn grab(&mut self) -> Result<CapturedFrame, CaptureError> {
            self.grabs += 1;
            let (width, height) = (640u32, 360u32);
            Ok(CapturedFrame {
                data: self.bgra.repeat((width * height) as usize),
                width,
                height,
                stride: width as usize * 4,
                format: PixelFormat::Bgra,
            })
        }
    }

    #[tokio::test]
    async fn capture_produces_fixed_shape() {
        let mut frames = FrameSource::new(SolidGrabber { bgra: [10, 20, 30, 255], grabs: 0 }, false);
        let obs = frames.capture().await.unwrap();
        assert_eq!(obs.shape(), [144, 256, 3]);
        assert_eq!(obs.pixel(0, 0), [30, 20, 10]);
        assert_eq!(obs.pixel(143, 255), [30, 20, 10]);
        assert!(EnvSpec::default().observation_space.contains_observation(&obs));
        assert_eq!(frames.captures(), 1);
        assert!(frames.last().is_none());
    }

    #[tokio::test]
    async fn caching_keeps_latest_frame() {
        let mut frames = FrameSource::new(SolidGrabber { bgra: [0, 0, 255, 255], grabs: 0 }, true);
        assert!(frames.last().is_none());
        let obs = frames.capture().await.unwrap();
        assert_eq!(frames.last(), Some(&obs));
        assert_eq!(frames.grabber().grabs, 1);
    }

    #[tokio::test]
    async fn grab_errors_propagate() {
        struct Broken;

        #[async_trait(?Send)]
        impl ScreenGrabber for Broken {
            async fn grab(&mut self) -> Result<CapturedFrame, CaptureError> {
                Err(CaptureError::Io(std::io::Error::other("display gone")))
            }
        }

        let mut frames = FrameSource::new(Broken, true);
        assert!(matches!(frames.capture().await, Err(CaptureError::Io(_))));
        assert_eq!(frames.captures(), 0);
        assert!(frames.last().is_none());
    }
}
