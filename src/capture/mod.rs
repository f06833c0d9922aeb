mod v4l_capture;

pub use v4l_capture::{NokhwaProvider, WebcamCapture};

use crate::error::{BoothError, BoothResult};
use crate::render::fit_to_canvas;
use image::RgbImage;
use std::fmt;
use std::str::FromStr;

/// Which physical camera is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    #[default]
    Front,
    Back,
}

impl FacingMode {
    pub fn toggled(self) -> Self {
        match self {
            FacingMode::Front => FacingMode::Back,
            FacingMode::Back => FacingMode::Front,
        }
    }
}

impl fmt::Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacingMode::Front => f.write_str("front"),
            FacingMode::Back => f.write_str("back"),
        }
    }
}

impl FromStr for FacingMode {
    type Err = BoothError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "front" | "user" => Ok(FacingMode::Front),
            "back" | "environment" => Ok(FacingMode::Back),
            other => Err(BoothError::Other(anyhow::anyhow!(
                "unknown facing mode '{other}' (expected front or back)"
            ))),
        }
    }
}

/// Trait for camera capture sources
pub trait CaptureSource {
    /// Capture a single frame
    fn capture_frame(&mut self) -> BoothResult<RgbImage>;

    /// Get the resolution of captured frames
    fn resolution(&self) -> (u32, u32);

    /// Stop the stream and hand the device back
    fn release(&mut self) {}
}

/// Opens camera streams for a facing mode
pub trait CameraProvider {
    fn acquire(&mut self, facing: FacingMode) -> BoothResult<Box<dyn CaptureSource>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraState {
    Idle,
    Acquiring(FacingMode),
    Live(FacingMode),
}

/// Owns at most one live camera stream and delivers canvas-sized frames
pub struct CameraSession<P: CameraProvider> {
    provider: P,
    state: CameraState,
    source: Option<Box<dyn CaptureSource>>,
    facing: FacingMode,
    width: u32,
    height: u32,
}

impl<P: CameraProvider> CameraSession<P> {
    pub fn new(provider: P, width: u32, height: u32) -> Self {
        Self {
            provider,
            state: CameraState::Idle,
            source: None,
            facing: FacingMode::default(),
            width,
            height,
        }
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        matches!(self.state, CameraState::Live(_))
    }

    /// Facing mode of the live stream, or of the last one that went live
    pub fn facing(&self) -> FacingMode {
        self.facing
    }

    /// Acquire a stream for `facing`. Any live stream is released first.
    pub fn start(&mut self, facing: FacingMode) -> BoothResult<()> {
        self.release();

        self.state = CameraState::Acquiring(facing);
        tracing::info!("Acquiring {} camera", facing);

        match self.provider.acquire(facing) {
            Ok(source) => {
                let (w, h) = source.resolution();
                tracing::info!("{} camera live at {}x{}", facing, w, h);
                self.source = Some(source);
                self.facing = facing;
                self.state = CameraState::Live(facing);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to acquire {} camera: {}", facing, e);
                self.state = CameraState::Idle;
                Err(e)
            }
        }
    }

    /// Swap between front and back cameras. After a failed switch the
    /// facing still points at the last live camera, so calling this again
    /// retries the same target.
    pub fn switch_facing(&mut self) -> BoothResult<FacingMode> {
        let next = self.facing.toggled();
        self.start(next)?;
        Ok(next)
    }

    pub fn release(&mut self) {
        if let Some(mut source) = self.source.take() {
            tracing::info!("Releasing {} camera", self.facing);
            source.release();
        }
        self.state = CameraState::Idle;
    }

    /// Current live frame at the canvas resolution
    pub fn capture_frame(&mut self) -> BoothResult<RgbImage> {
        let source = self
            .source
            .as_mut()
            .ok_or_else(|| BoothError::camera_unavailable("camera is not running"))?;
        let frame = source.capture_frame()?;
        Ok(fit_to_canvas(frame, self.width, self.height))
    }
}

impl<P: CameraProvider> Drop for CameraSession<P> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Counts open streams so tests can check that only one is ever live
    #[derive(Default, Clone)]
    pub struct StreamCounter {
        pub live: Rc<Cell<usize>>,
        pub peak: Rc<Cell<usize>>,
        pub opened: Rc<Cell<usize>>,
    }

    pub struct MockSource {
        counter: StreamCounter,
        color: [u8; 3],
        size: (u32, u32),
        frames_left: Option<usize>,
        released: bool,
    }

    impl CaptureSource for MockSource {
        fn capture_frame(&mut self) -> BoothResult<RgbImage> {
            if let Some(left) = self.frames_left.as_mut() {
                if *left == 0 {
                    return Err(BoothError::camera_unavailable("stream ended"));
                }
                *left -= 1;
            }
            let (w, h) = self.size;
            Ok(RgbImage::from_pixel(w, h, image::Rgb(self.color)))
        }

        fn resolution(&self) -> (u32, u32) {
            self.size
        }

        fn release(&mut self) {
            if !self.released {
                self.released = true;
                self.counter.live.set(self.counter.live.get() - 1);
            }
        }
    }

    impl Drop for MockSource {
        fn drop(&mut self) {
            self.release();
        }
    }

    #[derive(Default)]
    pub struct MockProvider {
        pub counter: StreamCounter,
        pub deny: bool,
        /// Refuse the next request for this facing, then behave normally
        pub deny_once: Option<FacingMode>,
        pub frame_size: Option<(u32, u32)>,
        /// Frames each stream delivers before failing
        pub frame_budget: Option<usize>,
        pub color: [u8; 3],
    }

    impl MockProvider {
        pub fn with_color(color: [u8; 3]) -> Self {
            Self {
                color,
                ..Self::default()
            }
        }
    }

    impl CameraProvider for MockProvider {
        fn acquire(&mut self, facing: FacingMode) -> BoothResult<Box<dyn CaptureSource>> {
            if self.deny {
                return Err(BoothError::camera_unavailable("permission denied"));
            }
            if self.deny_once == Some(facing) {
                self.deny_once = None;
                return Err(BoothError::camera_unavailable("device busy"));
            }
            let live = self.counter.live.get() + 1;
            self.counter.live.set(live);
            self.counter.peak.set(self.counter.peak.get().max(live));
            self.counter.opened.set(self.counter.opened.get() + 1);

            let size = self.frame_size.unwrap_or(match facing {
                FacingMode::Front => (32, 24),
                FacingMode::Back => (64, 48),
            });
            Ok(Box::new(MockSource {
                counter: self.counter.clone(),
                color: self.color,
                size,
                frames_left: self.frame_budget,
                released: false,
            }))
        }
    }
}
