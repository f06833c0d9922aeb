use super::{CameraProvider, CaptureSource, FacingMode};
use crate::error::{BoothError, BoothResult};
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;

pub struct WebcamCapture {
    camera: Camera,
    width: u32,
    height: u32,
}

impl WebcamCapture {
    pub fn new(device_index: u32) -> BoothResult<Self> {
        tracing::info!("Initializing webcam {}", device_index);

        let index = CameraIndex::Index(device_index);
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);

        let mut camera = Camera::new(index, requested).map_err(|e| {
            BoothError::camera_unavailable(format!("failed to open camera {device_index}: {e}"))
        })?;

        camera.open_stream().map_err(|e| {
            BoothError::camera_unavailable(format!(
                "failed to open stream on camera {device_index}: {e}"
            ))
        })?;

        let resolution = camera.resolution();
        tracing::info!(
            "Webcam initialized at {}x{}",
            resolution.width(),
            resolution.height()
        );

        Ok(Self {
            camera,
            width: resolution.width(),
            height: resolution.height(),
        })
    }
}

impl CaptureSource for WebcamCapture {
    fn capture_frame(&mut self) -> BoothResult<RgbImage> {
        let frame = self
            .camera
            .frame()
            .map_err(|e| BoothError::camera_unavailable(format!("failed to capture frame: {e}")))?;

        let decoded = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| BoothError::camera_unavailable(format!("failed to decode frame: {e}")))?;

        Ok(decoded)
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn release(&mut self) {
        if self.camera.is_stream_open() {
            if let Err(e) = self.camera.stop_stream() {
                tracing::warn!("Failed to stop camera stream: {}", e);
            }
        }
    }
}

impl Drop for WebcamCapture {
    fn drop(&mut self) {
        self.release();
    }
}

/// Maps facing modes onto webcam device indices
pub struct NokhwaProvider {
    front_index: u32,
    back_index: u32,
}

impl NokhwaProvider {
    pub fn new(front_index: u32, back_index: u32) -> Self {
        Self {
            front_index,
            back_index,
        }
    }

    pub fn device_for(&self, facing: FacingMode) -> u32 {
        match facing {
            FacingMode::Front => self.front_index,
            FacingMode::Back => self.back_index,
        }
    }
}

impl CameraProvider for NokhwaProvider {
    fn acquire(&mut self, facing: FacingMode) -> BoothResult<Box<dyn CaptureSource>> {
        let capture = WebcamCapture::new(self.device_for(facing))?;
        Ok(Box::new(capture))
    }
}
