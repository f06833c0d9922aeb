//! Filter compositing
//!
//! Both render modes go through [`apply_filters`]:
//! - preview: returns a fresh raster for display; the raw frame is never touched
//! - commit: bakes the filters into new pixels and encodes them as a PNG data URI
//!
//! PNG is lossless, so a committed still decodes to exactly the pixels the
//! preview showed.

mod stages;

pub use stages::apply_stage;

use crate::error::{BoothError, BoothResult};
use crate::filters::FilterState;
use crate::gallery::payload;
use image::{imageops, ImageFormat, RgbImage};
use std::io::Cursor;

/// MIME type of committed stills
pub const STILL_MIME: &str = "image/png";

/// Filter-free snapshot of the camera at capture time
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    image: RgbImage,
}

impl RawFrame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }
}

/// Fit a frame to the canvas resolution
pub fn fit_to_canvas(frame: RgbImage, width: u32, height: u32) -> RgbImage {
    if frame.dimensions() == (width, height) {
        return frame;
    }
    tracing::debug!(
        "Resizing frame {}x{} to canvas {}x{}",
        frame.width(),
        frame.height(),
        width,
        height
    );
    imageops::resize(&frame, width, height, imageops::FilterType::Triangle)
}

/// Run every filter stage, in pipeline order, over a source raster
pub fn apply_filters(source: &RgbImage, filters: &FilterState) -> RgbImage {
    let _span = tracing::debug_span!("apply_filters").entered();

    let mut out = source.clone();
    if filters.is_neutral() {
        return out;
    }

    let stages: Vec<_> = filters.stages().collect();
    for pixel in out.pixels_mut() {
        let mut rgb = [
            pixel[0] as f32 / 255.0,
            pixel[1] as f32 / 255.0,
            pixel[2] as f32 / 255.0,
        ];
        for &(kind, value) in &stages {
            rgb = apply_stage(kind, value, rgb);
        }
        pixel.0 = rgb.map(to_u8);
    }

    out
}

#[inline]
fn to_u8(c: f32) -> u8 {
    (c * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Non-destructive on-screen rendering of the raw frame
pub fn preview(raw: &RawFrame, filters: &FilterState) -> RgbImage {
    apply_filters(raw.image(), filters)
}

/// Bake the filters into new pixels and encode a standalone PNG data URI
pub fn commit(raw: &RawFrame, filters: &FilterState) -> BoothResult<String> {
    let _span = tracing::debug_span!("commit").entered();

    let baked = apply_filters(raw.image(), filters);
    let png = encode_png(&baked)?;
    Ok(payload::encode_data_uri(STILL_MIME, &png))
}

pub fn encode_png(image: &RgbImage) -> BoothResult<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| BoothError::encode(format!("failed to encode PNG: {e}")))?;
    Ok(bytes)
}
