use super::{ClipEncoder, RecordSettings, RecorderBackend};
use crate::error::{BoothError, BoothResult};
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, Frame, RgbImage};
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

const GIF_MIME: &str = "image/gif";

/// Quantizer speed handed to the GIF encoder (1 = best, 30 = fastest)
const GIF_SPEED: i32 = 10;

/// Animated GIF recording, always available
#[derive(Debug, Default)]
pub struct GifBackend;

impl GifBackend {
    pub fn new() -> Self {
        Self
    }
}

impl RecorderBackend for GifBackend {
    fn name(&self) -> &'static str {
        "gif"
    }

    fn is_type_supported(&self, mime: &str) -> bool {
        mime == GIF_MIME
    }

    fn start(&mut self, mime: &str, settings: RecordSettings) -> BoothResult<Box<dyn ClipEncoder>> {
        if !self.is_type_supported(mime) {
            return Err(BoothError::UnsupportedFormat(mime.to_string()));
        }
        Ok(Box::new(GifClipEncoder::new(settings)?))
    }
}

/// Writer that collects bytes so they can be handed out as chunks
#[derive(Clone, Default)]
struct ChunkBuffer(Rc<RefCell<Vec<u8>>>);

impl ChunkBuffer {
    fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}

impl Write for ChunkBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct GifClipEncoder {
    encoder: GifEncoder<ChunkBuffer>,
    buffer: ChunkBuffer,
    delay: Delay,
}

impl GifClipEncoder {
    fn new(settings: RecordSettings) -> BoothResult<Self> {
        let buffer = ChunkBuffer::default();
        let mut encoder = GifEncoder::new_with_speed(buffer.clone(), GIF_SPEED);
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| BoothError::encode(format!("failed to configure GIF encoder: {e}")))?;

        Ok(Self {
            encoder,
            buffer,
            delay: Delay::from_numer_denom_ms(1000, settings.fps.max(1)),
        })
    }
}

impl ClipEncoder for GifClipEncoder {
    fn push_frame(&mut self, frame: &RgbImage) -> BoothResult<Vec<Vec<u8>>> {
        let _span = tracing::debug_span!("gif_frame").entered();

        let rgba = DynamicImage::ImageRgb8(frame.clone()).to_rgba8();
        self.encoder
            .encode_frame(Frame::from_parts(rgba, 0, 0, self.delay))
            .map_err(|e| BoothError::encode(format!("failed to encode GIF frame: {e}")))?;

        let chunk = self.buffer.take();
        Ok(if chunk.is_empty() { Vec::new() } else { vec![chunk] })
    }

    fn finish(self: Box<Self>) -> BoothResult<Vec<Vec<u8>>> {
        let GifClipEncoder {
            encoder, buffer, ..
        } = *self;
        // The trailer is written when the encoder goes away
        drop(encoder);

        let tail = buffer.take();
        Ok(if tail.is_empty() { Vec::new() } else { vec![tail] })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTINGS: RecordSettings = RecordSettings {
        width: 8,
        height: 6,
        fps: 10,
    };

    #[test]
    fn supports_only_gif() {
        let backend = GifBackend::new();
        assert!(backend.is_type_supported("image/gif"));
        assert!(!backend.is_type_supported("video/webm;codecs=vp9"));
    }

    #[test]
    fn encodes_a_decodable_animation() {
        let mut encoder = GifBackend::new().start(GIF_MIME, SETTINGS).unwrap();

        let mut clip = Vec::new();
        for shade in [0u8, 128, 255] {
            let frame = RgbImage::from_pixel(8, 6, image::Rgb([shade, 0, 0]));
            for chunk in encoder.push_frame(&frame).unwrap() {
                clip.extend(chunk);
            }
        }
        for chunk in encoder.finish().unwrap() {
            clip.extend(chunk);
        }

        assert!(clip.starts_with(b"GIF89a"));
        assert_eq!(clip.last(), Some(&0x3B));

        let decoded = image::load_from_memory_with_format(&clip, image::ImageFormat::Gif).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
    }

    #[test]
    fn zero_frames_produce_no_bytes() {
        let encoder = GifBackend::new().start(GIF_MIME, SETTINGS).unwrap();
        let tail: Vec<u8> = encoder.finish().unwrap().concat();
        assert!(tail.is_empty());
    }
}
