//! Clip recording
//!
//! [`MediaRecorder`] is a two-state machine (idle, recording) driven by a
//! single toggle. On start it probes [`PREFERRED_ENCODINGS`] against the
//! registered backends and keeps the first match. Encoded chunks are
//! buffered until stop, then joined into one clip artifact.

mod ffmpeg;
mod gif;

pub use ffmpeg::FfmpegBackend;
pub use gif::GifBackend;

use crate::error::{BoothError, BoothResult};
use crate::gallery::{payload, Artifact};
use image::RgbImage;

/// A container/codec pair a backend may be able to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoding {
    pub mime: &'static str,
    pub extension: &'static str,
}

/// Encodings in order of preference
pub const PREFERRED_ENCODINGS: [Encoding; 4] = [
    Encoding {
        mime: "video/webm;codecs=vp9",
        extension: "webm",
    },
    Encoding {
        mime: "video/webm;codecs=vp8",
        extension: "webm",
    },
    Encoding {
        mime: "video/mp4;codecs=avc1",
        extension: "mp4",
    },
    Encoding {
        mime: "image/gif",
        extension: "gif",
    },
];

/// Frame geometry and rate handed to encoders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// Something that can turn frames into encoded bytes
pub trait RecorderBackend {
    fn name(&self) -> &'static str;

    fn is_type_supported(&self, mime: &str) -> bool;

    fn start(&mut self, mime: &str, settings: RecordSettings) -> BoothResult<Box<dyn ClipEncoder>>;
}

/// A running encode. Chunks come back as soon as the encoder produces them.
pub trait ClipEncoder {
    fn push_frame(&mut self, frame: &RgbImage) -> BoothResult<Vec<Vec<u8>>>;

    /// Flush the encoder and return any trailing chunks
    fn finish(self: Box<Self>) -> BoothResult<Vec<Vec<u8>>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording(Encoding),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    Started(Encoding),
    Stopped(Artifact),
}

struct ActiveRecording {
    encoding: Encoding,
    encoder: Box<dyn ClipEncoder>,
    frames: u64,
}

pub struct MediaRecorder {
    backends: Vec<Box<dyn RecorderBackend>>,
    settings: RecordSettings,
    active: Option<ActiveRecording>,
    chunks: Vec<Vec<u8>>,
}

impl MediaRecorder {
    pub fn new(settings: RecordSettings) -> Self {
        Self {
            backends: Vec::new(),
            settings,
            active: None,
            chunks: Vec::new(),
        }
    }

    /// Recorder with every backend available on this machine
    pub fn with_default_backends(settings: RecordSettings) -> Self {
        let mut recorder = Self::new(settings);
        match FfmpegBackend::probe() {
            Some(ffmpeg) => recorder.register(Box::new(ffmpeg)),
            None => tracing::info!("ffmpeg not found, video encodings unavailable"),
        }
        recorder.register(Box::new(GifBackend::new()));
        recorder
    }

    pub fn register(&mut self, backend: Box<dyn RecorderBackend>) {
        tracing::debug!("Registered recorder backend {}", backend.name());
        self.backends.push(backend);
    }

    pub fn state(&self) -> RecorderState {
        match &self.active {
            Some(active) => RecorderState::Recording(active.encoding),
            None => RecorderState::Idle,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    pub fn buffered_chunks(&self) -> usize {
        self.chunks.len()
    }

    /// First preferred encoding some backend supports, with that backend's slot
    pub fn select_encoding(&self) -> BoothResult<(Encoding, usize)> {
        for encoding in PREFERRED_ENCODINGS {
            if let Some(slot) = self
                .backends
                .iter()
                .position(|backend| backend.is_type_supported(encoding.mime))
            {
                return Ok((encoding, slot));
            }
        }

        let tried: Vec<&str> = PREFERRED_ENCODINGS.iter().map(|e| e.mime).collect();
        Err(BoothError::UnsupportedFormat(tried.join(", ")))
    }

    /// Start when idle, stop and finalize when recording
    pub fn toggle(&mut self) -> BoothResult<RecorderEvent> {
        if self.is_recording() {
            self.stop().map(RecorderEvent::Stopped)
        } else {
            self.start().map(RecorderEvent::Started)
        }
    }

    pub fn start(&mut self) -> BoothResult<Encoding> {
        if let Some(active) = &self.active {
            return Ok(active.encoding);
        }

        let (encoding, slot) = self.select_encoding()?;
        self.chunks.clear();

        let backend = &mut self.backends[slot];
        let encoder = backend.start(encoding.mime, self.settings)?;
        tracing::info!(
            "Recording started: {} via {} ({}x{} @ {} fps)",
            encoding.mime,
            backend.name(),
            self.settings.width,
            self.settings.height,
            self.settings.fps
        );

        self.active = Some(ActiveRecording {
            encoding,
            encoder,
            frames: 0,
        });
        Ok(encoding)
    }

    /// Feed one frame to the running encoder. Ignored while idle.
    pub fn push_frame(&mut self, frame: &RgbImage) -> BoothResult<()> {
        let Some(active) = self.active.as_mut() else {
            tracing::debug!("Dropping frame, recorder is idle");
            return Ok(());
        };

        let chunks = active.encoder.push_frame(frame)?;
        active.frames += 1;
        for chunk in chunks {
            self.on_data_available(chunk);
        }
        Ok(())
    }

    /// Buffer an encoded chunk. Empty chunks carry nothing and are skipped.
    pub fn on_data_available(&mut self, chunk: Vec<u8>) {
        if !chunk.is_empty() {
            self.chunks.push(chunk);
        }
    }

    /// Finalize the encoder and assemble the buffered chunks into a clip
    pub fn stop(&mut self) -> BoothResult<Artifact> {
        let active = self.active.take().ok_or_else(|| {
            BoothError::Other(anyhow::anyhow!("recorder is not recording"))
        })?;

        let trailing = active.encoder.finish();
        let chunks = std::mem::take(&mut self.chunks);
        let trailing = trailing?;

        let mut clip = Vec::with_capacity(chunks.iter().chain(&trailing).map(Vec::len).sum());
        for chunk in chunks.iter().chain(&trailing) {
            clip.extend_from_slice(chunk);
        }

        if clip.is_empty() {
            tracing::warn!("Recording stopped with no data, saving empty clip");
        }
        tracing::info!(
            "Recording stopped: {} frames, {} bytes of {}",
            active.frames,
            clip.len(),
            active.encoding.mime
        );

        Ok(Artifact::clip(payload::encode_data_uri(
            active.encoding.mime,
            &clip,
        )))
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockBackend;
    use super::*;

    const SETTINGS: RecordSettings = RecordSettings {
        width: 4,
        height: 2,
        fps: 10,
    };

    fn frame(value: u8) -> RgbImage {
        RgbImage::from_pixel(4, 2, image::Rgb([value; 3]))
    }

    #[test]
    fn picks_first_supported_in_preference_order() {
        let mut recorder = MediaRecorder::new(SETTINGS);
        recorder.register(Box::new(MockBackend::supporting(&["image/gif"])));
        recorder.register(Box::new(MockBackend::supporting(&[
            "video/mp4;codecs=avc1",
            "video/webm;codecs=vp8",
        ])));

        let (encoding, slot) = recorder.select_encoding().unwrap();
        assert_eq!(encoding.mime, "video/webm;codecs=vp8");
        assert_eq!(encoding.extension, "webm");
        assert_eq!(slot, 1);
    }

    #[test]
    fn no_supported_encoding_never_starts() {
        let mut recorder = MediaRecorder::new(SETTINGS);
        recorder.register(Box::new(MockBackend::supporting(&["audio/ogg"])));

        let err = recorder.toggle().unwrap_err();
        assert!(matches!(err, BoothError::UnsupportedFormat(_)));
        assert_eq!(recorder.state(), RecorderState::Idle);
    }

    #[test]
    fn toggle_cycles_idle_recording_idle() {
        let mut recorder = MediaRecorder::new(SETTINGS);
        recorder.register(Box::new(MockBackend::supporting(&["image/gif"])));

        let started = recorder.toggle().unwrap();
        assert!(matches!(started, RecorderEvent::Started(e) if e.mime == "image/gif"));
        assert!(recorder.is_recording());

        recorder.push_frame(&frame(7)).unwrap();
        recorder.push_frame(&frame(8)).unwrap();
        assert_eq!(recorder.buffered_chunks(), 2);

        let RecorderEvent::Stopped(clip) = recorder.toggle().unwrap() else {
            panic!("expected a stopped event");
        };
        assert_eq!(recorder.state(), RecorderState::Idle);
        assert_eq!(clip.mime(), "image/gif");
        assert_eq!(clip.extension(), "gif");
        assert_eq!(clip.decode_bytes().unwrap(), vec![7, 8]);
    }

    #[test]
    fn starting_clears_previous_chunks() {
        let mut recorder = MediaRecorder::new(SETTINGS);
        recorder.register(Box::new(MockBackend::supporting(&["image/gif"])));

        recorder.on_data_available(vec![1, 2, 3]);
        recorder.start().unwrap();
        assert_eq!(recorder.buffered_chunks(), 0);
    }

    #[test]
    fn stopping_with_no_chunks_still_yields_a_clip() {
        let mut recorder = MediaRecorder::new(SETTINGS);
        recorder.register(Box::new(MockBackend::silent(&["video/webm;codecs=vp9"])));

        recorder.toggle().unwrap();
        recorder.push_frame(&frame(1)).unwrap();
        let RecorderEvent::Stopped(clip) = recorder.toggle().unwrap() else {
            panic!("expected a stopped event");
        };
        assert_eq!(clip.kind, crate::gallery::ArtifactKind::Clip);
        assert!(clip.decode_bytes().unwrap().is_empty());
        assert_eq!(clip.extension(), "webm");
    }

    #[test]
    fn frames_while_idle_are_ignored() {
        let mut recorder = MediaRecorder::new(SETTINGS);
        recorder.push_frame(&frame(1)).unwrap();
        assert_eq!(recorder.buffered_chunks(), 0);
        assert!(recorder.stop().is_err());
    }
}
