use crate::capture::{CameraProvider, CameraSession, FacingMode};
use crate::error::{BoothError, BoothResult};
use crate::filters::{FilterKind, FilterState};
use crate::gallery::{Artifact, GalleryStore, Storage};
use crate::recorder::{MediaRecorder, RecorderEvent};
use crate::render::{self, RawFrame};
use crate::viewer::Viewer;
use image::RgbImage;

/// One booth session: camera, filters, last capture, recorder and gallery.
///
/// Every user action is a method here; nothing lives in globals.
pub struct Booth<P: CameraProvider, S: Storage> {
    camera: CameraSession<P>,
    filters: FilterState,
    raw: Option<RawFrame>,
    recorder: MediaRecorder,
    gallery: GalleryStore<S>,
    last_saved: Option<usize>,
}

impl<P: CameraProvider, S: Storage> Booth<P, S> {
    pub fn new(
        camera: CameraSession<P>,
        recorder: MediaRecorder,
        gallery: GalleryStore<S>,
    ) -> Self {
        Self {
            camera,
            filters: FilterState::default(),
            raw: None,
            recorder,
            gallery,
            last_saved: None,
        }
    }

    pub fn camera(&self) -> &CameraSession<P> {
        &self.camera
    }

    pub fn start_camera(&mut self, facing: FacingMode) -> BoothResult<()> {
        self.camera.start(facing)
    }

    /// Toggle front/back. The old stream is released before the new one opens.
    pub fn switch_camera(&mut self) -> BoothResult<FacingMode> {
        if self.recorder.is_recording() {
            tracing::warn!("Switching camera while recording");
        }
        self.camera.switch_facing()
    }

    pub fn stop_camera(&mut self) {
        self.camera.release();
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn set_filter(&mut self, kind: FilterKind, value: f32) {
        self.filters.set(kind, value);
    }

    pub fn set_filters(&mut self, filters: FilterState) {
        self.filters = filters;
    }

    /// Grab the current live frame, unfiltered, as the new raw frame
    pub fn capture(&mut self) -> BoothResult<&RawFrame> {
        let frame = self.camera.capture_frame()?;
        tracing::info!("Captured {}x{} frame", frame.width(), frame.height());
        Ok(self.raw.insert(RawFrame::new(frame)))
    }

    /// The captured frame as it looks with the current filters
    pub fn preview(&self) -> BoothResult<RgbImage> {
        let raw = self
            .raw
            .as_ref()
            .ok_or_else(|| BoothError::empty_capture("capture an image first"))?;
        Ok(render::preview(raw, &self.filters))
    }

    /// A live frame with the current filters, leaving the raw frame alone
    pub fn live_preview(&mut self) -> BoothResult<RgbImage> {
        let frame = self.camera.capture_frame()?;
        Ok(render::apply_filters(&frame, &self.filters))
    }

    /// Bake the filters into the captured frame and append it to the gallery
    pub fn save(&mut self) -> BoothResult<Artifact> {
        let raw = self
            .raw
            .as_ref()
            .ok_or_else(|| BoothError::empty_capture("capture an image before saving"))?;

        let artifact = Artifact::image(render::commit(raw, &self.filters)?);
        self.last_saved = Some(self.gallery.append(artifact.clone())?);
        tracing::info!("Saved still with {}", self.filters);
        Ok(artifact)
    }

    pub fn recorder(&self) -> &MediaRecorder {
        &self.recorder
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    /// Start or stop recording. A finished clip goes straight to the gallery.
    pub fn toggle_recording(&mut self) -> BoothResult<RecorderEvent> {
        if !self.recorder.is_recording() && !self.camera.is_live() {
            return Err(BoothError::empty_capture(
                "start the camera before recording",
            ));
        }

        let event = self.recorder.toggle()?;
        if let RecorderEvent::Stopped(clip) = &event {
            self.last_saved = Some(self.gallery.append(clip.clone())?);
        }
        Ok(event)
    }

    /// Feed the next filtered live frame to the recorder
    pub fn record_frame(&mut self) -> BoothResult<()> {
        if !self.recorder.is_recording() {
            return Ok(());
        }
        let frame = self.camera.capture_frame()?;
        let filtered = render::apply_filters(&frame, &self.filters);
        self.recorder.push_frame(&filtered)
    }

    /// Gallery position of the most recent still or clip this session saved
    pub fn last_saved(&self) -> Option<usize> {
        self.last_saved
    }

    pub fn gallery(&self) -> &GalleryStore<S> {
        &self.gallery
    }

    pub fn delete(&self, index: usize) -> BoothResult<()> {
        self.gallery.delete_at(index)
    }

    /// Lightbox over the gallery as it is right now
    pub fn viewer(&self) -> BoothResult<Viewer> {
        Viewer::load(&self.gallery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::mock::MockProvider;
    use crate::gallery::{ArtifactKind, MemoryStorage};
    use crate::recorder::mock::MockBackend;
    use crate::recorder::RecordSettings;

    fn booth_with(
        provider: MockProvider,
        backend: MockBackend,
    ) -> Booth<MockProvider, MemoryStorage> {
        let mut recorder = MediaRecorder::new(RecordSettings {
            width: 16,
            height: 12,
            fps: 10,
        });
        recorder.register(Box::new(backend));
        Booth::new(
            CameraSession::new(provider, 16, 12),
            recorder,
            GalleryStore::new(MemoryStorage::new()),
        )
    }

    fn booth() -> Booth<MockProvider, MemoryStorage> {
        let provider = MockProvider {
            frame_size: Some((16, 12)),
            ..MockProvider::with_color([80, 100, 60])
        };
        booth_with(provider, MockBackend::supporting(&["image/gif"]))
    }

    fn mean(image: &RgbImage) -> f64 {
        let sum: u64 = image.as_raw().iter().map(|&v| v as u64).sum();
        sum as f64 / image.as_raw().len() as f64
    }

    #[test]
    fn brightened_capture_is_saved_brighter() {
        let mut booth = booth();
        booth.start_camera(FacingMode::Front).unwrap();
        assert!(booth.gallery().list().unwrap().is_empty());

        let raw = booth.capture().unwrap().image().clone();
        booth.set_filter(FilterKind::Brightness, 150.0);
        booth.save().unwrap();

        let list = booth.gallery().list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].kind, ArtifactKind::Image);
        assert_eq!(booth.last_saved(), Some(0));

        let saved = list[0].decode_image().unwrap();
        assert_eq!(saved.dimensions(), (16, 12));
        assert!(mean(&saved) > mean(&raw));
    }

    #[test]
    fn saved_still_matches_preview() {
        let mut booth = booth();
        booth.start_camera(FacingMode::Front).unwrap();
        booth.capture().unwrap();
        booth.set_filter(FilterKind::Sepia, 70.0);

        let shown = booth.preview().unwrap();
        let saved = booth.save().unwrap().decode_image().unwrap();
        assert_eq!(saved, shown);
    }

    #[test]
    fn save_before_capture_is_empty_capture() {
        let mut booth = booth();
        let err = booth.save().unwrap_err();
        assert!(matches!(err, BoothError::EmptyCapture(_)));
        assert!(matches!(booth.preview(), Err(BoothError::EmptyCapture(_))));
        assert!(booth.gallery().list().unwrap().is_empty());
    }

    #[test]
    fn recording_with_no_chunks_still_saves_clip() {
        let mut booth = booth_with(
            MockProvider::default(),
            MockBackend::silent(&["video/webm;codecs=vp9"]),
        );
        booth.start_camera(FacingMode::Front).unwrap();

        assert!(matches!(
            booth.toggle_recording().unwrap(),
            RecorderEvent::Started(_)
        ));
        assert!(matches!(
            booth.toggle_recording().unwrap(),
            RecorderEvent::Stopped(_)
        ));

        let list = booth.gallery().list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].kind, ArtifactKind::Clip);
        assert_eq!(list[0].extension(), "webm");
    }

    #[test]
    fn recorded_frames_end_up_in_clip() {
        let mut booth = booth();
        booth.start_camera(FacingMode::Front).unwrap();
        booth.set_filter(FilterKind::Invert, 100.0);

        booth.toggle_recording().unwrap();
        booth.record_frame().unwrap();
        booth.record_frame().unwrap();
        let RecorderEvent::Stopped(clip) = booth.toggle_recording().unwrap() else {
            panic!("expected a stopped event");
        };

        // Mock backend emits the first byte of each frame: inverted 80 is 175
        assert_eq!(clip.decode_bytes().unwrap(), vec![175, 175]);
        assert_eq!(booth.gallery().list().unwrap(), vec![clip]);
    }

    #[test]
    fn frame_failure_mid_recording_still_finalizes_one_clip() {
        let provider = MockProvider {
            frame_size: Some((16, 12)),
            frame_budget: Some(1),
            ..MockProvider::with_color([80, 100, 60])
        };
        let mut booth = booth_with(provider, MockBackend::supporting(&["image/gif"]));
        booth.start_camera(FacingMode::Front).unwrap();

        booth.toggle_recording().unwrap();
        booth.record_frame().unwrap();
        let err = booth.record_frame().unwrap_err();
        assert!(matches!(err, BoothError::CameraUnavailable(_)));
        assert!(booth.is_recording());

        let RecorderEvent::Stopped(clip) = booth.toggle_recording().unwrap() else {
            panic!("expected a stopped event");
        };
        assert_eq!(clip.decode_bytes().unwrap(), vec![80]);
        assert_eq!(booth.last_saved(), Some(0));
        assert_eq!(booth.gallery().list().unwrap(), vec![clip]);
    }

    #[test]
    fn recording_needs_a_live_camera() {
        let mut booth = booth();
        let err = booth.toggle_recording().unwrap_err();
        assert!(matches!(err, BoothError::EmptyCapture(_)));
        assert!(!booth.is_recording());
    }

    #[test]
    fn unsupported_format_leaves_session_usable() {
        let mut booth = booth_with(MockProvider::default(), MockBackend::supporting(&[]));
        booth.start_camera(FacingMode::Front).unwrap();

        let err = booth.toggle_recording().unwrap_err();
        assert!(matches!(err, BoothError::UnsupportedFormat(_)));
        assert!(!booth.is_recording());

        booth.capture().unwrap();
        booth.save().unwrap();
        assert_eq!(booth.gallery().len().unwrap(), 1);
    }

    #[test]
    fn switching_camera_twice_keeps_single_stream() {
        let provider = MockProvider::default();
        let counter = provider.counter.clone();
        let mut booth = booth_with(provider, MockBackend::supporting(&["image/gif"]));

        booth.start_camera(FacingMode::Front).unwrap();
        booth.switch_camera().unwrap();
        booth.switch_camera().unwrap();

        assert_eq!(booth.camera().facing(), FacingMode::Front);
        assert_eq!(counter.live.get(), 1);
        assert_eq!(counter.peak.get(), 1);
    }

    #[test]
    fn delete_and_view_through_session() {
        let mut booth = booth();
        booth.start_camera(FacingMode::Front).unwrap();
        booth.capture().unwrap();
        booth.save().unwrap();
        booth.set_filter(FilterKind::Grayscale, 100.0);
        booth.save().unwrap();

        let mut viewer = booth.viewer().unwrap();
        assert_eq!(viewer.len(), 2);
        viewer.open(1);
        assert_eq!(viewer.next(), Some(0));

        assert_eq!(booth.last_saved(), Some(1));

        booth.delete(0).unwrap();
        booth.delete(7).unwrap();
        assert_eq!(booth.gallery().len().unwrap(), 1);
    }

    #[test]
    fn stopping_camera_keeps_capture_but_blocks_recording() {
        let mut booth = booth();
        booth.start_camera(FacingMode::Front).unwrap();
        booth.capture().unwrap();
        booth.stop_camera();

        assert!(!booth.camera().is_live());
        assert!(matches!(
            booth.toggle_recording(),
            Err(BoothError::EmptyCapture(_))
        ));
        booth.save().unwrap();
        assert_eq!(booth.last_saved(), Some(0));
    }
}
