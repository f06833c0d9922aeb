use crate::error::BoothResult;
use crate::gallery::{Artifact, ArtifactKind, GalleryStore, Storage};
use image::{imageops, RgbImage};

/// Minimum horizontal travel, in pixels, for a gesture to count as a swipe
pub const SWIPE_THRESHOLD: f32 = 50.0;

/// Width of gallery grid thumbnails
pub const THUMBNAIL_WIDTH: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Swipe {
    Left,
    Right,
}

/// Tells deliberate horizontal swipes apart from taps
#[derive(Debug, Default)]
pub struct SwipeTracker {
    start_x: Option<f32>,
}

impl SwipeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touch_start(&mut self, x: f32) {
        self.start_x = Some(x);
    }

    /// Finish the gesture. `None` for taps or an end without a start.
    pub fn touch_end(&mut self, x: f32) -> Option<Swipe> {
        let dx = x - self.start_x.take()?;
        if dx.abs() <= SWIPE_THRESHOLD {
            None
        } else if dx < 0.0 {
            Some(Swipe::Left)
        } else {
            Some(Swipe::Right)
        }
    }
}

/// Grid entry for one artifact
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub index: usize,
    pub kind: ArtifactKind,
    /// Scaled preview; clips have none
    pub image: Option<RgbImage>,
}

/// Lightbox over a snapshot of the gallery
#[derive(Debug, Default)]
pub struct Viewer {
    entries: Vec<Artifact>,
    current: Option<usize>,
    swipe: SwipeTracker,
}

impl Viewer {
    pub fn new(entries: Vec<Artifact>) -> Self {
        Self {
            entries,
            current: None,
            swipe: SwipeTracker::new(),
        }
    }

    /// Viewer over a fresh read of the gallery
    pub fn load<S: Storage>(gallery: &GalleryStore<S>) -> BoothResult<Self> {
        Ok(Self::new(gallery.list()?))
    }

    /// Re-read the gallery, keeping the open position when it still exists
    pub fn refresh<S: Storage>(&mut self, gallery: &GalleryStore<S>) -> BoothResult<()> {
        self.entries = gallery.list()?;
        if let Some(index) = self.current {
            if self.entries.is_empty() {
                self.current = None;
            } else if index >= self.entries.len() {
                self.current = Some(self.entries.len() - 1);
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Artifact] {
        &self.entries
    }

    /// Open the lightbox at `index`. Out-of-range indexes leave it closed.
    pub fn open(&mut self, index: usize) -> Option<&Artifact> {
        if index >= self.entries.len() {
            tracing::debug!("No artifact at #{} to open", index);
            self.current = None;
            return None;
        }
        self.current = Some(index);
        self.entries.get(index)
    }

    pub fn close(&mut self) {
        self.current = None;
    }

    pub fn position(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<(usize, &Artifact)> {
        let index = self.current?;
        self.entries.get(index).map(|artifact| (index, artifact))
    }

    /// Advance, wrapping past the last entry to the first
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<usize> {
        self.step(1)
    }

    /// Go back, wrapping before the first entry to the last
    pub fn prev(&mut self) -> Option<usize> {
        self.step(-1)
    }

    fn step(&mut self, delta: isize) -> Option<usize> {
        let len = self.entries.len();
        if len == 0 {
            return None;
        }
        let from = self.current.unwrap_or(0) as isize;
        let to = (from + delta).rem_euclid(len as isize) as usize;
        self.current = Some(to);
        Some(to)
    }

    pub fn touch_start(&mut self, x: f32) {
        self.swipe.touch_start(x);
    }

    /// Swipe left shows the next entry, swipe right the previous one
    pub fn touch_end(&mut self, x: f32) -> Option<usize> {
        match self.swipe.touch_end(x)? {
            Swipe::Left => self.next(),
            Swipe::Right => self.prev(),
        }
    }

    /// Grid previews for every entry, in gallery order
    pub fn thumbnails(&self) -> Vec<Thumbnail> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, artifact)| Thumbnail {
                index,
                kind: artifact.kind,
                image: match artifact.kind {
                    ArtifactKind::Image => match artifact.decode_image() {
                        Ok(image) => Some(scale_to_width(&image, THUMBNAIL_WIDTH)),
                        Err(e) => {
                            tracing::warn!("Skipping thumbnail for #{}: {}", index, e);
                            None
                        }
                    },
                    ArtifactKind::Clip => None,
                },
            })
            .collect()
    }
}

fn scale_to_width(image: &RgbImage, width: u32) -> RgbImage {
    let (w, h) = image.dimensions();
    if w == 0 || w == width {
        return image.clone();
    }
    let height = ((h as u64 * width as u64) / w as u64).max(1) as u32;
    if w > width {
        imageops::thumbnail(image, width, height)
    } else {
        imageops::resize(image, width, height, imageops::FilterType::Triangle)
    }
}
