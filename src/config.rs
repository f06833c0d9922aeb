use crate::capture::FacingMode;
use crate::recorder::RecordSettings;
use std::path::PathBuf;

pub const DEFAULT_CANVAS_WIDTH: u32 = 640;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 480;
pub const DEFAULT_FPS: u32 = 30;

/// Resolved session settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoothConfig {
    /// Key-value storage file holding the gallery
    pub storage_path: PathBuf,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub fps: u32,
    pub front_device: u32,
    pub back_device: u32,
    pub facing: FacingMode,
}

impl Default for BoothConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            fps: DEFAULT_FPS,
            front_device: 0,
            back_device: 1,
            facing: FacingMode::Front,
        }
    }
}

impl BoothConfig {
    pub fn record_settings(&self) -> RecordSettings {
        RecordSettings {
            width: self.canvas_width,
            height: self.canvas_height,
            fps: self.fps,
        }
    }
}

/// `<data dir>/photo-booth/storage.json`, or `./storage.json` when the
/// platform has no data directory
pub fn default_storage_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("photo-booth"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("storage.json")
}
