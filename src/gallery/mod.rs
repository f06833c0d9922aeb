pub mod payload;
pub mod storage;

pub use storage::{FileStorage, MemoryStorage, Storage};

use crate::error::{BoothError, BoothResult};
use anyhow::Context;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Storage key holding the serialized gallery list
pub const GALLERY_KEY: &str = "galleryImages";

/// Prefix of exported file names
pub const EXPORT_PREFIX: &str = "webart";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Image,
    Clip,
}

impl ArtifactKind {
    /// Kind implied by a payload's MIME type. Animated GIFs are clips.
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("video/") || mime == "image/gif" {
            ArtifactKind::Clip
        } else {
            ArtifactKind::Image
        }
    }
}

/// A persisted gallery entry. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    /// `data:` URI carrying the encoded bytes
    pub payload: String,
}

impl Artifact {
    pub fn image(payload: impl Into<String>) -> Self {
        Self {
            kind: ArtifactKind::Image,
            payload: payload.into(),
        }
    }

    pub fn clip(payload: impl Into<String>) -> Self {
        Self {
            kind: ArtifactKind::Clip,
            payload: payload.into(),
        }
    }

    pub fn mime(&self) -> &str {
        payload::mime_of(&self.payload).unwrap_or("application/octet-stream")
    }

    pub fn extension(&self) -> &'static str {
        payload::extension_for(self.mime())
    }

    pub fn decode_bytes(&self) -> BoothResult<Vec<u8>> {
        payload::decode_data_uri(&self.payload).map(|(_, bytes)| bytes)
    }

    /// Decode an image artifact back into pixels
    pub fn decode_image(&self) -> BoothResult<RgbImage> {
        if self.kind != ArtifactKind::Image {
            return Err(BoothError::invalid_payload("artifact is a clip, not an image"));
        }
        let bytes = self.decode_bytes()?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| BoothError::invalid_payload(format!("undecodable image: {e}")))?;
        Ok(image.to_rgb8())
    }
}

/// Deterministic download name for the artifact at `index`
pub fn export_file_name(index: usize, artifact: &Artifact) -> String {
    format!("{}-{}.{}", EXPORT_PREFIX, index, artifact.extension())
}

/// One element of the persisted list, in either historical shape
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Extended(Artifact),
    /// Bare data URI written by older builds
    Legacy(String),
}

impl StoredEntry {
    fn normalize(self) -> (Artifact, bool) {
        match self {
            StoredEntry::Extended(artifact) => (artifact, false),
            StoredEntry::Legacy(uri) => {
                let kind = ArtifactKind::from_mime(payload::mime_of(&uri).unwrap_or(""));
                (Artifact { kind, payload: uri }, true)
            }
        }
    }
}

/// Ordered, append-only list of artifacts persisted under [`GALLERY_KEY`].
///
/// Every operation re-reads storage, so views that share the same storage
/// always see each other's writes. Writers are not coordinated: the last
/// full-list write wins.
pub struct GalleryStore<S: Storage> {
    storage: S,
}

impl<S: Storage> GalleryStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Current list, freshly read. Legacy entries are upgraded to the
    /// `{kind, payload}` shape and the normalized list is written back.
    pub fn list(&self) -> BoothResult<Vec<Artifact>> {
        let _span = tracing::debug_span!("gallery_list").entered();

        let Some(text) = self.storage.get_item(GALLERY_KEY)? else {
            return Ok(Vec::new());
        };

        let entries: Vec<StoredEntry> = serde_json::from_str(&text)
            .map_err(|e| BoothError::storage(format!("corrupt gallery list: {e}")))?;

        let mut migrated = 0usize;
        let artifacts: Vec<Artifact> = entries
            .into_iter()
            .map(|entry| {
                let (artifact, was_legacy) = entry.normalize();
                migrated += was_legacy as usize;
                artifact
            })
            .collect();

        if migrated > 0 {
            tracing::info!("Migrated {} legacy gallery entries", migrated);
            self.write(&artifacts)?;
        }

        tracing::debug!("Gallery holds {} artifacts", artifacts.len());
        Ok(artifacts)
    }

    pub fn len(&self) -> BoothResult<usize> {
        Ok(self.list()?.len())
    }

    pub fn is_empty(&self) -> BoothResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn get(&self, index: usize) -> BoothResult<Option<Artifact>> {
        Ok(self.list()?.into_iter().nth(index))
    }

    /// Add to the end of the list and persist
    /// Append and return the position the artifact was written at
    pub fn append(&self, artifact: Artifact) -> BoothResult<usize> {
        let mut artifacts = self.list()?;
        let index = artifacts.len();
        artifacts.push(artifact);
        self.write(&artifacts)?;
        tracing::info!("Saved artifact #{}", index);
        Ok(index)
    }

    /// Remove the entry at `index`. An index past the end (e.g. already
    /// deleted from another view) is ignored.
    pub fn delete_at(&self, index: usize) -> BoothResult<()> {
        let mut artifacts = self.list()?;
        if index >= artifacts.len() {
            tracing::debug!(
                "Ignoring delete of #{} (gallery holds {})",
                index,
                artifacts.len()
            );
            return Ok(());
        }
        artifacts.remove(index);
        self.write(&artifacts)?;
        tracing::info!("Deleted artifact #{}", index);
        Ok(())
    }

    /// Write the decoded payload of entry `index` into `dir`
    pub fn export(&self, index: usize, dir: &Path) -> BoothResult<PathBuf> {
        let artifact = self.get(index)?.ok_or_else(|| {
            BoothError::storage(format!("no artifact at position {index}"))
        })?;

        let bytes = artifact.decode_bytes()?;
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create export directory {}", dir.display()))?;

        let path = dir.join(export_file_name(index, &artifact));
        fs::write(&path, bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::info!("Exported artifact #{} to {}", index, path.display());
        Ok(path)
    }

    fn write(&self, artifacts: &[Artifact]) -> BoothResult<()> {
        let text = serde_json::to_string(artifacts)
            .map_err(|e| BoothError::storage(format!("failed to serialize gallery: {e}")))?;
        self.storage.set_item(GALLERY_KEY, &text)
    }
}
