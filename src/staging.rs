//! Images picked by the user, held until they are uploaded for detection.
//!
//! Every staged image owns exactly one [`PreviewHandle`]. Handles come from a
//! registry that tracks which ones are live; revoking consumes the handle, so
//! a handle cannot be revoked twice, and the buffer revokes anything still
//! live when it is dropped.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

/// A file offered for staging, before the image filter is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Reads a file from disk, guessing its content type from the extension.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read image file '{}'", path.display()))?;
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Ok(Self::new(file_name, content_type, bytes))
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StagedImage {
    file: SelectedFile,
}

impl StagedImage {
    pub fn file_name(&self) -> &str {
        &self.file.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.file.content_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.file.bytes
    }

    pub fn size(&self) -> usize {
        self.file.bytes.len()
    }
}

/// Revocable reference used to display a staged image locally.
#[derive(Debug, PartialEq, Eq)]
pub struct PreviewHandle {
    id: u64,
    locator: String,
}

impl PreviewHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }
}

impl fmt::Display for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.locator)
    }
}

#[derive(Debug, Default)]
struct PreviewRegistry {
    next_id: u64,
    live: HashSet<u64>,
}

impl PreviewRegistry {
    fn allocate(&mut self, file_name: &str) -> PreviewHandle {
        self.next_id += 1;
        let id = self.next_id;
        self.live.insert(id);
        PreviewHandle {
            id,
            locator: format!("preview://{}/{}", id, file_name),
        }
    }

    fn revoke(&mut self, handle: PreviewHandle) {
        let was_live = self.live.remove(&handle.id);
        debug_assert!(was_live, "preview handle {} revoked twice", handle.id);
        debug!("Revoked preview {}", handle.locator);
    }
}

#[derive(Debug, Default)]
pub struct ImageStagingBuffer {
    images: Vec<StagedImage>,
    previews: Vec<PreviewHandle>,
    registry: PreviewRegistry,
}

impl ImageStagingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages the image entries of `files`; anything else is dropped silently.
    /// Returns the number of files accepted.
    pub fn select<I>(&mut self, files: I) -> usize
    where
        I: IntoIterator<Item = SelectedFile>,
    {
        let mut accepted = 0;
        for file in files {
            if !file.is_image() {
                debug!("Skipping non-image file '{}' ({})", file.file_name, file.content_type);
                continue;
            }
            let handle = self.registry.allocate(&file.file_name);
            self.images.push(StagedImage { file });
            self.previews.push(handle);
            accepted += 1;
        }
        accepted
    }

    /// Unstages the image at `index`, revoking its preview. Out-of-range
    /// indices leave the buffer untouched.
    pub fn remove(&mut self, index: usize) -> Option<StagedImage> {
        if index >= self.images.len() {
            return None;
        }
        let handle = self.previews.remove(index);
        self.registry.revoke(handle);
        Some(self.images.remove(index))
    }

    pub fn reset(&mut self) {
        for handle in self.previews.drain(..) {
            self.registry.revoke(handle);
        }
        self.images.clear();
    }

    pub fn images(&self) -> &[StagedImage] {
        &self.images
    }

    pub fn previews(&self) -> &[PreviewHandle] {
        &self.previews
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Number of preview handles allocated but not yet revoked.
    pub fn live_previews(&self) -> usize {
        self.registry.live.len()
    }
}

impl Drop for ImageStagingBuffer {
    fn drop(&mut self) {
        self.reset();
    }
}
