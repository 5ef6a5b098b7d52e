//! Clip Artifacts
//!
//! Every file the caption pipeline writes is derived from the clip path, and
//! intermediate files are owned by an [`ArtifactGuard`] so they disappear on
//! failure, early return or cancellation.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::fs::remove_if_exists;

/// File-name suffix of cut clips
pub const SHORTS_SUFFIX: &str = "#shorts.mp4";

/// File-name suffix of captioned clips
pub const CAPTIONED_SUFFIX: &str = "#shorts_with_captions.mp4";

/// Path of the captioned version of `clip`.
///
/// `<name> #shorts.mp4` becomes `<name> #shorts_with_captions.mp4`; other
/// names get `_with_captions` before the extension.
pub fn captioned_output_path(clip: &Path) -> PathBuf {
    let name = clip
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let captioned = match name.strip_suffix(SHORTS_SUFFIX) {
        Some(prefix) => format!("{}{}", prefix, CAPTIONED_SUFFIX),
        None => {
            let stem = clip
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "clip".to_string());
            let ext = clip
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_else(|| "mp4".to_string());
            format!("{}_with_captions.{}", stem, ext)
        }
    };

    clip.with_file_name(captioned)
}

/// Paths of everything produced while captioning one clip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipArtifacts {
    pub clip: PathBuf,
    /// SRT transcript written by the Transcribe stage
    pub transcript: PathBuf,
    /// Rendered caption layer
    pub canvas: PathBuf,
    /// Final captioned clip
    pub output: PathBuf,
}

impl ClipArtifacts {
    pub fn for_clip(clip: &Path) -> Self {
        let stem = clip
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "clip".to_string());

        Self {
            clip: clip.to_path_buf(),
            transcript: clip.with_file_name(format!("{}.transcript.srt", stem)),
            canvas: clip.with_file_name(format!("{}.canvas.mp4", stem)),
            output: captioned_output_path(clip),
        }
    }
}

/// Deletes tracked files when dropped unless they were kept
#[derive(Debug, Default)]
pub struct ArtifactGuard {
    paths: Vec<PathBuf>,
}

impl ArtifactGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `path` for deletion
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    /// Stops tracking `path` so it survives the guard
    pub fn keep(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }

    pub fn tracked(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Deletes every tracked file now. Failures are logged, never returned.
    pub fn cleanup(mut self) {
        self.remove_all();
    }

    fn remove_all(&mut self) {
        for path in self.paths.drain(..) {
            match remove_if_exists(&path) {
                Ok(true) => debug!("Removed artifact {}", path.display()),
                Ok(false) => {}
                Err(e) => warn!("Failed to remove artifact {}: {}", path.display(), e),
            }
        }
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        self.remove_all();
    }
}
