//! Sidecar Transcript Provider
//!
//! Uses an existing `<clip>.srt` placed next to the clip, for transcripts
//! produced by other tools or edited by hand.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{Transcriber, TranscriptionError, TranscriptionResult};

/// Reads transcripts from files beside the media
#[derive(Debug, Clone, Default)]
pub struct SidecarTranscriber;

impl SidecarTranscriber {
    pub fn new() -> Self {
        Self
    }

    /// Transcript path for `media`: same directory and stem, `.srt` extension
    pub fn sidecar_path(media: &Path) -> PathBuf {
        media.with_extension("srt")
    }
}

#[async_trait]
impl Transcriber for SidecarTranscriber {
    fn name(&self) -> &'static str {
        "sidecar"
    }

    async fn transcribe(&self, media: &Path) -> TranscriptionResult<String> {
        let path = Self::sidecar_path(media);
        debug!("Reading sidecar transcript {}", path.display());

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TranscriptionError::SidecarMissing(path));
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Err(TranscriptionError::EmptyTranscript);
        }
        Ok(content)
    }
}
