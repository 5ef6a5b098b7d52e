//! Transcription Module
//!
//! Produces SRT transcripts for cut clips. The caption pipeline only sees the
//! [`Transcriber`] trait; which service answers is decided by settings.
//!
//! Providers:
//! - AssemblyAI (`assemblyai` feature): upload, transcribe with language
//!   detection, download SRT
//! - Sidecar: reads a ready-made `<clip>.srt` next to the clip

#[cfg(feature = "assemblyai")]
mod assemblyai;
mod sidecar;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

#[cfg(feature = "assemblyai")]
pub use assemblyai::{AssemblyAiConfig, AssemblyAiTranscriber};
pub use sidecar::SidecarTranscriber;

use crate::core::settings::{TranscriptionProvider, TranscriptionSettings};

// =============================================================================
// Errors
// =============================================================================

/// Transcription failures. All of them are recoverable at batch level: the
/// clip is kept without captions.
#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("Transcription API key is missing")]
    ApiKeyMissing,

    #[error("Transcription provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Transcription request failed: {0}")]
    RequestFailed(String),

    #[error("Transcription service error ({status}): {message}")]
    ServiceError { status: u16, message: String },

    #[error("Transcript {id} failed: {message}")]
    TranscriptFailed { id: String, message: String },

    #[error("Transcription did not finish within {0} seconds")]
    Timeout(u64),

    #[error("Transcript is empty")]
    EmptyTranscript,

    #[error("Sidecar transcript not found: {0}")]
    SidecarMissing(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TranscriptionResult<T> = Result<T, TranscriptionError>;

// =============================================================================
// Transcriber Trait
// =============================================================================

/// Source of SRT transcripts for media files
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &'static str;

    /// Returns the SRT transcript of `media`
    async fn transcribe(&self, media: &Path) -> TranscriptionResult<String>;
}

/// Builds the transcriber selected by `settings`, or `None` when
/// transcription is disabled.
pub fn create_transcriber(
    settings: &TranscriptionSettings,
) -> TranscriptionResult<Option<Arc<dyn Transcriber>>> {
    match settings.provider {
        TranscriptionProvider::None => Ok(None),
        TranscriptionProvider::Sidecar => Ok(Some(Arc::new(SidecarTranscriber::new()))),
        #[cfg(feature = "assemblyai")]
        TranscriptionProvider::AssemblyAi => {
            let api_key = settings
                .resolved_api_key()
                .ok_or(TranscriptionError::ApiKeyMissing)?;
            let config = AssemblyAiConfig::from_settings(settings, api_key);
            Ok(Some(Arc::new(AssemblyAiTranscriber::new(config)?)))
        }
        #[cfg(not(feature = "assemblyai"))]
        TranscriptionProvider::AssemblyAi => Err(TranscriptionError::ProviderUnavailable(
            "built without the assemblyai feature".to_string(),
        )),
    }
}
