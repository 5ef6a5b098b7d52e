//! Caption Pipeline
//!
//! Captions one cut clip:
//!
//! ```text
//! Transcribe → ParseCues → RenderCanvas → Composite → Cleanup
//! ```
//!
//! Any stage failure ends the run for that clip only. Intermediate files are
//! owned by an [`ArtifactGuard`], so cleanup happens on success, on failure
//! and when the future is dropped mid-flight. The captioned output is only
//! owned once compositing starts, so a failed retry keeps an earlier result.

mod artifacts;

pub use artifacts::{
    captioned_output_path, ArtifactGuard, ClipArtifacts, CAPTIONED_SUFFIX, SHORTS_SUFFIX,
};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::core::captions::{
    parse_cues, CaptionError, CaptionRenderer, OverlayCompositor, OverlayStyle,
};
use crate::core::ffmpeg::{CanvasStreamSpec, MediaBackend, RenderSettings};
use crate::core::settings::PipelineSettings;
use crate::core::transcription::Transcriber;
use crate::core::Frame;

// =============================================================================
// Stages
// =============================================================================

/// Steps of captioning one clip, in execution order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PipelineStage {
    Transcribe,
    ParseCues,
    RenderCanvas,
    Composite,
    Cleanup,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transcribe => "transcribe",
            Self::ParseCues => "parse cues",
            Self::RenderCanvas => "render canvas",
            Self::Composite => "composite",
            Self::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// A caption run that stopped at `stage`
#[derive(Debug, thiserror::Error)]
#[error("Captioning failed at {stage}: {error}")]
pub struct PipelineFailure {
    pub stage: PipelineStage,
    #[source]
    pub error: CaptionError,
}

impl PipelineFailure {
    fn at(stage: PipelineStage) -> impl FnOnce(CaptionError) -> Self {
        move |error| Self { stage, error }
    }
}

/// Result of a successful caption run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionOutcome {
    pub output: PathBuf,
    /// Transcript path when kept by settings
    pub transcript: Option<PathBuf>,
    pub cue_count: usize,
    pub frame_count: u64,
}

// =============================================================================
// Pipeline
// =============================================================================

/// Captions clips with a transcriber and a media backend
#[derive(Clone)]
pub struct CaptionPipeline {
    backend: Arc<dyn MediaBackend>,
    transcriber: Arc<dyn Transcriber>,
    compositor: OverlayCompositor,
    style: OverlayStyle,
    settings: PipelineSettings,
}

impl CaptionPipeline {
    pub fn new(
        backend: Arc<dyn MediaBackend>,
        transcriber: Arc<dyn Transcriber>,
        style: OverlayStyle,
        encode: RenderSettings,
        settings: PipelineSettings,
    ) -> Self {
        let compositor = OverlayCompositor::new(backend.clone(), style.clone(), encode);
        Self {
            backend,
            transcriber,
            compositor,
            style,
            settings,
        }
    }

    /// Writes the captioned version of `clip` next to it
    pub async fn run(&self, clip: &Path) -> Result<CaptionOutcome, PipelineFailure> {
        let artifacts = ClipArtifacts::for_clip(clip);
        let mut guard = ArtifactGuard::new();
        guard.track(&artifacts.transcript);
        guard.track(&artifacts.canvas);

        info!(stage = %PipelineStage::Transcribe, "Transcribing {}", clip.display());
        self.transcribe(&artifacts)
            .await
            .map_err(PipelineFailure::at(PipelineStage::Transcribe))?;

        let cues = {
            let content = tokio::fs::read_to_string(&artifacts.transcript)
                .await
                .map_err(|e| PipelineFailure::at(PipelineStage::ParseCues)(e.into()))?;
            let cues = parse_cues(&content);
            if cues.is_empty() {
                return Err(PipelineFailure {
                    stage: PipelineStage::ParseCues,
                    error: CaptionError::InvalidInput("Transcript contains no cues".to_string()),
                });
            }
            cues
        };
        let cue_count = cues.len();
        info!(stage = %PipelineStage::ParseCues, "Parsed {} cues", cue_count);

        let frame_count = self
            .render_canvas(clip, &artifacts.canvas, cues)
            .await
            .map_err(PipelineFailure::at(PipelineStage::RenderCanvas))?;
        info!(stage = %PipelineStage::RenderCanvas, "Rendered {} canvas frames", frame_count);

        // From here on a failure leaves a partial output behind
        guard.track(&artifacts.output);
        self.compositor
            .composite(clip, &artifacts.canvas, &artifacts.output)
            .await
            .map_err(PipelineFailure::at(PipelineStage::Composite))?;

        guard.keep(&artifacts.output);
        let transcript = if self.settings.keep_transcript {
            guard.keep(&artifacts.transcript);
            Some(artifacts.transcript.clone())
        } else {
            None
        };
        debug!(stage = %PipelineStage::Cleanup, "Removing {} artifacts", guard.tracked().len());
        guard.cleanup();

        info!("Captioned clip written to {}", artifacts.output.display());
        Ok(CaptionOutcome {
            output: artifacts.output,
            transcript,
            cue_count,
            frame_count,
        })
    }

    async fn transcribe(&self, artifacts: &ClipArtifacts) -> Result<(), CaptionError> {
        let srt = self.transcriber.transcribe(&artifacts.clip).await?;
        tokio::fs::write(&artifacts.transcript, srt).await?;
        Ok(())
    }

    /// Renders one canvas frame per source frame and streams them to the
    /// encoder in index order. Returns the number of frames written.
    async fn render_canvas(
        &self,
        clip: &Path,
        canvas_path: &Path,
        cues: Vec<crate::core::captions::Cue>,
    ) -> Result<u64, CaptionError> {
        let info = self.backend.probe(clip).await?;
        let video = info
            .video
            .as_ref()
            .ok_or_else(|| CaptionError::InvalidInput(format!("{} has no video stream", clip.display())))?;
        let total = info.video_frame_count().ok_or_else(|| {
            CaptionError::InvalidInput(format!("Cannot determine frame count of {}", clip.display()))
        })?;

        let renderer = Arc::new(CaptionRenderer::new(
            cues,
            video.fps,
            video.size(),
            self.style.clone(),
        )?);

        let spec = CanvasStreamSpec::new(canvas_path, video.size(), video.frame_rate.clone());
        let mut sink = self.backend.open_canvas_stream(&spec).await?;

        let batch = self.settings.render_batch_size.max(1) as u64;
        let mut start = 0u64;
        while start < total {
            let end = (start + batch).min(total);
            let batch_renderer = renderer.clone();
            let frames = tokio::task::spawn_blocking(move || {
                batch_renderer.render_batch(start as Frame..end as Frame)
            })
            .await
            .map_err(|e| CaptionError::RenderFailed(format!("Render task failed: {}", e)))?;

            for frame in &frames {
                sink.write_frame(frame).await?;
            }
            start = end;
        }

        let written = sink.finish().await?;
        if written != total {
            return Err(CaptionError::RenderFailed(format!(
                "Canvas has {} frames, expected {}",
                written, total
            )));
        }
        Ok(written)
    }
}
