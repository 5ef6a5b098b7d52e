//! Overlay Compositor
//!
//! Keys the canvas background out of the caption layer and lays the remaining
//! text over the clip. Both streams are probed first; a canvas that does not
//! line up with its source frame for frame is rejected before the transcoder
//! runs.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use super::{CaptionError, CaptionResult, OverlayStyle};
use crate::core::ffmpeg::{MediaBackend, MediaInfo, OverlayJob, RenderSettings, VideoStreamInfo};

/// Largest frame-rate difference still treated as the same rate
const FPS_TOLERANCE: f64 = 0.01;

/// Builds the `-filter_complex` graph: input 1 (canvas) is keyed on the
/// background color and overlaid on input 0 (clip), producing `[out]`.
pub fn overlay_filter_graph(style: &OverlayStyle) -> String {
    format!(
        "[1:v]colorkey={}:{}:{}[ckout];[0:v][ckout]overlay[out]",
        style.background_color.to_ffmpeg_hex(),
        style.chroma_tolerance,
        style.chroma_blend
    )
}

/// Checks that the canvas matches the source in geometry, rate and length
pub fn validate_streams(source: &MediaInfo, canvas: &MediaInfo) -> CaptionResult<()> {
    let source_video = video_stream(source, "source")?;
    let canvas_video = video_stream(canvas, "canvas")?;

    if source_video.width != canvas_video.width {
        return Err(mismatch("width", source_video.width, canvas_video.width));
    }
    if source_video.height != canvas_video.height {
        return Err(mismatch("height", source_video.height, canvas_video.height));
    }
    if (source_video.fps - canvas_video.fps).abs() > FPS_TOLERANCE {
        return Err(mismatch("frame rate", source_video.fps, canvas_video.fps));
    }

    // Header counts when present, otherwise duration × fps
    let source_frames = source.video_frame_count();
    let canvas_frames = canvas.video_frame_count();
    match (source_frames, canvas_frames) {
        (Some(s), Some(c)) if s == c => Ok(()),
        (s, c) => Err(mismatch("frame count", frames_label(s), frames_label(c))),
    }
}

fn video_stream<'a>(info: &'a MediaInfo, label: &str) -> CaptionResult<&'a VideoStreamInfo> {
    info.video
        .as_ref()
        .ok_or_else(|| CaptionError::InvalidInput(format!("The {} has no video stream", label)))
}

fn frames_label(frames: Option<u64>) -> String {
    frames.map_or_else(|| "unknown".to_string(), |n| n.to_string())
}

fn mismatch(field: &'static str, source: impl ToString, canvas: impl ToString) -> CaptionError {
    CaptionError::StreamMismatch {
        field,
        source_value: source.to_string(),
        canvas_value: canvas.to_string(),
    }
}

/// Composites rendered canvases onto their clips through a [`MediaBackend`]
#[derive(Clone)]
pub struct OverlayCompositor {
    backend: Arc<dyn MediaBackend>,
    style: OverlayStyle,
    encode: RenderSettings,
}

impl OverlayCompositor {
    pub fn new(backend: Arc<dyn MediaBackend>, style: OverlayStyle, encode: RenderSettings) -> Self {
        Self {
            backend,
            style,
            encode,
        }
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Writes `output` as `source` with `canvas` keyed on top, keeping the
    /// source audio untouched.
    pub async fn composite(&self, source: &Path, canvas: &Path, output: &Path) -> CaptionResult<()> {
        let source_info = self.backend.probe(source).await?;
        let canvas_info = self.backend.probe(canvas).await?;
        validate_streams(&source_info, &canvas_info)?;

        let job = OverlayJob {
            source: source.to_path_buf(),
            canvas: canvas.to_path_buf(),
            output: output.to_path_buf(),
            filter_graph: overlay_filter_graph(&self.style),
            encode: self.encode.clone(),
        };

        info!("Compositing captions onto {}", source.display());
        self.backend.composite_overlay(&job).await?;
        Ok(())
    }
}
