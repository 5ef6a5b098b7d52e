//! Caption Overlay Module
//!
//! Turns a transcript into burned-in captions for one clip:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Caption Overlay                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  formats.rs    - Timed-cue (SRT block) parsing and export       │
//! │  timing.rs     - Cue time ↔ frame index mapping                 │
//! │  font.rs       - Embedded bitmap font                           │
//! │  canvas.rs     - RGB24 caption-layer frames                     │
//! │  renderer.rs   - Per-frame caption canvas rendering             │
//! │  compositor.rs - Chroma-key overlay of canvas onto clip         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use crate::core::captions::{parse_cues, CaptionRenderer, OverlayStyle};
//!
//! let cues = parse_cues(&std::fs::read_to_string("clip.srt")?);
//! let renderer = CaptionRenderer::new(cues, 30.0, Size2D::new(1080, 1920), OverlayStyle::default())?;
//! let first_second = renderer.render_batch(0..30);
//! ```

mod canvas;
mod compositor;
mod font;
mod formats;
mod models;
mod renderer;
mod timing;

pub use canvas::{CanvasFrame, BYTES_PER_PIXEL};
pub use compositor::{overlay_filter_graph, validate_streams, OverlayCompositor};
pub use font::BitmapFont;
pub use formats::{export_srt, format_srt_timestamp, parse_cues, parse_srt_timestamp, ParseError};
pub use models::{Cue, OverlayStyle, VerticalOffset};
pub use renderer::CaptionRenderer;
pub use timing::{frame_count, frame_to_seconds, seconds_to_frame, FrameRange};

use crate::core::ffmpeg::FFmpegError;
use crate::core::transcription::TranscriptionError;

// =============================================================================
// Errors
// =============================================================================

/// Failures that abort captioning of a single clip
#[derive(Debug, thiserror::Error)]
pub enum CaptionError {
    #[error("Transcription failed: {0}")]
    Transcription(#[from] TranscriptionError),

    #[error("Canvas does not match source {field}: source {source_value}, canvas {canvas_value}")]
    StreamMismatch {
        field: &'static str,
        source_value: String,
        canvas_value: String,
    },

    #[error("Media error: {0}")]
    Media(#[from] FFmpegError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Rendering failed: {0}")]
    RenderFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CaptionResult<T> = Result<T, CaptionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_mismatch_display() {
        let err = CaptionError::StreamMismatch {
            field: "width",
            source_value: "1080".to_string(),
            canvas_value: "720".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Canvas does not match source width: source 1080, canvas 720"
        );
    }

    #[test]
    fn test_transcription_error_converts() {
        let err: CaptionError = TranscriptionError::EmptyTranscript.into();
        assert!(matches!(err, CaptionError::Transcription(_)));
    }
}
