//! Media Backend Traits
//!
//! The seams between the shorts pipeline and the transcoder. `FFmpegRunner`
//! is the production implementation; tests substitute in-memory fakes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{FFmpegResult, MediaInfo, RenderSettings};
use crate::core::captions::CanvasFrame;
use crate::core::{Size2D, TimeSec};

/// One window of the source to cut, transform and encode as a clip
#[derive(Debug, Clone)]
pub struct SegmentCut {
    pub source: PathBuf,
    pub output: PathBuf,
    pub start_sec: TimeSec,
    pub duration_sec: TimeSec,
    /// `-vf` chain applied to the window (crop, scale, fps, mirror)
    pub video_filter: String,
    pub encode: RenderSettings,
}

/// Parameters for the intermediate caption-canvas video
#[derive(Debug, Clone)]
pub struct CanvasStreamSpec {
    pub output: PathBuf,
    pub size: Size2D,
    /// Frame rate as ffmpeg expects it, preferably the exact rational
    /// reported by ffprobe (e.g. `30000/1001`)
    pub frame_rate: String,
}

impl CanvasStreamSpec {
    pub fn new(output: impl Into<PathBuf>, size: Size2D, frame_rate: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            size,
            frame_rate: frame_rate.into(),
        }
    }
}

/// A chroma-key overlay of `canvas` on top of `source`
#[derive(Debug, Clone)]
pub struct OverlayJob {
    pub source: PathBuf,
    pub canvas: PathBuf,
    pub output: PathBuf,
    /// `-filter_complex` graph producing the `[out]` label
    pub filter_graph: String,
    pub encode: RenderSettings,
}

/// Media operations the pipeline needs from a transcoder
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Reads container and stream metadata
    async fn probe(&self, input: &Path) -> FFmpegResult<MediaInfo>;

    /// Cuts and re-encodes one segment
    async fn cut_segment(&self, cut: &SegmentCut) -> FFmpegResult<()>;

    /// Starts an encoder that accepts canvas frames in order
    async fn open_canvas_stream(&self, spec: &CanvasStreamSpec)
        -> FFmpegResult<Box<dyn CanvasSink>>;

    /// Composites the canvas over the source, keeping the source audio
    async fn composite_overlay(&self, job: &OverlayJob) -> FFmpegResult<()>;
}

/// Sequential consumer of rendered canvas frames
#[async_trait]
pub trait CanvasSink: Send {
    /// Appends one frame; frames must arrive in index order
    async fn write_frame(&mut self, frame: &CanvasFrame) -> FFmpegResult<()>;

    /// Flushes the stream and returns the number of frames written
    async fn finish(self: Box<Self>) -> FFmpegResult<u64>;
}
