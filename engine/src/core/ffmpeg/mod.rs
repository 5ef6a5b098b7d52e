//! FFmpeg Integration Module
//!
//! Provides the media side of the shorts pipeline:
//! - Probing clips with ffprobe
//! - Cutting, cropping and rescaling segments
//! - Encoding the caption canvas from raw RGB frames piped over stdin
//! - Chroma-key compositing of the canvas onto the clip
//!
//! Everything goes through the [`MediaBackend`] trait so the caption pipeline
//! and the segmentation driver can be exercised without real binaries.

mod backend;
mod canvas_stream;
mod detection;
mod runner;

pub use backend::{CanvasSink, CanvasStreamSpec, MediaBackend, OverlayJob, SegmentCut};
pub use canvas_stream::FFmpegCanvasStream;
pub use detection::*;
pub use runner::{
    parse_frame_rate, parse_probe_output, AudioStreamInfo, FFmpegRunner, MediaInfo,
    RenderSettings, VideoStreamInfo,
};

/// FFmpeg-related error types
#[derive(Debug, thiserror::Error)]
pub enum FFmpegError {
    #[error("FFmpeg not found. Please install FFmpeg or set SHORTREEL_FFMPEG_DIR.")]
    NotFound,

    #[error("FFmpeg execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Invalid input file: {0}")]
    InvalidInput(String),

    #[error("Output path error: {0}")]
    OutputError(String),

    #[error("FFprobe error: {0}")]
    ProbeError(String),

    #[error("Process error: {0}")]
    ProcessError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Canvas stream closed after {written} frames: {reason}")]
    StreamClosed { written: u64, reason: String },
}

pub type FFmpegResult<T> = Result<T, FFmpegError>;
