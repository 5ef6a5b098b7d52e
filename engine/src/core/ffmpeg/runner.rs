//! FFmpeg Runner Module
//!
//! Executes ffmpeg/ffprobe subprocesses for probing, segment cutting, canvas
//! encoding and overlay compositing.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{
    CanvasSink, CanvasStreamSpec, FFmpegCanvasStream, FFmpegError, FFmpegInfo, FFmpegResult,
    MediaBackend, OverlayJob, SegmentCut,
};
use crate::core::process::media_command;
use crate::core::Size2D;

/// Media information extracted by FFprobe
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MediaInfo {
    /// Duration in seconds
    pub duration_sec: f64,
    /// Video stream info (if present)
    pub video: Option<VideoStreamInfo>,
    /// Audio stream info (if present)
    pub audio: Option<AudioStreamInfo>,
    /// Container format
    pub format: String,
    /// File size in bytes
    pub size_bytes: u64,
}

impl MediaInfo {
    /// Number of video frames, from the stream header when ffprobe reports
    /// it, otherwise estimated from duration and frame rate
    pub fn video_frame_count(&self) -> Option<u64> {
        let video = self.video.as_ref()?;
        if let Some(count) = video.frame_count {
            return Some(count);
        }
        let duration = video.duration_sec.unwrap_or(self.duration_sec);
        if duration <= 0.0 || video.fps <= 0.0 {
            return None;
        }
        Some((duration * video.fps).round_ties_even() as u64)
    }
}

/// Video stream information
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VideoStreamInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (frames per second)
    pub fps: f64,
    /// Frame rate exactly as ffprobe reported it (e.g. "30000/1001")
    pub frame_rate: String,
    /// Frame count from the stream header (`nb_frames`), if known
    pub frame_count: Option<u64>,
    /// Stream duration, if reported separately from the container
    pub duration_sec: Option<f64>,
    /// Codec name (e.g., "h264", "vp9")
    pub codec: String,
    /// Pixel format
    pub pixel_format: String,
    /// Bitrate in bits/s (if available)
    pub bitrate: Option<u64>,
}

impl VideoStreamInfo {
    pub fn size(&self) -> Size2D {
        Size2D::new(self.width, self.height)
    }
}

/// Audio stream information
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AudioStreamInfo {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u8,
    /// Codec name (e.g., "aac", "mp3")
    pub codec: String,
    /// Bitrate in bits/s (if available)
    pub bitrate: Option<u64>,
}

/// Encoder settings for cut clips and composited output
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    /// Output width
    pub width: u32,
    /// Output height
    pub height: u32,
    /// Output frame rate
    pub fps: f64,
    /// Video codec (e.g., "libx264", "libx265")
    pub video_codec: String,
    /// Audio codec (e.g., "aac", "libopus")
    pub audio_codec: String,
    /// Audio bitrate (e.g., "192k", "256k")
    pub audio_bitrate: String,
    /// Preset (for x264/x265: ultrafast, superfast, fast, medium, slow)
    pub preset: String,
    /// CRF value for quality-based encoding (0-51, lower is better)
    pub crf: u8,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::shorts_1080p()
    }
}

impl RenderSettings {
    /// Preset for Shorts/TikTok (vertical 1080p)
    pub fn shorts_1080p() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 30.0,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
            preset: "medium".to_string(),
            crf: 23,
        }
    }

    pub fn size(&self) -> Size2D {
        Size2D::new(self.width, self.height)
    }

    fn video_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            self.video_codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
        ]
    }
}

/// FFmpeg Runner for executing video processing commands
#[derive(Clone)]
pub struct FFmpegRunner {
    info: Arc<FFmpegInfo>,
}

impl FFmpegRunner {
    /// Create a new FFmpegRunner from detected FFmpeg installation
    pub fn new(info: FFmpegInfo) -> Self {
        Self {
            info: Arc::new(info),
        }
    }

    /// Get the FFmpeg info
    pub fn info(&self) -> &FFmpegInfo {
        &self.info
    }

    /// Runs ffmpeg to completion, surfacing stderr on failure
    async fn run_ffmpeg(&self, args: &[String], context: &str) -> FFmpegResult<()> {
        debug!("{}: ffmpeg {:?}", context, args);

        let output = media_command(&self.info.ffmpeg_path)
            .args(args)
            .output()
            .await
            .map_err(FFmpegError::ProcessError)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FFmpegError::ExecutionFailed(format!(
                "{} failed: {}",
                context,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

fn require_input(input: &Path) -> FFmpegResult<()> {
    if !input.exists() {
        return Err(FFmpegError::InvalidInput(format!(
            "Input file does not exist: {}",
            input.display()
        )));
    }
    Ok(())
}

fn prepare_output(output: &Path) -> FFmpegResult<()> {
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            FFmpegError::OutputError(format!("Failed to create output directory: {}", e))
        })?;
    }
    Ok(())
}

#[async_trait]
impl MediaBackend for FFmpegRunner {
    async fn probe(&self, input: &Path) -> FFmpegResult<MediaInfo> {
        require_input(input)?;

        // Run ffprobe with JSON output
        let output = media_command(&self.info.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                &input.to_string_lossy(),
            ])
            .output()
            .await
            .map_err(FFmpegError::ProcessError)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FFmpegError::ProbeError(format!("FFprobe failed: {}", stderr)));
        }

        let json_str = String::from_utf8_lossy(&output.stdout);
        parse_probe_output(&json_str)
    }

    async fn cut_segment(&self, cut: &SegmentCut) -> FFmpegResult<()> {
        require_input(&cut.source)?;
        prepare_output(&cut.output)?;
        self.run_ffmpeg(&segment_args(cut), "Segment cut").await
    }

    async fn open_canvas_stream(
        &self,
        spec: &CanvasStreamSpec,
    ) -> FFmpegResult<Box<dyn CanvasSink>> {
        let stream = FFmpegCanvasStream::spawn(&self.info.ffmpeg_path, spec)?;
        Ok(Box::new(stream))
    }

    async fn composite_overlay(&self, job: &OverlayJob) -> FFmpegResult<()> {
        require_input(&job.source)?;
        require_input(&job.canvas)?;
        prepare_output(&job.output)?;
        self.run_ffmpeg(&overlay_args(job), "Overlay composite").await
    }
}

/// Arguments for cutting one window: seek, trim, filter, re-encode
fn segment_args(cut: &SegmentCut) -> Vec<String> {
    let mut args = vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        // -ss before -i for fast seeking
        "-ss".to_string(),
        format!("{:.3}", cut.start_sec),
        "-i".to_string(),
        cut.source.to_string_lossy().to_string(),
        "-t".to_string(),
        format!("{:.3}", cut.duration_sec),
    ];

    if !cut.video_filter.is_empty() {
        args.push("-vf".to_string());
        args.push(cut.video_filter.clone());
    }

    args.extend(cut.encode.video_args());
    args.extend([
        "-c:a".to_string(),
        cut.encode.audio_codec.clone(),
        "-b:a".to_string(),
        cut.encode.audio_bitrate.clone(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        "-y".to_string(),
        cut.output.to_string_lossy().to_string(),
    ]);
    args
}

/// Arguments for keying the canvas (input 1) over the clip (input 0)
fn overlay_args(job: &OverlayJob) -> Vec<String> {
    let mut args = vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        job.source.to_string_lossy().to_string(),
        "-i".to_string(),
        job.canvas.to_string_lossy().to_string(),
        "-filter_complex".to_string(),
        job.filter_graph.clone(),
        "-map".to_string(),
        "[out]".to_string(),
        // Audio is optional so silent clips still composite
        "-map".to_string(),
        "0:a?".to_string(),
    ];
    args.extend(job.encode.video_args());
    args.extend([
        "-c:a".to_string(),
        "copy".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        "-y".to_string(),
        job.output.to_string_lossy().to_string(),
    ]);
    args
}

/// Parses an ffprobe frame rate such as "30/1", "30000/1001" or "25"
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den <= 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Parse FFprobe JSON output
pub fn parse_probe_output(json_str: &str) -> FFmpegResult<MediaInfo> {
    let json: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| FFmpegError::ParseError(format!("Failed to parse FFprobe output: {}", e)))?;

    // Parse format information
    let format = json
        .get("format")
        .ok_or_else(|| FFmpegError::ParseError("Missing format info".to_string()))?;

    let duration_sec = format
        .get("duration")
        .and_then(|d| d.as_str())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    let size_bytes = format
        .get("size")
        .and_then(|s| s.as_str())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    let format_name = format
        .get("format_name")
        .and_then(|f| f.as_str())
        .unwrap_or("unknown")
        .to_string();

    // Parse streams
    let streams = json
        .get("streams")
        .and_then(|s| s.as_array())
        .cloned()
        .unwrap_or_default();

    let mut video_info: Option<VideoStreamInfo> = None;
    let mut audio_info: Option<AudioStreamInfo> = None;

    for stream in streams {
        let codec_type = stream.get("codec_type").and_then(|c| c.as_str());

        match codec_type {
            Some("video") if video_info.is_none() => {
                video_info = Some(parse_video_stream(&stream));
            }
            Some("audio") if audio_info.is_none() => {
                audio_info = Some(parse_audio_stream(&stream));
            }
            _ => {}
        }
    }

    Ok(MediaInfo {
        duration_sec,
        video: video_info,
        audio: audio_info,
        format: format_name,
        size_bytes,
    })
}

fn parse_video_stream(stream: &serde_json::Value) -> VideoStreamInfo {
    let width = stream
        .get("width")
        .and_then(|w| w.as_u64())
        .unwrap_or(0) as u32;

    let height = stream
        .get("height")
        .and_then(|h| h.as_u64())
        .unwrap_or(0) as u32;

    // r_frame_rate is the base rate; avg_frame_rate can be 0/0 for some muxers
    let (frame_rate, fps) = ["r_frame_rate", "avg_frame_rate"]
        .iter()
        .filter_map(|key| stream.get(*key).and_then(|f| f.as_str()))
        .find_map(|s| parse_frame_rate(s).map(|fps| (s.to_string(), fps)))
        .unwrap_or_else(|| ("30".to_string(), 30.0));

    let frame_count = stream
        .get("nb_frames")
        .and_then(|n| n.as_str())
        .and_then(|s| s.parse::<u64>().ok());

    let duration_sec = stream
        .get("duration")
        .and_then(|d| d.as_str())
        .and_then(|s| s.parse::<f64>().ok());

    let codec = stream
        .get("codec_name")
        .and_then(|c| c.as_str())
        .unwrap_or("unknown")
        .to_string();

    let pixel_format = stream
        .get("pix_fmt")
        .and_then(|p| p.as_str())
        .unwrap_or("unknown")
        .to_string();

    let bitrate = stream
        .get("bit_rate")
        .and_then(|b| b.as_str())
        .and_then(|s| s.parse::<u64>().ok());

    VideoStreamInfo {
        width,
        height,
        fps,
        frame_rate,
        frame_count,
        duration_sec,
        codec,
        pixel_format,
        bitrate,
    }
}

fn parse_audio_stream(stream: &serde_json::Value) -> AudioStreamInfo {
    let sample_rate = stream
        .get("sample_rate")
        .and_then(|s| s.as_str())
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(44100);

    let channels = stream
        .get("channels")
        .and_then(|c| c.as_u64())
        .unwrap_or(2) as u8;

    let codec = stream
        .get("codec_name")
        .and_then(|c| c.as_str())
        .unwrap_or("unknown")
        .to_string();

    let bitrate = stream
        .get("bit_rate")
        .and_then(|b| b.as_str())
        .and_then(|s| s.parse::<u64>().ok());

    AudioStreamInfo {
        sample_rate,
        channels,
        codec,
        bitrate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ffmpeg::detect_system_ffmpeg;
    use std::path::PathBuf;

    #[test]
    fn test_render_settings_default() {
        let settings = RenderSettings::default();
        assert_eq!(settings.width, 1080);
        assert_eq!(settings.height, 1920);
        assert_eq!(settings.video_codec, "libx264");
        assert_eq!(settings.size(), Size2D::new(1080, 1920));
    }

    #[test]
    fn test_parse_probe_output_video() {
        let json = r#"{
            "format": {
                "duration": "10.5",
                "size": "1048576",
                "format_name": "mov,mp4,m4a,3gp,3g2,mj2"
            },
            "streams": [
                {
                    "codec_type": "video",
                    "codec_name": "h264",
                    "width": 1920,
                    "height": 1080,
                    "r_frame_rate": "30/1",
                    "nb_frames": "315",
                    "pix_fmt": "yuv420p"
                },
                {
                    "codec_type": "audio",
                    "codec_name": "aac",
                    "sample_rate": "48000",
                    "channels": 2
                }
            ]
        }"#;

        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.duration_sec, 10.5);
        assert_eq!(info.size_bytes, 1048576);
        assert_eq!(info.video_frame_count(), Some(315));
        assert!(info.audio.is_some());

        let video = info.video.unwrap();
        assert_eq!(video.size(), Size2D::new(1920, 1080));
        assert_eq!(video.fps, 30.0);
        assert_eq!(video.frame_rate, "30/1");
        assert_eq!(video.codec, "h264");

        let audio = info.audio.unwrap();
        assert_eq!(audio.sample_rate, 48000);
        assert_eq!(audio.channels, 2);
        assert_eq!(audio.codec, "aac");
    }

    #[test]
    fn test_parse_fractional_framerate() {
        let json = r#"{
            "format": {
                "duration": "1.0",
                "size": "1000",
                "format_name": "mp4"
            },
            "streams": [
                {
                    "codec_type": "video",
                    "codec_name": "h264",
                    "width": 1920,
                    "height": 1080,
                    "r_frame_rate": "30000/1001",
                    "pix_fmt": "yuv420p"
                }
            ]
        }"#;

        let info = parse_probe_output(json).unwrap();
        let video = info.video.as_ref().unwrap();
        // 30000/1001 ≈ 29.97
        assert!((video.fps - 29.97).abs() < 0.01);
        assert_eq!(video.frame_rate, "30000/1001");
        // No nb_frames: estimated from duration
        assert_eq!(info.video_frame_count(), Some(30));
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
        assert_eq!(parse_frame_rate("-30/1"), None);
    }

    #[test]
    fn test_probe_without_video_has_no_frame_count() {
        let json = r#"{"format": {"duration": "3.0"}, "streams": [{"codec_type": "audio"}]}"#;
        let info = parse_probe_output(json).unwrap();
        assert!(info.video.is_none());
        assert_eq!(info.video_frame_count(), None);
    }

    #[test]
    fn test_probe_output_rejects_garbage() {
        assert!(matches!(
            parse_probe_output("not json"),
            Err(FFmpegError::ParseError(_))
        ));
        assert!(parse_probe_output("{}").is_err());
    }

    #[test]
    fn test_segment_args() {
        let cut = SegmentCut {
            source: PathBuf::from("/in/source.mp4"),
            output: PathBuf::from("/out/clip.mp4"),
            start_sec: 90.0,
            duration_sec: 60.0,
            video_filter: "crop=810:1080:555:0,scale=1080:1920".to_string(),
            encode: RenderSettings::default(),
        };
        let args = segment_args(&cut);
        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();

        assert_eq!(args[pos("-ss") + 1], "90.000");
        assert_eq!(args[pos("-t") + 1], "60.000");
        assert_eq!(args[pos("-vf") + 1], cut.video_filter);
        assert_eq!(args[pos("-c:a") + 1], "aac");
        assert!(pos("-ss") < pos("-i"));
        assert_eq!(args.last().unwrap(), "/out/clip.mp4");
    }

    #[test]
    fn test_overlay_args_copy_optional_audio() {
        let job = OverlayJob {
            source: PathBuf::from("clip.mp4"),
            canvas: PathBuf::from("clip.canvas.mp4"),
            output: PathBuf::from("clip_with_captions.mp4"),
            filter_graph: "[1:v]colorkey=0x000000:0.1:0.1[ckout];[0:v][ckout]overlay[out]"
                .to_string(),
            encode: RenderSettings::default(),
        };
        let args = overlay_args(&job);

        let inputs: Vec<&String> = args
            .iter()
            .enumerate()
            .filter(|(i, _)| *i > 0 && args[i - 1] == "-i")
            .map(|(_, a)| a)
            .collect();
        assert_eq!(inputs, vec!["clip.mp4", "clip.canvas.mp4"]);

        let maps: Vec<&String> = args
            .iter()
            .enumerate()
            .filter(|(i, _)| *i > 0 && args[i - 1] == "-map")
            .map(|(_, a)| a)
            .collect();
        assert_eq!(maps, vec!["[out]", "0:a?"]);

        let audio_codec = args.iter().position(|a| a == "-c:a").unwrap();
        assert_eq!(args[audio_codec + 1], "copy");
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let info = match detect_system_ffmpeg() {
            Ok(info) => info,
            Err(_) => {
                println!("FFmpeg not available, skipping");
                return;
            }
        };
        let runner = FFmpegRunner::new(info);
        let result = runner.probe(Path::new("/definitely/not/here.mp4")).await;
        assert!(matches!(result, Err(FFmpegError::InvalidInput(_))));
    }
}
