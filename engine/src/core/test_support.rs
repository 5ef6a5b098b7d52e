//! In-memory media and transcription fakes shared by pipeline tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::core::captions::CanvasFrame;
use crate::core::ffmpeg::{
    CanvasSink, CanvasStreamSpec, FFmpegError, FFmpegResult, MediaBackend, MediaInfo,
    OverlayJob, SegmentCut, VideoStreamInfo,
};
use crate::core::transcription::{Transcriber, TranscriptionError, TranscriptionResult};
use crate::core::Rgb;

/// Probe result for a video-only file
pub fn video_info(width: u32, height: u32, fps: f64, frame_count: Option<u64>) -> MediaInfo {
    let duration_sec = frame_count.map(|n| n as f64 / fps).unwrap_or(10.0);
    MediaInfo {
        duration_sec,
        video: Some(VideoStreamInfo {
            width,
            height,
            fps,
            frame_rate: format!("{}", fps),
            frame_count,
            duration_sec: Some(duration_sec),
            codec: "h264".to_string(),
            pixel_format: "yuv420p".to_string(),
            bitrate: None,
        }),
        audio: None,
        format: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
        size_bytes: 0,
    }
}

/// What a fake canvas sink received
#[derive(Debug, Clone)]
pub struct CanvasRecord {
    pub output: PathBuf,
    pub spec_frame_rate: String,
    /// Per written frame: whether anything but the black background was drawn
    pub lit: Vec<bool>,
    pub finished: bool,
}

impl CanvasRecord {
    pub fn lit_frames(&self) -> Vec<usize> {
        self.lit
            .iter()
            .enumerate()
            .filter(|(_, lit)| **lit)
            .map(|(i, _)| i)
            .collect()
    }
}

type ProbeMap = Arc<Mutex<HashMap<PathBuf, MediaInfo>>>;

/// [`MediaBackend`] that records calls and writes placeholder files
pub struct FakeMediaBackend {
    default_probe: Mutex<MediaInfo>,
    probes: ProbeMap,
    cuts: Mutex<Vec<SegmentCut>>,
    composites: Mutex<Vec<OverlayJob>>,
    canvases: Arc<Mutex<Vec<CanvasRecord>>>,
    failing_cuts: Mutex<HashSet<String>>,
    fail_composite: AtomicBool,
    canvas_fail_after: Mutex<Option<u64>>,
}

impl FakeMediaBackend {
    /// Every path not registered with [`Self::set_probe`] probes as `default_probe`
    pub fn new(default_probe: MediaInfo) -> Self {
        Self {
            default_probe: Mutex::new(default_probe),
            probes: Arc::new(Mutex::new(HashMap::new())),
            cuts: Mutex::new(Vec::new()),
            composites: Mutex::new(Vec::new()),
            canvases: Arc::new(Mutex::new(Vec::new())),
            failing_cuts: Mutex::new(HashSet::new()),
            fail_composite: AtomicBool::new(false),
            canvas_fail_after: Mutex::new(None),
        }
    }

    pub fn set_probe(&self, path: impl Into<PathBuf>, info: MediaInfo) {
        self.probes.lock().unwrap().insert(path.into(), info);
    }

    pub fn set_default_probe(&self, info: MediaInfo) {
        *self.default_probe.lock().unwrap() = info;
    }

    /// Cuts whose output file name contains `fragment` fail
    pub fn fail_cuts_containing(&self, fragment: &str) {
        self.failing_cuts.lock().unwrap().insert(fragment.to_string());
    }

    pub fn fail_composites(&self) {
        self.fail_composite.store(true, Ordering::SeqCst);
    }

    /// Canvas sinks reject writes once `frames` have been accepted
    pub fn fail_canvas_after(&self, frames: u64) {
        *self.canvas_fail_after.lock().unwrap() = Some(frames);
    }

    pub fn cuts(&self) -> Vec<SegmentCut> {
        self.cuts.lock().unwrap().clone()
    }

    pub fn composites(&self) -> Vec<OverlayJob> {
        self.composites.lock().unwrap().clone()
    }

    pub fn canvases(&self) -> Vec<CanvasRecord> {
        self.canvases.lock().unwrap().clone()
    }
}

/// Writes a stand-in file when the target directory exists
fn touch(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && parent.is_dir() {
            let _ = std::fs::write(path, contents);
        }
    }
}

#[async_trait]
impl MediaBackend for FakeMediaBackend {
    async fn probe(&self, input: &Path) -> FFmpegResult<MediaInfo> {
        let registered = self.probes.lock().unwrap().get(input).cloned();
        Ok(registered.unwrap_or_else(|| self.default_probe.lock().unwrap().clone()))
    }

    async fn cut_segment(&self, cut: &SegmentCut) -> FFmpegResult<()> {
        let name = cut
            .output
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let fails = self
            .failing_cuts
            .lock()
            .unwrap()
            .iter()
            .any(|fragment| name.contains(fragment));
        if fails {
            return Err(FFmpegError::ExecutionFailed(format!("cut of {} failed", name)));
        }

        touch(&cut.output, b"clip");
        self.cuts.lock().unwrap().push(cut.clone());
        Ok(())
    }

    async fn open_canvas_stream(
        &self,
        spec: &CanvasStreamSpec,
    ) -> FFmpegResult<Box<dyn CanvasSink>> {
        let mut canvases = self.canvases.lock().unwrap();
        canvases.push(CanvasRecord {
            output: spec.output.clone(),
            spec_frame_rate: spec.frame_rate.clone(),
            lit: Vec::new(),
            finished: false,
        });
        touch(&spec.output, b"");

        Ok(Box::new(FakeCanvasSink {
            index: canvases.len() - 1,
            records: self.canvases.clone(),
            probes: self.probes.clone(),
            spec: spec.clone(),
            fail_after: *self.canvas_fail_after.lock().unwrap(),
            written: 0,
        }))
    }

    async fn composite_overlay(&self, job: &OverlayJob) -> FFmpegResult<()> {
        if self.fail_composite.load(Ordering::SeqCst) {
            return Err(FFmpegError::ExecutionFailed("overlay failed".to_string()));
        }
        touch(&job.output, b"captioned");
        self.composites.lock().unwrap().push(job.clone());
        Ok(())
    }
}

struct FakeCanvasSink {
    index: usize,
    records: Arc<Mutex<Vec<CanvasRecord>>>,
    probes: ProbeMap,
    spec: CanvasStreamSpec,
    fail_after: Option<u64>,
    written: u64,
}

#[async_trait]
impl CanvasSink for FakeCanvasSink {
    async fn write_frame(&mut self, frame: &CanvasFrame) -> FFmpegResult<()> {
        if self.fail_after.is_some_and(|limit| self.written >= limit) {
            return Err(FFmpegError::StreamClosed {
                written: self.written,
                reason: "encoder exited".to_string(),
            });
        }
        if frame.size() != self.spec.size {
            return Err(FFmpegError::InvalidInput("frame size mismatch".to_string()));
        }

        self.records.lock().unwrap()[self.index]
            .lit
            .push(frame.has_pixels_other_than(Rgb::black()));
        self.written += 1;
        Ok(())
    }

    async fn finish(self: Box<Self>) -> FFmpegResult<u64> {
        self.records.lock().unwrap()[self.index].finished = true;

        let fps = crate::core::ffmpeg::parse_frame_rate(&self.spec.frame_rate).unwrap_or(30.0);
        self.probes.lock().unwrap().insert(
            self.spec.output.clone(),
            video_info(
                self.spec.size.width,
                self.spec.size.height,
                fps,
                Some(self.written),
            ),
        );
        Ok(self.written)
    }
}

/// [`Transcriber`] returning canned SRT text
pub struct FakeTranscriber {
    srt: String,
    fail_all: bool,
    failing: HashSet<String>,
    calls: Mutex<Vec<PathBuf>>,
}

impl FakeTranscriber {
    pub fn with_srt(srt: &str) -> Self {
        Self {
            srt: srt.to_string(),
            fail_all: false,
            failing: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::with_srt("")
        }
    }

    /// Media whose file name contains `fragment` fails to transcribe
    pub fn failing_for(mut self, fragment: &str) -> Self {
        self.failing.insert(fragment.to_string());
        self
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn transcribe(&self, media: &Path) -> TranscriptionResult<String> {
        self.calls.lock().unwrap().push(media.to_path_buf());

        let name = media
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if self.fail_all || self.failing.iter().any(|f| name.contains(f)) {
            return Err(TranscriptionError::ServiceError {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok(self.srt.clone())
    }
}
