//! Canvas Encoder Stream
//!
//! Pipes raw RGB24 canvas frames into an ffmpeg child that encodes them
//! losslessly, so the chroma key later sees exactly the background color the
//! renderer produced.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin};
use tokio::task::JoinHandle;
use tracing::debug;

use super::{CanvasSink, CanvasStreamSpec, FFmpegError, FFmpegResult};
use crate::core::captions::CanvasFrame;
use crate::core::process::media_command;

/// ffmpeg-backed [`CanvasSink`]
pub struct FFmpegCanvasStream {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_task: Option<JoinHandle<String>>,
    frame_len: usize,
    written: u64,
    output: PathBuf,
}

impl FFmpegCanvasStream {
    /// Spawns the encoder; the child is killed if the stream is dropped
    /// before [`CanvasSink::finish`].
    pub fn spawn(ffmpeg_path: &Path, spec: &CanvasStreamSpec) -> FFmpegResult<Self> {
        if spec.size.width == 0 || spec.size.height == 0 {
            return Err(FFmpegError::InvalidInput(format!(
                "Canvas size must be non-zero, got {}",
                spec.size
            )));
        }

        if let Some(parent) = spec.output.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                FFmpegError::OutputError(format!("Failed to create output directory: {}", e))
            })?;
        }

        let args = canvas_encoder_args(spec);
        debug!("Spawning canvas encoder: {:?}", args);

        let mut cmd = media_command(ffmpeg_path);
        cmd.args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(FFmpegError::ProcessError)?;
        let stdin = child.stdin.take();
        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf).await;
                buf
            })
        });

        Ok(Self {
            child,
            stdin,
            stderr_task,
            frame_len: CanvasFrame::byte_len(spec.size),
            written: 0,
            output: spec.output.clone(),
        })
    }

    /// Frames accepted so far
    pub fn frames_written(&self) -> u64 {
        self.written
    }

    async fn collect_stderr(&mut self) -> String {
        match self.stderr_task.take() {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        }
    }
}

#[async_trait]
impl CanvasSink for FFmpegCanvasStream {
    async fn write_frame(&mut self, frame: &CanvasFrame) -> FFmpegResult<()> {
        let bytes = frame.as_bytes();
        if bytes.len() != self.frame_len {
            return Err(FFmpegError::InvalidInput(format!(
                "Canvas frame is {} bytes, encoder expects {}",
                bytes.len(),
                self.frame_len
            )));
        }

        let stdin = self.stdin.as_mut().ok_or_else(|| FFmpegError::StreamClosed {
            written: self.written,
            reason: "stdin already closed".to_string(),
        })?;

        if let Err(e) = stdin.write_all(bytes).await {
            // Encoder died; reap it so its stderr explains why
            self.stdin = None;
            let _ = self.child.wait().await;
            let stderr = self.collect_stderr().await;
            return Err(FFmpegError::StreamClosed {
                written: self.written,
                reason: format!("{}: {}", e, stderr.trim()),
            });
        }

        self.written += 1;
        Ok(())
    }

    async fn finish(mut self: Box<Self>) -> FFmpegResult<u64> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin.flush().await.map_err(FFmpegError::ProcessError)?;
            drop(stdin);
        }

        let status = self.child.wait().await.map_err(FFmpegError::ProcessError)?;
        let stderr = self.collect_stderr().await;

        if !status.success() {
            return Err(FFmpegError::ExecutionFailed(format!(
                "Canvas encoding of {} failed: {}",
                self.output.display(),
                stderr.trim()
            )));
        }

        debug!(
            "Canvas encoder wrote {} frames to {}",
            self.written,
            self.output.display()
        );
        Ok(self.written)
    }
}

/// Builds the ffmpeg arguments for a raw-RGB → lossless H.264 encode
fn canvas_encoder_args(spec: &CanvasStreamSpec) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgb24".to_string(),
        "-s".to_string(),
        spec.size.to_string(),
        "-r".to_string(),
        spec.frame_rate.clone(),
        "-i".to_string(),
        "-".to_string(),
        "-an".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "ultrafast".to_string(),
        "-qp".to_string(),
        "0".to_string(),
        "-pix_fmt".to_string(),
        "yuv444p".to_string(),
        "-y".to_string(),
        spec.output.to_string_lossy().to_string(),
    ]
}
