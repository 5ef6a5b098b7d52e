//! Segmentation Driver
//!
//! Cuts a long source into numbered vertical shorts and, when a caption
//! pipeline is attached, captions each clip right after it is cut.
//!
//! A failed cut or a failed caption run is recorded in the [`BatchReport`]
//! and the batch moves on to the next window.

mod geometry;
mod plan;

pub use geometry::{crop_geometry, segment_filter, CropRect, CROP_ASPECT};
pub use plan::{
    clip_file_name, output_folder, plan_windows, source_stem, SegmentPlan, SegmentWindow,
};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::core::ffmpeg::{MediaBackend, SegmentCut};
use crate::core::fs::require_source_file;
use crate::core::pipeline::CaptionPipeline;
use crate::core::settings::SegmentSettings;
use crate::core::{CoreError, CoreResult, Size2D};

// =============================================================================
// Reports
// =============================================================================

/// What happened to one window
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ClipStatus {
    /// Cut and captioned
    #[serde(rename_all = "camelCase")]
    Captioned { captioned: PathBuf },
    /// Cut; captioning failed and was skipped
    Uncaptioned { reason: String },
    /// Cut with captions disabled
    Cut,
    /// The cut itself failed; no clip was produced
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipReport {
    pub window: SegmentWindow,
    pub clip: PathBuf,
    pub status: ClipStatus,
}

impl ClipReport {
    /// Whether the uncaptioned clip exists on disk
    pub fn has_clip(&self) -> bool {
        !matches!(self.status, ClipStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub source: PathBuf,
    pub output_folder: PathBuf,
    pub clips: Vec<ClipReport>,
}

impl BatchReport {
    pub fn cut_count(&self) -> usize {
        self.clips.iter().filter(|c| c.has_clip()).count()
    }

    pub fn captioned_count(&self) -> usize {
        self.clips
            .iter()
            .filter(|c| matches!(c.status, ClipStatus::Captioned { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.clips.len() - self.cut_count()
    }
}

// =============================================================================
// Driver
// =============================================================================

pub struct SegmentDriver {
    backend: Arc<dyn MediaBackend>,
    captions: Option<CaptionPipeline>,
    settings: SegmentSettings,
    output_root: PathBuf,
}

impl SegmentDriver {
    pub fn new(
        backend: Arc<dyn MediaBackend>,
        settings: SegmentSettings,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            backend,
            captions: None,
            settings,
            output_root: output_root.into(),
        }
    }

    /// Captions every clip after it is cut
    pub fn with_captions(mut self, pipeline: CaptionPipeline) -> Self {
        self.captions = Some(pipeline);
        self
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Cuts the windows of `plan` into `<output_root>/<source stem>/`.
    ///
    /// Only problems with the source itself are returned as errors; per-clip
    /// failures end up in the report.
    pub async fn run(&self, plan: &SegmentPlan) -> CoreResult<BatchReport> {
        plan.validate()?;
        let source = require_source_file(&plan.source)?;

        let info = self.backend.probe(&source).await?;
        let video = info
            .video
            .as_ref()
            .ok_or_else(|| CoreError::NoVideoStream(source.display().to_string()))?;
        let duration = if info.duration_sec > 0.0 {
            info.duration_sec
        } else {
            video.duration_sec.unwrap_or(0.0)
        };

        let windows = plan_windows(plan, duration);
        if windows.len() < plan.count as usize {
            warn!(
                "{} has room for {} of {} requested clips ({:.1}s long)",
                source.display(),
                windows.len(),
                plan.count,
                duration
            );
        }

        let folder = output_folder(&self.output_root, &source);
        tokio::fs::create_dir_all(&folder).await?;

        let stem = source_stem(&source);
        let target = Size2D::new(self.settings.target_width, self.settings.target_height);
        let video_filter = segment_filter(video.size(), target, plan.fps, self.settings.mirror);
        let encode = self.settings.render_settings(plan.fps);

        info!(
            "Cutting {} clips of {}s from {} into {}",
            windows.len(),
            plan.clip_length_sec,
            source.display(),
            folder.display()
        );

        let mut clips = Vec::with_capacity(windows.len());
        for window in windows {
            let clip = folder.join(clip_file_name(&stem, window.part));
            let cut = SegmentCut {
                source: source.clone(),
                output: clip.clone(),
                start_sec: window.start_sec,
                duration_sec: window.duration(),
                video_filter: video_filter.clone(),
                encode: encode.clone(),
            };

            let status = match self.backend.cut_segment(&cut).await {
                Err(e) => {
                    warn!("Part {} failed to cut: {}", window.part, e);
                    ClipStatus::Failed {
                        reason: e.to_string(),
                    }
                }
                Ok(()) => {
                    info!("Part {} written to {}", window.part, clip.display());
                    self.caption(&clip).await
                }
            };

            clips.push(ClipReport {
                window,
                clip,
                status,
            });
        }

        Ok(BatchReport {
            source,
            output_folder: folder,
            clips,
        })
    }

    async fn caption(&self, clip: &Path) -> ClipStatus {
        let Some(pipeline) = &self.captions else {
            return ClipStatus::Cut;
        };

        match pipeline.run(clip).await {
            Ok(outcome) => ClipStatus::Captioned {
                captioned: outcome.output,
            },
            Err(failure) => {
                warn!(
                    "Skipping captions for {}: {}",
                    clip.display(),
                    failure
                );
                ClipStatus::Uncaptioned {
                    reason: failure.to_string(),
                }
            }
        }
    }
}
