//! Segment Planning
//!
//! Splits a source into consecutive fixed-length windows and names the clip
//! files they become.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::pipeline::SHORTS_SUFFIX;
use crate::core::{CoreError, CoreResult, TimeSec};

/// What to cut from one source video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentPlan {
    pub source: PathBuf,
    /// Maximum number of clips to produce in this run
    pub count: u32,
    /// Length of each clip in seconds
    pub clip_length_sec: TimeSec,
    /// Offset into the source where part 1 begins
    pub start_point_sec: TimeSec,
    /// Output frame rate
    pub fps: f64,
    /// Parts already produced by earlier runs; numbering resumes after them
    pub existing_parts: u32,
}

impl SegmentPlan {
    pub fn validate(&self) -> CoreResult<()> {
        if !self.clip_length_sec.is_finite() || self.clip_length_sec <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Clip length must be positive, got {}",
                self.clip_length_sec
            )));
        }
        if !self.start_point_sec.is_finite() || self.start_point_sec < 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Start point must be non-negative, got {}",
                self.start_point_sec
            )));
        }
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Frame rate must be positive, got {}",
                self.fps
            )));
        }
        Ok(())
    }
}

/// One clip-sized slice of the source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentWindow {
    /// 1-based part number used in the file name
    pub part: u32,
    pub start_sec: TimeSec,
    pub end_sec: TimeSec,
}

impl SegmentWindow {
    pub fn duration(&self) -> TimeSec {
        self.end_sec - self.start_sec
    }
}

/// Windows of `plan` that fit entirely inside `duration_sec`.
///
/// The first window starts after the parts already produced; windows are
/// emitted until `count` is reached or the next one would run past the end.
pub fn plan_windows(plan: &SegmentPlan, duration_sec: TimeSec) -> Vec<SegmentWindow> {
    let mut windows = Vec::new();
    if plan.validate().is_err() {
        return windows;
    }

    let length = plan.clip_length_sec;
    let mut start = plan.start_point_sec + plan.existing_parts as f64 * length;
    let mut part = plan.existing_parts + 1;

    while (windows.len() as u32) < plan.count {
        let end = start + length;
        if end > duration_sec {
            break;
        }
        windows.push(SegmentWindow {
            part,
            start_sec: start,
            end_sec: end,
        });
        start = end;
        part += 1;
    }

    windows
}

/// Stem of the source file, used for the folder and clip names
pub fn source_stem(source: &Path) -> String {
    source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "video".to_string())
}

/// Folder receiving the clips of `source`: `<root>/<source stem>`
pub fn output_folder(output_root: &Path, source: &Path) -> PathBuf {
    output_root.join(source_stem(source))
}

/// `<stem> (part N) #shorts.mp4`
pub fn clip_file_name(stem: &str, part: u32) -> String {
    format!("{} (part {}) {}", stem, part, SHORTS_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(count: u32, length: f64, start: f64, existing: u32) -> SegmentPlan {
        SegmentPlan {
            source: PathBuf::from("/videos/talk.mp4"),
            count,
            clip_length_sec: length,
            start_point_sec: start,
            fps: 30.0,
            existing_parts: existing,
        }
    }

    #[test]
    fn test_windows_from_start_point() {
        let windows = plan_windows(&plan(3, 60.0, 10.0, 0), 600.0);

        assert_eq!(windows.len(), 3);
        assert_eq!(
            windows[0],
            SegmentWindow {
                part: 1,
                start_sec: 10.0,
                end_sec: 70.0
            }
        );
        assert_eq!(windows[2].part, 3);
        assert_eq!(windows[2].start_sec, 130.0);
        assert_eq!(windows[2].duration(), 60.0);
    }

    #[test]
    fn test_windows_resume_after_existing_parts() {
        let windows = plan_windows(&plan(2, 30.0, 5.0, 4), 600.0);

        assert_eq!(windows[0].part, 5);
        assert_eq!(windows[0].start_sec, 125.0);
        assert_eq!(windows[1].part, 6);
        assert_eq!(windows[1].start_sec, 155.0);
    }

    #[test]
    fn test_windows_stop_at_duration() {
        // 100 s source, 30 s clips: 0-30, 30-60, 60-90; 90-120 does not fit
        let windows = plan_windows(&plan(10, 30.0, 0.0, 0), 100.0);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows.last().unwrap().end_sec, 90.0);

        // A window ending exactly at the end is kept
        let windows = plan_windows(&plan(10, 25.0, 0.0, 0), 100.0);
        assert_eq!(windows.len(), 4);
    }

    #[test]
    fn test_windows_edge_cases() {
        assert!(plan_windows(&plan(0, 30.0, 0.0, 0), 100.0).is_empty());
        assert!(plan_windows(&plan(3, 30.0, 90.0, 0), 100.0).is_empty());
        assert!(plan_windows(&plan(3, 0.0, 0.0, 0), 100.0).is_empty());
        assert!(plan_windows(&plan(3, 30.0, -1.0, 0), 100.0).is_empty());
    }

    #[test]
    fn test_plan_validation() {
        assert!(plan(1, 30.0, 0.0, 0).validate().is_ok());
        assert!(plan(1, f64::NAN, 0.0, 0).validate().is_err());

        let mut bad_fps = plan(1, 30.0, 0.0, 0);
        bad_fps.fps = 0.0;
        assert!(matches!(bad_fps.validate(), Err(CoreError::ValidationError(_))));
    }

    #[test]
    fn test_naming() {
        let source = Path::new("/videos/My Talk.final.mp4");
        assert_eq!(source_stem(source), "My Talk.final");
        assert_eq!(
            output_folder(Path::new("/out"), source),
            PathBuf::from("/out/My Talk.final")
        );
        assert_eq!(clip_file_name("My Talk.final", 7), "My Talk.final (part 7) #shorts.mp4");
    }
}
