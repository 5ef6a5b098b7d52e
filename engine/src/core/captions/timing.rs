//! Frame-Time Mapping
//!
//! Converts cue times to frame indices. Rounding is half-to-even so a time
//! that lands exactly between two frames resolves the same way every run.

use serde::{Deserialize, Serialize};

use super::Cue;
use crate::core::{Frame, TimeSec};

/// Nearest frame index to `seconds` at `fps` (ties round to even)
pub fn seconds_to_frame(seconds: TimeSec, fps: f64) -> Frame {
    (seconds * fps).round_ties_even() as Frame
}

/// Start time of `frame` at `fps`
pub fn frame_to_seconds(frame: Frame, fps: f64) -> TimeSec {
    frame as f64 / fps
}

/// Frame count covered by `duration_sec` at `fps`
pub fn frame_count(duration_sec: TimeSec, fps: f64) -> u64 {
    seconds_to_frame(duration_sec, fps).max(0) as u64
}

/// Inclusive span of frames during which a cue is active
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRange {
    pub start_frame: Frame,
    pub end_frame: Frame,
}

impl FrameRange {
    pub fn new(start_frame: Frame, end_frame: Frame) -> Self {
        Self {
            start_frame,
            end_frame,
        }
    }

    /// Maps a cue's start and end times to frames
    pub fn from_cue(cue: &Cue, fps: f64) -> Self {
        Self::new(
            seconds_to_frame(cue.start_sec, fps),
            seconds_to_frame(cue.end_sec, fps),
        )
    }

    /// Returns true if `frame` lies within the range (both ends inclusive)
    pub fn contains(&self, frame: Frame) -> bool {
        self.start_frame <= frame && frame <= self.end_frame
    }

    /// Number of frames in the range; zero when end precedes start
    pub fn len(&self) -> u64 {
        if self.end_frame < self.start_frame {
            0
        } else {
            (self.end_frame - self.start_frame + 1) as u64
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
