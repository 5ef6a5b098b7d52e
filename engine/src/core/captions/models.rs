//! Caption Data Models
//!
//! Defines the cue entries parsed from a transcript and the style used to draw
//! them onto the caption canvas.

use serde::{Deserialize, Serialize};

use crate::core::{Rgb, TimeSec};

// =============================================================================
// Cue
// =============================================================================

/// A single timed caption event
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cue {
    /// Start time in seconds, relative to the clip
    pub start_sec: TimeSec,
    /// End time in seconds, relative to the clip
    pub end_sec: TimeSec,
    /// Caption text (may contain line breaks)
    pub text: String,
}

impl Cue {
    /// Creates a new cue with the given text and timing
    pub fn new(start_sec: TimeSec, end_sec: TimeSec, text: &str) -> Self {
        Self {
            start_sec,
            end_sec,
            text: text.to_string(),
        }
    }

    /// Returns the duration of this cue in seconds
    pub fn duration(&self) -> TimeSec {
        self.end_sec - self.start_sec
    }

    /// Returns true if this cue overlaps with another
    pub fn overlaps(&self, other: &Cue) -> bool {
        self.start_sec <= other.end_sec && self.end_sec >= other.start_sec
    }

    /// Text split on line breaks
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }
}

// =============================================================================
// Overlay Style
// =============================================================================

/// Vertical displacement of the caption block from the frame center
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "value")]
pub enum VerticalOffset {
    /// Fixed pixel offset (positive moves down)
    Pixels(i32),
    /// Offset as a fraction of the frame height (positive moves down)
    FractionOfHeight(f64),
}

impl VerticalOffset {
    /// Offset used for 9:16 shorts: 500 px at a 1920 px tall frame.
    pub const SHORTS_DEFAULT: Self = Self::FractionOfHeight(500.0 / 1920.0);

    /// Resolves the offset in pixels for a frame of the given height
    pub fn resolve(&self, frame_height: u32) -> i64 {
        match *self {
            Self::Pixels(px) => px as i64,
            Self::FractionOfHeight(fraction) => (fraction * frame_height as f64).round() as i64,
        }
    }
}

impl Default for VerticalOffset {
    fn default() -> Self {
        Self::SHORTS_DEFAULT
    }
}

/// Rendering and keying parameters shared by the canvas renderer and the
/// overlay compositor.
///
/// `text_color` must lie farther than `chroma_tolerance` from
/// `background_color`: the compositor keys out everything within that
/// distance of the background, text included.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayStyle {
    /// Canvas fill color, removed by the chroma key
    #[serde(default = "default_background")]
    pub background_color: Rgb,
    /// Glyph color
    #[serde(default = "default_text_color")]
    pub text_color: Rgb,
    /// Multiplier on the base glyph size (1.0 = 24 px line)
    #[serde(default = "default_font_scale")]
    pub font_scale: f32,
    /// Stroke width in pixels (1 = no widening)
    #[serde(default = "default_stroke")]
    pub stroke_thickness: u32,
    /// Offset of the caption block from the frame center
    #[serde(default)]
    pub vertical_offset: VerticalOffset,
    /// Color similarity for the chroma key (0.01 - 1.0)
    #[serde(default = "default_chroma_tolerance")]
    pub chroma_tolerance: f32,
    /// Edge blend for the chroma key (0.0 - 1.0)
    #[serde(default = "default_chroma_blend")]
    pub chroma_blend: f32,
}

fn default_background() -> Rgb {
    Rgb::black()
}

fn default_text_color() -> Rgb {
    Rgb::yellow()
}

fn default_font_scale() -> f32 {
    1.0
}

fn default_stroke() -> u32 {
    2
}

fn default_chroma_tolerance() -> f32 {
    0.1
}

fn default_chroma_blend() -> f32 {
    0.1
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            background_color: default_background(),
            text_color: default_text_color(),
            font_scale: default_font_scale(),
            stroke_thickness: default_stroke(),
            vertical_offset: VerticalOffset::default(),
            chroma_tolerance: default_chroma_tolerance(),
            chroma_blend: default_chroma_blend(),
        }
    }
}

impl OverlayStyle {
    /// Clamps values into the ranges the renderer and `colorkey` accept.
    pub fn normalize(&mut self) {
        if !self.font_scale.is_finite() {
            self.font_scale = default_font_scale();
        }
        self.font_scale = self.font_scale.clamp(0.1, 20.0);
        self.stroke_thickness = self.stroke_thickness.clamp(1, 32);

        if !self.chroma_tolerance.is_finite() {
            self.chroma_tolerance = default_chroma_tolerance();
        }
        self.chroma_tolerance = self.chroma_tolerance.clamp(0.01, 1.0);

        if !self.chroma_blend.is_finite() {
            self.chroma_blend = default_chroma_blend();
        }
        self.chroma_blend = self.chroma_blend.clamp(0.0, 1.0);

        if let VerticalOffset::FractionOfHeight(f) = self.vertical_offset {
            if !f.is_finite() {
                self.vertical_offset = VerticalOffset::default();
            }
        }
    }

    /// Returns true when text would be keyed out together with the background,
    /// i.e. its `colorkey` distance from the key is within the tolerance
    pub fn text_collides_with_background(&self) -> bool {
        self.text_color.key_distance(self.background_color) <= f64::from(self.chroma_tolerance)
    }
}
