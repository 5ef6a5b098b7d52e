//! Shortreel Core Type Definitions
//!
//! Defines fundamental types used throughout the project.

use serde::{Deserialize, Serialize};
use tracing::warn;

// =============================================================================
// Time Types
// =============================================================================

/// Time in seconds (floating point)
pub type TimeSec = f64;

/// Time in frames (integer)
pub type Frame = i64;

// =============================================================================
// Spatial Types
// =============================================================================

/// 2D size in pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size2D {
    pub width: u32,
    pub height: u32,
}

impl Size2D {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels covered by this size
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl std::fmt::Display for Size2D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Opaque 8-bit RGB color.
///
/// Serialized as a `#RRGGBB` hex string so settings files stay hand-editable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0)
    }

    pub const fn white() -> Self {
        Self::new(255, 255, 255)
    }

    /// Yellow caption color (`#FFFF00`)
    pub const fn yellow() -> Self {
        Self::new(255, 255, 0)
    }

    /// Channels in RGB24 byte order
    /// Distance as ffmpeg's `colorkey` measures it: Euclidean RGB distance
    /// normalized to 0.0 (identical) ..= 1.0 (black vs. white)
    pub fn key_distance(self, other: Rgb) -> f64 {
        let dr = f64::from(self.r) - f64::from(other.r);
        let dg = f64::from(self.g) - f64::from(other.g);
        let db = f64::from(self.b) - f64::from(other.b);
        ((dr * dr + dg * dg + db * db) / (3.0 * 255.0 * 255.0)).sqrt()
    }

    pub fn to_bytes(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Converts to the `0xRRGGBB` form FFmpeg color options accept
    pub fn to_ffmpeg_hex(self) -> String {
        format!("0x{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Converts to a `#RRGGBB` hex string
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Parses a hex color string (`#RRGGBB`, `RRGGBB`, `#RGB` or `0xRRGGBB`).
    pub fn try_from_hex(hex: &str) -> Result<Self, String> {
        let trimmed = hex.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or_else(|| trimmed.trim_start_matches('#'));

        let parse = |s: &str| u8::from_str_radix(s, 16).map_err(|e| e.to_string());

        match hex.len() {
            3 => {
                // Expand "F" to "FF"
                let r = parse(&hex[0..1])? * 17;
                let g = parse(&hex[1..2])? * 17;
                let b = parse(&hex[2..3])? * 17;
                Ok(Self::new(r, g, b))
            }
            6 => Ok(Self::new(
                parse(&hex[0..2])?,
                parse(&hex[2..4])?,
                parse(&hex[4..6])?,
            )),
            len => Err(format!("Invalid hex color length: {}", len)),
        }
    }

    /// Parses a hex color string, falling back to black on invalid input.
    pub fn from_hex(hex: &str) -> Self {
        match Self::try_from_hex(hex) {
            Ok(c) => c,
            Err(e) => {
                warn!(
                    "Failed to parse hex color '{}': {}, defaulting to black",
                    hex, e
                );
                Self::black()
            }
        }
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from_hex(&value)
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_hex()
    }
}
