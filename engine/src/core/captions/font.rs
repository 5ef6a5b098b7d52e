//! Bitmap Caption Font
//!
//! Embedded 8×8 glyphs from `font8x8`, scaled by an integer pixel size and
//! widened by the stroke thickness. Monospaced, so measuring a line is a
//! multiplication and the result never depends on installed system fonts.

use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};

use super::CanvasFrame;
use crate::core::Rgb;

/// Glyph cell edge in font pixels
pub const GLYPH_CELL: u32 = 8;

/// Screen pixels per font pixel at `font_scale = 1.0`
pub const BASE_PIXEL_SIZE: f32 = 3.0;

/// Scaled bitmap font used by the canvas renderer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitmapFont {
    pixel_size: u32,
    stroke_extra: u32,
}

impl BitmapFont {
    pub fn new(font_scale: f32, stroke_thickness: u32) -> Self {
        let pixel_size = (BASE_PIXEL_SIZE * font_scale).round().max(1.0) as u32;
        Self {
            pixel_size,
            stroke_extra: stroke_thickness.max(1) - 1,
        }
    }

    /// Screen pixels per font pixel
    pub fn pixel_size(&self) -> u32 {
        self.pixel_size
    }

    /// Advance between glyph origins
    pub fn advance(&self) -> u32 {
        GLYPH_CELL * self.pixel_size
    }

    /// Height of one rendered line including stroke
    pub fn line_height(&self) -> u32 {
        self.advance() + self.stroke_extra
    }

    /// Vertical gap between stacked lines
    pub fn line_gap(&self) -> u32 {
        self.pixel_size * 2
    }

    /// Width of `line` in pixels including stroke
    pub fn measure(&self, line: &str) -> u32 {
        let chars = line.chars().count() as u32;
        if chars == 0 {
            return 0;
        }
        chars * self.advance() + self.stroke_extra
    }

    /// Draws `line` with its top-left corner at `(x, y)`; pixels outside the
    /// canvas are clipped.
    pub fn draw_line(&self, canvas: &mut CanvasFrame, x: i64, y: i64, line: &str, color: Rgb) {
        let px = self.pixel_size as i64;
        let dot = px + self.stroke_extra as i64;

        for (index, c) in line.chars().enumerate() {
            let origin_x = x + index as i64 * self.advance() as i64;
            for (row, bits) in glyph(c).into_iter().enumerate() {
                for col in 0..GLYPH_CELL {
                    // Bit 0 is the leftmost pixel
                    if bits & (1u8 << col) != 0 {
                        canvas.fill_rect(
                            origin_x + col as i64 * px,
                            y + row as i64 * px,
                            dot,
                            dot,
                            color,
                        );
                    }
                }
            }
        }
    }
}

/// Bitmap rows for `c`, falling back to `?` for unsupported characters
fn glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .filter(|_| !c.is_control())
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}
