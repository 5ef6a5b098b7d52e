//! Caption Canvas
//!
//! Packed RGB24 raster used as the caption layer. One canvas is produced per
//! source frame; everything not covered by glyphs stays background-colored so
//! the compositor can key it out.

use crate::core::{Rgb, Size2D};

/// Bytes per pixel in the packed RGB24 layout
pub const BYTES_PER_PIXEL: usize = 3;

/// A single caption-layer frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanvasFrame {
    size: Size2D,
    data: Vec<u8>,
}

impl CanvasFrame {
    /// Creates a canvas entirely filled with `color`
    pub fn filled(size: Size2D, color: Rgb) -> Self {
        let pixel = color.to_bytes();
        let mut data = Vec::with_capacity(size.area() * BYTES_PER_PIXEL);
        for _ in 0..size.area() {
            data.extend_from_slice(&pixel);
        }
        Self { size, data }
    }

    pub fn size(&self) -> Size2D {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// Raw RGB24 bytes, row-major with no stride padding
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Byte length of one frame of this size
    pub fn byte_len(size: Size2D) -> usize {
        size.area() * BYTES_PER_PIXEL
    }

    /// Color at `(x, y)`, or `None` outside the canvas
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let i = self.offset(x, y);
        Some(Rgb::new(self.data[i], self.data[i + 1], self.data[i + 2]))
    }

    /// Fills the rectangle at `(x, y)` sized `w`×`h`, clipped to the canvas.
    ///
    /// Coordinates may be negative or run past the edges.
    pub fn fill_rect(&mut self, x: i64, y: i64, w: i64, h: i64, color: Rgb) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w).min(self.size.width as i64);
        let y1 = (y + h).min(self.size.height as i64);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let pixel = color.to_bytes();
        for row in y0..y1 {
            let start = self.offset(x0 as u32, row as u32);
            let end = self.offset((x1 - 1) as u32, row as u32) + BYTES_PER_PIXEL;
            for chunk in self.data[start..end].chunks_exact_mut(BYTES_PER_PIXEL) {
                chunk.copy_from_slice(&pixel);
            }
        }
    }

    /// Counts pixels whose color differs from `color`
    pub fn count_pixels_other_than(&self, color: Rgb) -> usize {
        let pixel = color.to_bytes();
        self.data
            .chunks_exact(BYTES_PER_PIXEL)
            .filter(|p| *p != pixel)
            .count()
    }

    /// Returns true if any pixel differs from `color`
    pub fn has_pixels_other_than(&self, color: Rgb) -> bool {
        let pixel = color.to_bytes();
        self.data
            .chunks_exact(BYTES_PER_PIXEL)
            .any(|p| p != pixel)
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.size.width as usize + x as usize) * BYTES_PER_PIXEL
    }
}
