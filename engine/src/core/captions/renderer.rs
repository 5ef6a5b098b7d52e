//! Caption Canvas Renderer
//!
//! Produces the caption layer one frame at a time. `render` is a pure function
//! of the frame index and the renderer's immutable state, so frames can be
//! generated in any order or in parallel and still come out bit-identical.

use std::ops::Range;

use rayon::prelude::*;

use super::{BitmapFont, CanvasFrame, CaptionError, CaptionResult, Cue, FrameRange, OverlayStyle};
use crate::core::{Frame, Size2D};

/// Renders cue text onto background-colored canvas frames
#[derive(Debug, Clone)]
pub struct CaptionRenderer {
    cues: Vec<Cue>,
    ranges: Vec<FrameRange>,
    fps: f64,
    size: Size2D,
    style: OverlayStyle,
    font: BitmapFont,
    offset_px: i64,
}

impl CaptionRenderer {
    /// Creates a renderer for a clip of `size` pixels at `fps`.
    ///
    /// Fails when the geometry is unusable or the text color would be keyed
    /// out together with the background.
    pub fn new(cues: Vec<Cue>, fps: f64, size: Size2D, style: OverlayStyle) -> CaptionResult<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(CaptionError::InvalidInput(format!(
                "Frame rate must be positive, got {}",
                fps
            )));
        }
        if size.width == 0 || size.height == 0 {
            return Err(CaptionError::InvalidInput(format!(
                "Canvas size must be non-zero, got {}",
                size
            )));
        }
        if style.text_collides_with_background() {
            return Err(CaptionError::InvalidInput(format!(
                "Text color {} matches the keyed background",
                style.text_color.to_hex()
            )));
        }

        let ranges = cues.iter().map(|cue| FrameRange::from_cue(cue, fps)).collect();
        let font = BitmapFont::new(style.font_scale, style.stroke_thickness);
        let offset_px = style.vertical_offset.resolve(size.height);

        Ok(Self {
            cues,
            ranges,
            fps,
            size,
            style,
            font,
            offset_px,
        })
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn size(&self) -> Size2D {
        self.size
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Frame range of every cue, in cue order
    pub fn frame_ranges(&self) -> &[FrameRange] {
        &self.ranges
    }

    /// Cues whose frame range contains `frame`, in transcript order.
    ///
    /// Linear scan: per-clip cue counts are small.
    pub fn active_cues(&self, frame: Frame) -> impl Iterator<Item = &Cue> {
        self.cues
            .iter()
            .zip(&self.ranges)
            .filter(move |(_, range)| range.contains(frame))
            .map(|(cue, _)| cue)
    }

    /// Renders the caption layer for `frame`
    pub fn render(&self, frame: Frame) -> CanvasFrame {
        let mut canvas = CanvasFrame::filled(self.size, self.style.background_color);
        for cue in self.active_cues(frame) {
            self.draw_cue(&mut canvas, cue);
        }
        canvas
    }

    /// Renders `frames` in parallel; the result is in frame order.
    pub fn render_batch(&self, frames: Range<Frame>) -> Vec<CanvasFrame> {
        let indices: Vec<Frame> = frames.collect();
        indices.par_iter().map(|&frame| self.render(frame)).collect()
    }

    /// Draws every line of `cue`, each centered horizontally, with the block
    /// centered vertically and shifted by the configured offset.
    fn draw_cue(&self, canvas: &mut CanvasFrame, cue: &Cue) {
        let lines: Vec<&str> = cue.lines().collect();
        if lines.is_empty() {
            return;
        }

        let line_height = self.font.line_height() as i64;
        let gap = self.font.line_gap() as i64;
        let count = lines.len() as i64;
        let block_height = count * line_height + (count - 1) * gap;

        let frame_width = self.size.width as i64;
        let frame_height = self.size.height as i64;
        let top = (frame_height - block_height).div_euclid(2) + self.offset_px;

        for (i, line) in lines.iter().enumerate() {
            let width = self.font.measure(line) as i64;
            let x = (frame_width - width).div_euclid(2);
            let y = top + i as i64 * (line_height + gap);
            self.font
                .draw_line(canvas, x, y, line, self.style.text_color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::captions::{parse_cues, VerticalOffset};
    use crate::core::Rgb;

    fn renderer(cues: Vec<Cue>, width: u32, height: u32) -> CaptionRenderer {
        CaptionRenderer::new(cues, 30.0, Size2D::new(width, height), OverlayStyle::default())
            .unwrap()
    }

    #[test]
    fn test_rejects_bad_input() {
        let size = Size2D::new(64, 64);
        assert!(CaptionRenderer::new(vec![], 0.0, size, OverlayStyle::default()).is_err());
        assert!(CaptionRenderer::new(vec![], f64::NAN, size, OverlayStyle::default()).is_err());
        assert!(
            CaptionRenderer::new(vec![], 30.0, Size2D::new(0, 64), OverlayStyle::default())
                .is_err()
        );

        let style = OverlayStyle {
            text_color: Rgb::black(),
            ..Default::default()
        };
        let err = CaptionRenderer::new(vec![], 30.0, size, style).unwrap_err();
        assert!(matches!(err, CaptionError::InvalidInput(_)));
    }

    #[test]
    fn test_frame_without_cues_is_background() {
        let r = renderer(vec![Cue::new(1.0, 2.0, "later")], 320, 240);
        let frame = r.render(0);

        assert_eq!(frame.size(), Size2D::new(320, 240));
        assert!(!frame.has_pixels_other_than(Rgb::black()));
    }

    #[test]
    fn test_cue_activity_boundaries() {
        let r = renderer(vec![Cue::new(1.0, 2.0, "ONE")], 320, 240);

        assert!(!r.render(29).has_pixels_other_than(Rgb::black()));
        assert!(r.render(30).has_pixels_other_than(Rgb::black()));
        assert!(r.render(60).has_pixels_other_than(Rgb::black()));
        assert!(!r.render(61).has_pixels_other_than(Rgb::black()));
    }

    #[test]
    fn test_text_is_horizontally_centered() {
        let r = renderer(vec![Cue::new(0.0, 1.0, "HELLO")], 640, 360);
        let frame = r.render(0);

        let mut min_x = u32::MAX;
        let mut max_x = 0;
        for y in 0..360 {
            for x in 0..640 {
                if frame.pixel(x, y) != Some(Rgb::black()) {
                    min_x = min_x.min(x);
                    max_x = max_x.max(x);
                }
            }
        }

        // Glyph ink is inset from the measured box, so compare the margins
        let left = min_x as i64;
        let right = 639 - max_x as i64;
        assert!((left - right).abs() <= 12, "left {} right {}", left, right);
    }

    #[test]
    fn test_vertical_offset_moves_text_down() {
        let cue = vec![Cue::new(0.0, 1.0, "X")];
        let centered = CaptionRenderer::new(
            cue.clone(),
            30.0,
            Size2D::new(200, 400),
            OverlayStyle {
                vertical_offset: VerticalOffset::Pixels(0),
                ..Default::default()
            },
        )
        .unwrap();
        let shifted = CaptionRenderer::new(
            cue,
            30.0,
            Size2D::new(200, 400),
            OverlayStyle {
                vertical_offset: VerticalOffset::Pixels(100),
                ..Default::default()
            },
        )
        .unwrap();

        let first_row = |frame: &CanvasFrame| {
            (0..400)
                .find(|&y| (0..200).any(|x| frame.pixel(x, y) != Some(Rgb::black())))
                .unwrap()
        };

        assert_eq!(first_row(&shifted.render(0)), first_row(&centered.render(0)) + 100);
    }

    #[test]
    fn test_overlapping_cues_both_render() {
        let first = Cue::new(0.0, 2.0, "AAAA");
        let second = Cue::new(1.0, 3.0, "B\n\nB\nB");

        let only_first = renderer(vec![first.clone()], 320, 240).render(45);
        let only_second = renderer(vec![second.clone()], 320, 240).render(45);
        let both = renderer(vec![first, second], 320, 240);

        assert_eq!(both.active_cues(45).count(), 2);

        let frame = both.render(45);
        // Every pixel drawn by either cue alone is drawn in the combined frame
        for y in 0..240 {
            for x in 0..320 {
                let drawn_alone = only_first.pixel(x, y) != Some(Rgb::black())
                    || only_second.pixel(x, y) != Some(Rgb::black());
                if drawn_alone {
                    assert_ne!(frame.pixel(x, y), Some(Rgb::black()));
                }
            }
        }
    }

    #[test]
    fn test_multiline_cue_stacks_lines() {
        let single = renderer(vec![Cue::new(0.0, 1.0, "LINE")], 320, 240).render(0);
        let double = renderer(vec![Cue::new(0.0, 1.0, "LINE\nLINE")], 320, 240).render(0);

        assert_eq!(
            double.count_pixels_other_than(Rgb::black()),
            2 * single.count_pixels_other_than(Rgb::black())
        );
    }

    #[test]
    fn test_text_wider_than_frame_is_clipped() {
        let r = renderer(vec![Cue::new(0.0, 1.0, &"W".repeat(200))], 100, 100);
        let frame = r.render(0);
        assert!(frame.has_pixels_other_than(Rgb::black()));
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let cues = parse_cues(
            "1\n00:00:00,000 --> 00:00:01,000\nfirst\n\n2\n00:00:00,500 --> 00:00:02,000\nsecond\nline\n",
        );
        let a = renderer(cues.clone(), 160, 120);
        let b = renderer(cues, 160, 120);

        let first_pass = a.render_batch(0..75);
        let second_pass = a.render_batch(0..75);
        let other_renderer = b.render_batch(0..75);

        assert_eq!(first_pass, second_pass);
        assert_eq!(first_pass, other_renderer);
    }

    #[test]
    fn test_render_batch_matches_sequential_order() {
        let r = renderer(vec![Cue::new(0.5, 1.0, "go")], 96, 64);
        let batch = r.render_batch(10..40);

        assert_eq!(batch.len(), 30);
        for (offset, frame) in batch.iter().enumerate() {
            assert_eq!(frame, &r.render(10 + offset as Frame));
        }
    }

    #[test]
    fn test_end_to_end_canvas_frames() {
        let cues = parse_cues("1\n00:00:02,000 --> 00:00:04,000\nHELLO\n");
        let r = renderer(cues, 640, 360);

        let frames = r.render_batch(0..300);
        assert_eq!(frames.len(), 300);

        let lit: Vec<usize> = frames
            .iter()
            .enumerate()
            .filter(|(_, f)| f.has_pixels_other_than(Rgb::black()))
            .map(|(i, _)| i)
            .collect();

        assert_eq!(lit, (60..=120).collect::<Vec<_>>());
    }
}
