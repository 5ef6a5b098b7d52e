//! Crop and Scale Geometry
//!
//! Shorts are cut as a centered 3:4 crop of the source, stretched to the
//! vertical target size, resampled and optionally mirrored.

use serde::{Deserialize, Serialize};

use crate::core::Size2D;

/// Width:height ratio of the crop taken from the source
pub const CROP_ASPECT: (u32, u32) = (3, 4);

/// Pixel rectangle in source coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Largest 3:4 rectangle centered in `source`.
///
/// Wider sources lose their sides, taller ones their top and bottom.
pub fn crop_geometry(source: Size2D) -> CropRect {
    let (aw, ah) = (CROP_ASPECT.0 as u64, CROP_ASPECT.1 as u64);
    let (w, h) = (source.width as u64, source.height as u64);

    if w * ah > h * aw {
        let width = (h * aw / ah) as u32;
        CropRect {
            x: (source.width - width) / 2,
            y: 0,
            width,
            height: source.height,
        }
    } else {
        let height = (w * ah / aw) as u32;
        CropRect {
            x: 0,
            y: (source.height - height) / 2,
            width: source.width,
            height,
        }
    }
}

/// `-vf` chain for one clip: crop, scale to `target`, resample, mirror
pub fn segment_filter(source: Size2D, target: Size2D, fps: f64, mirror: bool) -> String {
    let crop = crop_geometry(source);
    let mut filter = format!(
        "crop={}:{}:{}:{},scale={}:{},fps={}",
        crop.width, crop.height, crop.x, crop.y, target.width, target.height, fps
    );
    if mirror {
        filter.push_str(",hflip");
    }
    filter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_landscape_source() {
        let crop = crop_geometry(Size2D::new(1920, 1080));
        assert_eq!(
            crop,
            CropRect {
                x: 555,
                y: 0,
                width: 810,
                height: 1080
            }
        );
    }

    #[test]
    fn test_crop_tall_source() {
        let crop = crop_geometry(Size2D::new(1080, 1920));
        assert_eq!(
            crop,
            CropRect {
                x: 0,
                y: 240,
                width: 1080,
                height: 1440
            }
        );
    }

    #[test]
    fn test_crop_exact_aspect_is_identity() {
        let crop = crop_geometry(Size2D::new(900, 1200));
        assert_eq!(
            crop,
            CropRect {
                x: 0,
                y: 0,
                width: 900,
                height: 1200
            }
        );
    }

    #[test]
    fn test_segment_filter() {
        let filter = segment_filter(Size2D::new(1920, 1080), Size2D::new(1080, 1920), 30.0, true);
        assert_eq!(filter, "crop=810:1080:555:0,scale=1080:1920,fps=30,hflip");

        let filter = segment_filter(Size2D::new(1920, 1080), Size2D::new(1080, 1920), 29.97, false);
        assert_eq!(filter, "crop=810:1080:555:0,scale=1080:1920,fps=29.97");
    }
}
