use image::{GrayImage, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology;

use crate::PixelRect;

/// Collapse an RGB frame to its luma plane.
pub fn to_luma(frame: &RgbImage) -> GrayImage {
    image::imageops::grayscale(frame)
}

/// Gaussian smoothing to suppress sensor noise ahead of differencing.
pub fn smooth(gray: &GrayImage, sigma: f32) -> GrayImage {
    gaussian_blur_f32(gray, sigma)
}

/// Morphological open with a square structuring element of side
/// `feature_size`, dropping noise blobs smaller than the element.
///
/// The morphology kernel takes a radius, so even sizes round down to the
/// nearest odd element (side 2r+1).
pub fn open_mask(mask: &GrayImage, feature_size: u32) -> GrayImage {
    let radius = (feature_size.max(1) - 1) / 2;
    morphology::open(mask, Norm::LInf, radius.min(255) as u8)
}

/// Bounding rectangles of the outer contours of a binary mask, one per
/// connected foreground region.
pub fn outer_bounding_rects(mask: &GrayImage) -> Vec<PixelRect> {
    let contours = find_contours::<i32>(mask);
    contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && !c.points.is_empty())
        .map(|c| {
            let mut min_x = i32::MAX;
            let mut min_y = i32::MAX;
            let mut max_x = i32::MIN;
            let mut max_y = i32::MIN;
            for p in &c.points {
                min_x = min_x.min(p.x);
                min_y = min_y.min(p.y);
                max_x = max_x.max(p.x);
                max_y = max_y.max(p.y);
            }
            PixelRect::new(
                min_x.max(0) as u32,
                min_y.max(0) as u32,
                (max_x - min_x + 1) as u32,
                (max_y - min_y + 1) as u32,
            )
        })
        .collect()
}
