//! Perspective rectifier (stage D): four-point homography, warp, and the
//! mandatory post-rectification 90-degree counter-clockwise rotation every
//! downstream consumer (§4.5-4.7) expects.

use crate::error::VisionError;
use nalgebra::Point2;
use omr_core::{homography_from_4pt, warp_perspective_gray, GrayImage, Quadrilateral};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Rectify `quad` out of `src` into an upright tile, already rotated 90
/// degrees counter-clockwise per the post-step contract.
#[cfg_attr(feature = "tracing", instrument(skip(src, quad)))]
pub fn rectify(src: &GrayImage, quad: &Quadrilateral) -> Result<GrayImage, VisionError> {
    let dest_w = quad.dest_width().round().max(1.0) as usize;
    let dest_h = quad.dest_height().round().max(1.0) as usize;

    let rect_corners = [
        Point2::new(0.0_f32, 0.0),
        Point2::new((dest_w - 1) as f32, 0.0),
        Point2::new((dest_w - 1) as f32, (dest_h - 1) as f32),
        Point2::new(0.0_f32, (dest_h - 1) as f32),
    ];
    let img_corners = quad.as_array();

    let h_img_from_rect = homography_from_4pt(&rect_corners, &img_corners)
        .ok_or_else(|| VisionError::DegenerateRegion("homography is not invertible".to_string()))?;

    let warped = warp_perspective_gray(&src.view(), h_img_from_rect, dest_w, dest_h);
    Ok(warped.rotate90_ccw())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectify_axis_aligned_quad_preserves_size_after_rotation() {
        let src = GrayImage::new(100, 80, vec![128u8; 100 * 80]);
        let quad = Quadrilateral::from_unordered([
            Point2::new(10.0, 10.0),
            Point2::new(59.0, 10.0),
            Point2::new(59.0, 49.0),
            Point2::new(10.0, 49.0),
        ]);
        let tile = rectify(&src, &quad).expect("rectifiable");
        // pre-rotation tile is 50x40; after 90deg CCW rotation it's 40x50
        assert_eq!(tile.width, 40);
        assert_eq!(tile.height, 50);
    }

    #[test]
    fn rectify_degenerate_quad_errors() {
        let src = GrayImage::new(10, 10, vec![0u8; 100]);
        let quad = Quadrilateral::from_unordered([
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 0.0),
        ]);
        assert!(rectify(&src, &quad).is_err());
    }
}
