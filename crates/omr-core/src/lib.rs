//! Core types and numeric utilities for the exam-sheet OMR pipeline.
//!
//! This crate is intentionally small and purely geometric/numeric. It does
//! *not* decode images itself and has no dependency on the `image` crate —
//! callers hand it raw grayscale buffers (see [`GrayImage`]).

mod homography;
mod image;
pub mod logger;
mod part;
mod quad;
mod stats;

pub use homography::{homography_from_4pt, warp_perspective_gray, Homography};
pub use image::{sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView};
pub use part::Part;
pub use quad::{order_quad_points, Quadrilateral, Region};
pub use stats::{percentile, CellStats};
