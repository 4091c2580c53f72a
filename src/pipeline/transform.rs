//! Coordinate conversion between the two spaces the pipeline works in.
//!
//! Text positions are measured top-down (y grows downwards from the top
//! edge of the page), which is how anchors and boundaries are expressed.
//! PDF page boxes are bottom-up (y grows upwards from the bottom edge).
//! The conversion is intrinsic to the output format, not to any backend.

use crate::pipeline::segment::Boundary;
use serde::Serialize;

/// A crop rectangle in bottom-up PDF space, as written to `/CropBox` and
/// `/MediaBox`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CropRect {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl CropRect {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }
}

/// Convert a top-down boundary into a full-width bottom-up crop rectangle.
pub fn to_crop_rect(boundary: Boundary, page_height: f32, page_width: f32) -> CropRect {
    CropRect {
        left: 0.0,
        bottom: page_height - boundary.y_end,
        right: page_width,
        top: page_height - boundary.y_start,
    }
}

/// Inverse of [`to_crop_rect`]: recover the top-down boundary.
pub fn to_boundary(rect: CropRect, page_height: f32) -> Boundary {
    Boundary {
        y_start: page_height - rect.top,
        y_end: page_height - rect.bottom,
    }
}
