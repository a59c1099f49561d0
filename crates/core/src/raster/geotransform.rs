//! Affine geotransformation for rasters

use serde::{Deserialize, Serialize};

/// Tolerance used when deciding whether two grids are co-registered.
const COREGISTRATION_EPSILON: f64 = 1e-9;

/// Affine transformation coefficients for georeferencing rasters.
///
/// Converts between pixel coordinates (col, row) and geographic coordinates (x, y):
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// Every layer of a raster stack, and the validity mask applied to it,
/// must carry the same transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Pixel width (cell size in X direction)
    pub pixel_width: f64,
    /// Pixel height (cell size in Y direction, usually negative)
    pub pixel_height: f64,
    /// Rotation about X axis (usually 0)
    pub row_rotation: f64,
    /// Rotation about Y axis (usually 0)
    pub col_rotation: f64,
}

impl GeoTransform {
    /// Create a new GeoTransform with no rotation (north-up image)
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Transform of the sub-grid starting at (row_offset, col_offset)
    pub fn offset(&self, row_offset: usize, col_offset: usize) -> Self {
        let (x, y) = self.apply(col_offset as f64, row_offset as f64);
        Self {
            origin_x: x,
            origin_y: y,
            ..*self
        }
    }

    fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.origin_x + col * self.pixel_width + row * self.row_rotation;
        let y = self.origin_y + col * self.col_rotation + row * self.pixel_height;
        (x, y)
    }

    /// Whether two transforms describe the same pixel grid
    pub fn coregistered_with(&self, other: &GeoTransform) -> bool {
        let a = [
            self.origin_x,
            self.origin_y,
            self.pixel_width,
            self.pixel_height,
            self.row_rotation,
            self.col_rotation,
        ];
        let b = [
            other.origin_x,
            other.origin_y,
            other.pixel_width,
            other.pixel_height,
            other.row_rotation,
            other.col_rotation,
        ];
        a.iter()
            .zip(b.iter())
            .all(|(x, y)| (x - y).abs() <= COREGISTRATION_EPSILON * x.abs().max(1.0))
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
