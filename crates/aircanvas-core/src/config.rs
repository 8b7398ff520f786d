//! Drawing settings and their clamp ranges.

use crate::geometry::Rgba;
use serde::{Deserialize, Serialize};

/// Default minimum distance between two recorded stroke points.
pub const DEFAULT_MIN_POINT_DISTANCE: f32 = 0.01;

/// Settings governing local stroke creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawSettings {
    /// Color applied to the next started stroke.
    pub color: Rgba,
    /// Width applied to the next started stroke.
    pub stroke_width: f32,
    /// Clamp range for `stroke_width`.
    pub min_stroke_width: f32,
    pub max_stroke_width: f32,
    /// Minimum distance a sample must travel before it is recorded.
    pub min_point_distance: f32,
    /// Distance from the camera at which screen input is projected.
    pub drawing_distance: f32,
    /// Clamp range for `drawing_distance`.
    pub min_drawing_distance: f32,
    pub max_drawing_distance: f32,
}

impl Default for DrawSettings {
    fn default() -> Self {
        Self {
            color: Rgba::RED,
            stroke_width: 0.01,
            min_stroke_width: 0.005,
            max_stroke_width: 0.05,
            min_point_distance: DEFAULT_MIN_POINT_DISTANCE,
            drawing_distance: 1.5,
            min_drawing_distance: 0.5,
            max_drawing_distance: 3.0,
        }
    }
}

impl DrawSettings {
    /// Clamp a requested stroke width to the configured range.
    pub fn clamp_width(&self, width: f32) -> f32 {
        width.clamp(self.min_stroke_width, self.max_stroke_width)
    }

    /// Clamp a requested drawing distance to the configured range.
    pub fn clamp_drawing_distance(&self, distance: f32) -> f32 {
        distance.clamp(self.min_drawing_distance, self.max_drawing_distance)
    }
}
