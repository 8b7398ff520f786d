//! Render surface collaborator seam.
//!
//! The engine never renders anything itself; it drives an external surface
//! through this trait. A handle is owned 1:1 by the stroke entry that
//! created it and destroyed exactly once, when that entry is evicted,
//! replaced, or cleared.

use crate::geometry::{Point3, Rgba};

/// Opaque handle to a stroke's render resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrokeHandle(pub u64);

/// External rendering collaborator.
pub trait RenderSurface {
    /// Allocate a render resource for a new stroke.
    fn create_stroke(&mut self, color: Rgba, width: f32) -> StrokeHandle;
    /// Extend a stroke's rendered path by one point.
    fn append_point(&mut self, handle: StrokeHandle, point: Point3);
    /// Release a stroke's render resource.
    fn destroy_stroke(&mut self, handle: StrokeHandle);
}

/// Surface that renders nothing. For headless embedders and tools.
#[derive(Debug, Default)]
pub struct NullSurface {
    next_handle: u64,
}

impl NullSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderSurface for NullSurface {
    fn create_stroke(&mut self, _color: Rgba, _width: f32) -> StrokeHandle {
        self.next_handle += 1;
        StrokeHandle(self.next_handle)
    }

    fn append_point(&mut self, _handle: StrokeHandle, _point: Point3) {}

    fn destroy_stroke(&mut self, _handle: StrokeHandle) {}
}
