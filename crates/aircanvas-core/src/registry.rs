//! Remote stroke registry: reconciliation of inbound stroke events.
//!
//! The registry turns an unordered, loss-tolerant stream of remote messages
//! into a consistent set of remote strokes. It never buffers, never replays
//! and never guesses at causality it cannot observe: an append for an id it
//! does not hold is dropped, whether that stroke never existed or was just
//! cleared. Strokes are evicted only by an explicit clear or by replacement,
//! so a remote stroke persists until its owner restarts the id or someone
//! clears — there is no stroke-end message and no idle-timeout collection.

use crate::diagnostics::DiagHandle;
use crate::render::{RenderSurface, StrokeHandle};
use crate::stroke::Stroke;
use crate::wire::{ClearCommand, DrawingPoint};
use std::collections::HashMap;

/// A remote stroke paired with the render resource it owns.
#[derive(Debug)]
struct RemoteStroke {
    stroke: Stroke,
    handle: StrokeHandle,
}

/// Holds every stroke originated by other peers, keyed by stroke id.
pub struct RemoteStrokeRegistry {
    local_peer: String,
    strokes: HashMap<String, RemoteStroke>,
    /// Width used to render remote strokes; the wire carries none.
    render_width: f32,
    diag: DiagHandle,
}

impl RemoteStrokeRegistry {
    pub fn new(local_peer: &str, render_width: f32, diag: DiagHandle) -> Self {
        Self {
            local_peer: local_peer.to_string(),
            strokes: HashMap::new(),
            render_width,
            diag,
        }
    }

    /// Apply an inbound drawing point.
    ///
    /// Self-originated points are discarded silently. A start for an id
    /// already present replaces the existing stroke (last-start-wins): a
    /// duplicate start is a republish, not an error. An append for an
    /// unknown id is dropped as an orphan.
    pub fn apply_point(&mut self, point: &DrawingPoint, surface: &mut dyn RenderSurface) {
        if point.publisher_id == self.local_peer {
            return;
        }
        self.diag.record_point_received();

        if point.is_start {
            if let Some(existing) = self.strokes.remove(&point.line_id) {
                surface.destroy_stroke(existing.handle);
                log::debug!("stroke {} replaced by new start", point.line_id);
            }

            let stroke = Stroke::begin_remote(
                &point.line_id,
                &point.publisher_id,
                point.color(),
                self.render_width,
                point.position(),
            );
            let handle = surface.create_stroke(point.color(), self.render_width);
            surface.append_point(handle, point.position());
            self.strokes
                .insert(point.line_id.clone(), RemoteStroke { stroke, handle });
            self.diag.record_remote_stroke_started();
            log::debug!(
                "remote stroke {} started by {}",
                point.line_id,
                point.publisher_id
            );
        } else {
            match self.strokes.get_mut(&point.line_id) {
                Some(entry) => {
                    // No distance filtering on the receive path: points are
                    // rendered exactly as received.
                    entry.stroke.append(point.position());
                    surface.append_point(entry.handle, point.position());
                }
                None => {
                    log::warn!("point received for unknown stroke {}", point.line_id);
                    self.diag.record_orphan_point();
                }
            }
        }
    }

    /// Apply an inbound clear command: evict every remote stroke. Local
    /// strokes are never affected by a received clear.
    pub fn apply_clear(&mut self, cmd: &ClearCommand, surface: &mut dyn RenderSurface) {
        if cmd.publisher_id == self.local_peer {
            return;
        }
        self.diag.record_clear_received();

        log::info!("clear received from {}", cmd.publisher_id);
        for (_, entry) in self.strokes.drain() {
            surface.destroy_stroke(entry.handle);
        }
    }

    pub fn set_render_width(&mut self, width: f32) {
        self.render_width = width;
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.strokes.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Stroke> {
        self.strokes.get(id).map(|entry| &entry.stroke)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::geometry::{Point3, Rgba};
    use crate::testing::RecordingSurface;

    fn registry() -> RemoteStrokeRegistry {
        RemoteStrokeRegistry::new("peer-a", 0.01, Diagnostics::new())
    }

    fn start(id: &str, publisher: &str, pos: Point3) -> DrawingPoint {
        DrawingPoint::new(id, pos, Rgba::RED, true, publisher)
    }

    fn append(id: &str, publisher: &str, pos: Point3) -> DrawingPoint {
        DrawingPoint::new(id, pos, Rgba::RED, false, publisher)
    }

    #[test]
    fn test_self_echo_discarded() {
        let mut registry = registry();
        let mut surface = RecordingSurface::new();

        registry.apply_point(&start("line-1", "peer-a", Point3::ZERO), &mut surface);

        assert!(registry.is_empty());
        assert!(surface.created.is_empty());
    }

    #[test]
    fn test_start_creates_remote_stroke() {
        let mut registry = registry();
        let mut surface = RecordingSurface::new();

        registry.apply_point(&start("line-1", "peer-b", Point3::ZERO), &mut surface);

        assert_eq!(registry.len(), 1);
        let stroke = registry.get("line-1").unwrap();
        assert_eq!(stroke.owner, "peer-b");
        assert_eq!(stroke.len(), 1);
    }

    #[test]
    fn test_duplicate_start_replaces() {
        let mut registry = registry();
        let mut surface = RecordingSurface::new();

        registry.apply_point(&start("line-1", "peer-b", Point3::ZERO), &mut surface);
        registry.apply_point(
            &append("line-1", "peer-b", Point3::new(0.0, 0.0, 0.5)),
            &mut surface,
        );
        registry.apply_point(
            &start("line-1", "peer-b", Point3::new(9.0, 9.0, 9.0)),
            &mut surface,
        );

        // Exactly one stroke at the id, holding only the second start's point.
        assert_eq!(registry.len(), 1);
        let stroke = registry.get("line-1").unwrap();
        assert_eq!(stroke.len(), 1);
        assert_eq!(stroke.points[0], Point3::new(9.0, 9.0, 9.0));
        // The evicted stroke's render resource was released.
        assert_eq!(surface.destroyed.len(), 1);
        assert_eq!(surface.destroyed[0], surface.created[0]);
    }

    #[test]
    fn test_orphan_append_dropped() {
        let diag = Diagnostics::new();
        let mut registry = RemoteStrokeRegistry::new("peer-a", 0.01, diag.clone());
        let mut surface = RecordingSurface::new();

        registry.apply_point(&append("ghost", "peer-b", Point3::ZERO), &mut surface);

        assert!(registry.is_empty());
        assert_eq!(diag.orphan_points(), 1);
    }

    #[test]
    fn test_append_has_no_distance_filter() {
        let mut registry = registry();
        let mut surface = RecordingSurface::new();

        registry.apply_point(&start("line-1", "peer-b", Point3::ZERO), &mut surface);
        // Duplicate and near-duplicate positions are appended as received.
        registry.apply_point(&append("line-1", "peer-b", Point3::ZERO), &mut surface);
        registry.apply_point(
            &append("line-1", "peer-b", Point3::new(0.0, 0.0, 0.001)),
            &mut surface,
        );

        assert_eq!(registry.get("line-1").unwrap().len(), 3);
    }

    #[test]
    fn test_clear_evicts_all_remote_strokes() {
        let mut registry = registry();
        let mut surface = RecordingSurface::new();

        registry.apply_point(&start("line-1", "peer-b", Point3::ZERO), &mut surface);
        registry.apply_point(&start("line-2", "peer-c", Point3::ZERO), &mut surface);

        registry.apply_clear(&ClearCommand::new("peer-b", 1), &mut surface);

        assert!(registry.is_empty());
        assert_eq!(surface.destroyed.len(), 2);
    }

    #[test]
    fn test_own_clear_echo_ignored() {
        let mut registry = registry();
        let mut surface = RecordingSurface::new();

        registry.apply_point(&start("line-1", "peer-b", Point3::ZERO), &mut surface);
        registry.apply_clear(&ClearCommand::new("peer-a", 1), &mut surface);

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_append_after_clear_is_orphan() {
        let mut registry = registry();
        let mut surface = RecordingSurface::new();

        registry.apply_point(&start("line-1", "peer-b", Point3::ZERO), &mut surface);
        registry.apply_clear(&ClearCommand::new("peer-c", 1), &mut surface);
        registry.apply_point(
            &append("line-1", "peer-b", Point3::new(1.0, 0.0, 0.0)),
            &mut surface,
        );

        // "Existed, then cleared" is indistinguishable from "never existed".
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remote_stroke_uses_local_render_width() {
        let mut registry = RemoteStrokeRegistry::new("peer-a", 0.03, Diagnostics::new());
        let mut surface = RecordingSurface::new();

        registry.apply_point(&start("line-1", "peer-b", Point3::ZERO), &mut surface);

        assert!((registry.get("line-1").unwrap().width - 0.03).abs() < f32::EPSILON);
    }
}
