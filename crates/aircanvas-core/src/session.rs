//! Local stroke session: the state machine for this peer's own drawing.

use crate::config::DrawSettings;
use crate::geometry::{Point3, Rgba, passes_min_distance};
use crate::publisher::StrokeEvent;
use crate::render::{RenderSurface, StrokeHandle};
use crate::stroke::Stroke;

/// A local stroke paired with the render resource it owns.
#[derive(Debug)]
struct LocalStroke {
    stroke: Stroke,
    handle: StrokeHandle,
}

#[derive(Debug)]
enum SessionState {
    Idle,
    Active(LocalStroke),
}

/// Owns the single in-progress local stroke plus the completed strokes
/// retained for rendering. At most one stroke is active at a time; starting
/// while active is a logged no-op.
///
/// Stroke events returned by `start` and `append_point` are for the caller
/// to hand to the publisher. `end` returns nothing: stroke completion is a
/// purely local transition and is never put on the wire, so remote peers
/// only ever see a stroke disappear through replacement or a clear.
#[derive(Debug)]
pub struct LocalStrokeSession {
    peer_id: String,
    state: SessionState,
    completed: Vec<LocalStroke>,
    color: Rgba,
    width: f32,
    min_point_distance: f32,
    min_width: f32,
    max_width: f32,
    /// External capability signal (e.g. surface tracking established).
    /// Starting a stroke is refused while this is false.
    drawing_enabled: bool,
}

impl LocalStrokeSession {
    pub fn new(peer_id: &str, settings: &DrawSettings) -> Self {
        Self {
            peer_id: peer_id.to_string(),
            state: SessionState::Idle,
            completed: Vec::new(),
            color: settings.color,
            width: settings.stroke_width,
            min_point_distance: settings.min_point_distance,
            min_width: settings.min_stroke_width,
            max_width: settings.max_stroke_width,
            drawing_enabled: true,
        }
    }

    /// Begin a new stroke at `position`. Returns the start event to publish,
    /// or `None` if the session is already active or drawing is disabled.
    pub fn start(
        &mut self,
        position: Point3,
        surface: &mut dyn RenderSurface,
    ) -> Option<StrokeEvent> {
        if !self.drawing_enabled {
            log::debug!("start ignored: drawing disabled");
            return None;
        }
        if let SessionState::Active(ref active) = self.state {
            log::warn!("start ignored: stroke {} still active", active.stroke.id);
            return None;
        }

        let stroke = Stroke::begin(&self.peer_id, self.color, self.width, position);
        let handle = surface.create_stroke(self.color, self.width);
        surface.append_point(handle, position);

        let event = StrokeEvent::Start {
            id: stroke.id.clone(),
            point: position,
            color: self.color,
            width: self.width,
        };
        log::debug!("stroke {} started", stroke.id);
        self.state = SessionState::Active(LocalStroke { stroke, handle });
        Some(event)
    }

    /// Record a sample for the active stroke. Samples closer than the
    /// configured minimum distance to the last recorded point are neither
    /// stored nor published.
    pub fn append_point(
        &mut self,
        position: Point3,
        surface: &mut dyn RenderSurface,
    ) -> Option<StrokeEvent> {
        let SessionState::Active(ref mut active) = self.state else {
            log::debug!("append ignored: no active stroke");
            return None;
        };

        let last = active.stroke.last_point()?;
        if !passes_min_distance(last, position, self.min_point_distance) {
            return None;
        }

        active.stroke.append(position);
        surface.append_point(active.handle, position);
        Some(StrokeEvent::Append {
            id: active.stroke.id.clone(),
            point: position,
            color: active.stroke.color,
        })
    }

    /// Finish the active stroke, retaining it for rendering. No wire event.
    pub fn end(&mut self) {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Active(active) => {
                log::debug!(
                    "stroke {} completed: {} points",
                    active.stroke.id,
                    active.stroke.len()
                );
                self.completed.push(active);
            }
            SessionState::Idle => {
                log::debug!("end ignored: no active stroke");
            }
        }
    }

    /// Destroy every local stroke and its render resource. Remote strokes
    /// are not touched and nothing is published.
    pub fn clear(&mut self, surface: &mut dyn RenderSurface) {
        if let SessionState::Active(active) = std::mem::replace(&mut self.state, SessionState::Idle)
        {
            surface.destroy_stroke(active.handle);
        }
        for local in self.completed.drain(..) {
            surface.destroy_stroke(local.handle);
        }
        log::debug!("local strokes cleared");
    }

    /// Set the color used by the next `start`. The active stroke keeps the
    /// color it was started with.
    pub fn set_color(&mut self, color: Rgba) {
        self.color = color;
    }

    /// Set the width used by the next `start`, clamped to the configured
    /// range.
    pub fn set_width(&mut self, width: f32) {
        self.width = width.clamp(self.min_width, self.max_width);
    }

    pub fn set_drawing_enabled(&mut self, enabled: bool) {
        self.drawing_enabled = enabled;
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active(_))
    }

    pub fn active_stroke(&self) -> Option<&Stroke> {
        match self.state {
            SessionState::Active(ref active) => Some(&active.stroke),
            SessionState::Idle => None,
        }
    }

    /// Total local strokes currently held (active plus completed).
    pub fn stroke_count(&self) -> usize {
        self.completed.len() + usize::from(self.is_active())
    }

    pub fn color(&self) -> Rgba {
        self.color
    }

    pub fn width(&self) -> f32 {
        self.width
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSurface;

    fn session() -> LocalStrokeSession {
        LocalStrokeSession::new("peer-a", &DrawSettings::default())
    }

    #[test]
    fn test_start_creates_active_stroke() {
        let mut session = session();
        let mut surface = RecordingSurface::new();

        let event = session.start(Point3::ZERO, &mut surface);

        assert!(session.is_active());
        assert!(matches!(event, Some(StrokeEvent::Start { .. })));
        assert_eq!(session.active_stroke().unwrap().len(), 1);
        assert_eq!(surface.created.len(), 1);
    }

    #[test]
    fn test_start_while_active_is_noop() {
        let mut session = session();
        let mut surface = RecordingSurface::new();

        session.start(Point3::ZERO, &mut surface);
        let id = session.active_stroke().unwrap().id.clone();
        let points = session.active_stroke().unwrap().len();

        let event = session.start(Point3::new(1.0, 1.0, 1.0), &mut surface);

        assert!(event.is_none());
        assert_eq!(session.active_stroke().unwrap().id, id);
        assert_eq!(session.active_stroke().unwrap().len(), points);
        assert_eq!(surface.created.len(), 1);
    }

    #[test]
    fn test_start_refused_when_drawing_disabled() {
        let mut session = session();
        let mut surface = RecordingSurface::new();

        session.set_drawing_enabled(false);
        assert!(session.start(Point3::ZERO, &mut surface).is_none());
        assert!(!session.is_active());
    }

    #[test]
    fn test_append_filters_close_points() {
        let mut session = session();
        let mut surface = RecordingSurface::new();

        session.start(Point3::ZERO, &mut surface);
        // Within 0.01 of the last point: rejected, not stored, not published.
        let rejected = session.append_point(Point3::new(0.0, 0.0, 0.005), &mut surface);
        let accepted = session.append_point(Point3::new(0.0, 0.0, 0.02), &mut surface);

        assert!(rejected.is_none());
        assert!(matches!(accepted, Some(StrokeEvent::Append { .. })));
        assert_eq!(session.active_stroke().unwrap().len(), 2);
        // Rejected points never reach the surface either.
        assert_eq!(surface.appended.len(), 2);
    }

    #[test]
    fn test_append_without_active_stroke() {
        let mut session = session();
        let mut surface = RecordingSurface::new();
        assert!(
            session
                .append_point(Point3::new(1.0, 0.0, 0.0), &mut surface)
                .is_none()
        );
    }

    #[test]
    fn test_end_retains_stroke_locally() {
        let mut session = session();
        let mut surface = RecordingSurface::new();

        session.start(Point3::ZERO, &mut surface);
        session.end();

        assert!(!session.is_active());
        assert_eq!(session.stroke_count(), 1);
        // Ending destroys nothing: the stroke stays visible.
        assert!(surface.destroyed.is_empty());
    }

    #[test]
    fn test_width_clamped() {
        let mut session = session();
        session.set_width(9.0);
        assert!((session.width() - 0.05).abs() < f32::EPSILON);
        session.set_width(0.0001);
        assert!((session.width() - 0.005).abs() < f32::EPSILON);
    }

    #[test]
    fn test_color_applies_to_next_start_only() {
        let mut session = session();
        let mut surface = RecordingSurface::new();

        session.start(Point3::ZERO, &mut surface);
        session.set_color(Rgba::BLUE);
        assert_eq!(session.active_stroke().unwrap().color, Rgba::RED);

        session.end();
        session.start(Point3::ZERO, &mut surface);
        assert_eq!(session.active_stroke().unwrap().color, Rgba::BLUE);
    }

    #[test]
    fn test_clear_destroys_all_handles() {
        let mut session = session();
        let mut surface = RecordingSurface::new();

        session.start(Point3::ZERO, &mut surface);
        session.end();
        session.start(Point3::new(1.0, 0.0, 0.0), &mut surface);

        session.clear(&mut surface);

        assert_eq!(session.stroke_count(), 0);
        assert!(!session.is_active());
        assert_eq!(surface.destroyed.len(), 2);
    }
}
