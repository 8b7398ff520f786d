//! The engine context: one object owning all sync state.
//!
//! Replaces process-wide singleton managers with a single explicit context
//! constructed once by the embedder. All mutation goes through `&mut self`
//! methods; input samples and inbound network payloads must be marshaled
//! onto the same serialized context by the embedder (see the client demo's
//! poll loop), which is the only synchronization boundary the engine needs.

use crate::channel::Channel;
use crate::config::DrawSettings;
use crate::diagnostics::{DiagHandle, Diagnostics};
use crate::geometry::{Point3, Rgba};
use crate::publisher::{StrokeEvent, StrokePublisher};
use crate::registry::RemoteStrokeRegistry;
use crate::render::RenderSurface;
use crate::session::LocalStrokeSession;
use crate::wire::{CLEAR_ALL, WireMessage};

/// Phase of an input sample, as delivered by the external input sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPhase {
    Begin,
    Move,
    End,
}

/// Collaborative canvas engine for one peer.
pub struct CanvasEngine<C: Channel, S: RenderSurface> {
    settings: DrawSettings,
    session: LocalStrokeSession,
    registry: RemoteStrokeRegistry,
    publisher: StrokePublisher<C>,
    surface: S,
    diag: DiagHandle,
}

impl<C: Channel, S: RenderSurface> CanvasEngine<C, S> {
    pub fn new(peer_id: &str, settings: DrawSettings, channel: C, surface: S) -> Self {
        let diag = Diagnostics::new();
        Self {
            session: LocalStrokeSession::new(peer_id, &settings),
            registry: RemoteStrokeRegistry::new(peer_id, settings.stroke_width, diag.clone()),
            publisher: StrokePublisher::new(channel, peer_id, diag.clone()),
            surface,
            settings,
            diag,
        }
    }

    /// Route an input sample into the local stroke session, publishing
    /// whatever event it produces.
    pub fn handle_input(&mut self, position: Point3, phase: InputPhase) {
        let event = match phase {
            InputPhase::Begin => self.session.start(position, &mut self.surface),
            InputPhase::Move => self.session.append_point(position, &mut self.surface),
            InputPhase::End => {
                self.session.end();
                None
            }
        };
        if let Some(event) = event {
            if matches!(event, StrokeEvent::Start { .. }) {
                self.diag.record_local_stroke_started();
            }
            self.publisher.publish(event);
        }
        self.update_stroke_counts();
    }

    /// Process one raw inbound payload from the channel.
    ///
    /// Failures here are local and non-fatal: a malformed payload is dropped
    /// and the stream continues.
    pub fn handle_payload(&mut self, payload: &str) {
        match WireMessage::decode(payload) {
            Ok(WireMessage::Point(point)) => {
                self.registry.apply_point(&point, &mut self.surface);
            }
            Ok(WireMessage::Clear(cmd)) => {
                if cmd.command == CLEAR_ALL {
                    self.registry.apply_clear(&cmd, &mut self.surface);
                } else {
                    log::debug!("unknown command {:?} ignored", cmd.command);
                }
            }
            Err(e) => {
                log::warn!("inbound payload dropped: {}", e);
                self.diag.record_malformed_payload();
            }
        }
        self.update_stroke_counts();
    }

    /// Destroy this peer's own strokes. Remote strokes stay; nothing is
    /// published.
    pub fn clear_local(&mut self) {
        self.session.clear(&mut self.surface);
        self.update_stroke_counts();
    }

    /// Local clear followed by a broadcast clear request to all peers.
    pub fn clear_all(&mut self) {
        self.clear_local();
        self.publisher.publish(StrokeEvent::Clear);
    }

    pub fn set_color(&mut self, color: Rgba) {
        self.session.set_color(color);
    }

    pub fn set_width(&mut self, width: f32) {
        self.session.set_width(width);
        self.registry.set_render_width(self.session.width());
    }

    pub fn set_drawing_distance(&mut self, distance: f32) {
        self.settings.drawing_distance = self.settings.clamp_drawing_distance(distance);
    }

    pub fn drawing_distance(&self) -> f32 {
        self.settings.drawing_distance
    }

    /// Gate stroke starts on an external capability signal (e.g. the
    /// embedder's surface tracking).
    pub fn set_drawing_enabled(&mut self, enabled: bool) {
        self.session.set_drawing_enabled(enabled);
    }

    pub fn peer_id(&self) -> &str {
        self.publisher.peer_id()
    }

    pub fn session(&self) -> &LocalStrokeSession {
        &self.session
    }

    pub fn registry(&self) -> &RemoteStrokeRegistry {
        &self.registry
    }

    pub fn channel(&self) -> &C {
        self.publisher.channel()
    }

    pub fn channel_mut(&mut self) -> &mut C {
        self.publisher.channel_mut()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn diagnostics(&self) -> &DiagHandle {
        &self.diag
    }

    fn update_stroke_counts(&self) {
        self.diag
            .update_stroke_counts(self.session.stroke_count(), self.registry.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingSurface, ScriptedChannel};

    fn engine(peer: &str) -> CanvasEngine<ScriptedChannel, RecordingSurface> {
        CanvasEngine::new(
            peer,
            DrawSettings::default(),
            ScriptedChannel::authenticated(),
            RecordingSurface::new(),
        )
    }

    fn sent_payloads(engine: &CanvasEngine<ScriptedChannel, RecordingSurface>) -> Vec<String> {
        engine.channel().sent()
    }

    #[test]
    fn test_scenario_two_peer_stroke_and_clear() {
        let mut a = engine("A1");
        let mut b = engine("B1");

        // A draws a three-point stroke; both appends pass the filter.
        a.handle_input(Point3::new(0.0, 0.0, 0.0), InputPhase::Begin);
        a.handle_input(Point3::new(0.0, 0.0, 0.02), InputPhase::Move);
        a.handle_input(Point3::new(0.0, 0.0, 0.05), InputPhase::Move);
        let stroke_id = a.session().active_stroke().unwrap().id.clone();
        a.handle_input(Point3::new(0.0, 0.0, 0.05), InputPhase::End);

        let published = sent_payloads(&a);
        assert_eq!(published.len(), 3);

        // The transport may deliver A's publications back to A.
        for payload in &published {
            a.handle_payload(payload);
            b.handle_payload(payload);
        }

        assert!(a.registry().is_empty());
        assert_eq!(b.registry().len(), 1);
        let remote = b.registry().get(&stroke_id).unwrap();
        assert_eq!(remote.len(), 3);
        assert_eq!(remote.color, Rgba::RED);
        assert_eq!(remote.owner, "A1");

        // A broadcasts a clear; B's remote set empties, A's does not react
        // to its own echo.
        a.clear_all();
        let clear_payloads = sent_payloads(&a);
        assert_eq!(clear_payloads.len(), 4);
        let clear = clear_payloads.last().unwrap();
        a.handle_payload(clear);
        b.handle_payload(clear);

        assert!(b.registry().is_empty());
        assert!(a.registry().is_empty());
    }

    #[test]
    fn test_self_echo_never_mutates_remote_set() {
        let mut a = engine("A1");

        a.handle_input(Point3::ZERO, InputPhase::Begin);
        for payload in sent_payloads(&a) {
            a.handle_payload(&payload);
        }
        assert!(a.registry().is_empty());
        assert_eq!(a.session().stroke_count(), 1);
    }

    #[test]
    fn test_local_clear_keeps_remote_set() {
        let mut a = engine("A1");

        let remote = crate::wire::DrawingPoint::new("r1", Point3::ZERO, Rgba::GREEN, true, "B1")
            .to_json()
            .unwrap();
        a.handle_payload(&remote);
        a.handle_input(Point3::ZERO, InputPhase::Begin);
        a.handle_input(Point3::ZERO, InputPhase::End);

        a.clear_local();

        assert_eq!(a.session().stroke_count(), 0);
        assert_eq!(a.registry().len(), 1);
        // A plain local clear publishes nothing.
        assert_eq!(sent_payloads(&a).len(), 1);
    }

    #[test]
    fn test_malformed_payload_is_dropped_and_stream_continues() {
        let mut a = engine("A1");

        a.handle_payload("{{{ not json");
        let remote = crate::wire::DrawingPoint::new("r1", Point3::ZERO, Rgba::BLUE, true, "B1")
            .to_json()
            .unwrap();
        a.handle_payload(&remote);

        assert_eq!(a.diagnostics().malformed_payloads(), 1);
        assert_eq!(a.registry().len(), 1);
    }

    #[test]
    fn test_unknown_command_ignored() {
        let mut a = engine("A1");
        a.handle_payload(r#"{"command":"CLEAR_SOME","publisherId":"B1","timestamp":5}"#);
        assert!(a.registry().is_empty());
        assert_eq!(a.diagnostics().malformed_payloads(), 0);
    }

    #[test]
    fn test_filtered_point_not_published() {
        let mut a = engine("A1");

        a.handle_input(Point3::ZERO, InputPhase::Begin);
        // Within 0.01 of the start point: exactly one publish (the start).
        a.handle_input(Point3::new(0.0, 0.0, 0.005), InputPhase::Move);

        assert_eq!(sent_payloads(&a).len(), 1);
    }

    #[test]
    fn test_gate_closing_mid_stroke_drops_events_only() {
        let mut a = engine("A1");

        a.handle_input(Point3::ZERO, InputPhase::Begin);
        a.channel().set_authenticated(false);
        a.handle_input(Point3::new(0.0, 0.0, 0.02), InputPhase::Move);
        a.channel().set_authenticated(true);
        a.handle_input(Point3::new(0.0, 0.0, 0.04), InputPhase::Move);

        // The point drawn while unauthenticated was lost, not queued.
        assert_eq!(sent_payloads(&a).len(), 2);
        assert_eq!(a.session().active_stroke().unwrap().len(), 3);
    }

    #[test]
    fn test_unauthenticated_drawing_still_renders_locally() {
        let mut a = CanvasEngine::new(
            "A1",
            DrawSettings::default(),
            ScriptedChannel::unauthenticated(),
            RecordingSurface::new(),
        );

        a.handle_input(Point3::ZERO, InputPhase::Begin);
        a.handle_input(Point3::new(0.0, 0.0, 0.02), InputPhase::Move);

        assert!(sent_payloads(&a).is_empty());
        assert_eq!(a.diagnostics().dropped_unauthenticated(), 2);
        assert_eq!(a.session().active_stroke().unwrap().len(), 2);
    }
}
