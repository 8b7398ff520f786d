//! Publish side of the stroke protocol.

use crate::channel::Channel;
use crate::diagnostics::DiagHandle;
use crate::geometry::{Point3, Rgba};
use crate::wire::{ClearCommand, DrawingPoint};
use std::time::{SystemTime, UNIX_EPOCH};

/// An outbound stroke event produced by the local session.
///
/// `width` on `Start` travels no further than the local render surface:
/// the wire format carries no width field, so receivers render remote
/// strokes with their own configured width.
#[derive(Debug, Clone)]
pub enum StrokeEvent {
    Start {
        id: String,
        point: Point3,
        color: Rgba,
        width: f32,
    },
    Append {
        id: String,
        point: Point3,
        color: Rgba,
    },
    Clear,
}

/// Serializes stroke events and hands them to the channel.
///
/// Every publish is gated on the channel's authenticated flag; when the gate
/// is closed the event is dropped with a warning. There is no queue and no
/// retry, and delivery is never awaited.
pub struct StrokePublisher<C: Channel> {
    channel: C,
    peer_id: String,
    diag: DiagHandle,
}

impl<C: Channel> StrokePublisher<C> {
    pub fn new(channel: C, peer_id: &str, diag: DiagHandle) -> Self {
        Self {
            channel,
            peer_id: peer_id.to_string(),
            diag,
        }
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Publish an event, or drop it if the channel is not authenticated.
    pub fn publish(&self, event: StrokeEvent) {
        if !self.channel.is_authenticated() {
            log::warn!("cannot publish: channel not authenticated; event dropped");
            self.diag.record_dropped_unauthenticated();
            return;
        }

        let encoded = match &event {
            StrokeEvent::Start {
                id, point, color, ..
            } => DrawingPoint::new(id, *point, *color, true, &self.peer_id).to_json(),
            StrokeEvent::Append { id, point, color } => {
                DrawingPoint::new(id, *point, *color, false, &self.peer_id).to_json()
            }
            StrokeEvent::Clear => ClearCommand::new(&self.peer_id, unix_millis()).to_json(),
        };

        match encoded {
            Ok(payload) => {
                self.channel.publish(&payload);
                match event {
                    StrokeEvent::Clear => self.diag.record_clear_sent(),
                    _ => self.diag.record_point_sent(),
                }
            }
            Err(e) => log::warn!("event encode failed: {}", e),
        }
    }
}

fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
