//! Wire format for stroke events on the pub/sub channel.
//!
//! Messages are flat JSON objects with no type tag. A payload is a
//! [`ClearCommand`] if and only if it contains a `command` field; everything
//! else is a [`DrawingPoint`]. Implementations on every peer rely on this
//! discrimination rule, so it must be preserved exactly.

use crate::geometry::{Point3, Rgba};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The only clear command understood by peers.
pub const CLEAR_ALL: &str = "CLEAR_ALL";

/// Errors produced while decoding inbound payloads.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A single stroke sample. `isStart: true` opens a new stroke under
/// `lineId`; `isStart: false` appends to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingPoint {
    pub line_id: String,
    pub p_x: f32,
    pub p_y: f32,
    pub p_z: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
    pub is_start: bool,
    pub publisher_id: String,
}

impl DrawingPoint {
    pub fn new(
        line_id: &str,
        position: Point3,
        color: Rgba,
        is_start: bool,
        publisher_id: &str,
    ) -> Self {
        Self {
            line_id: line_id.to_string(),
            p_x: position.x,
            p_y: position.y,
            p_z: position.z,
            r: color.r,
            g: color.g,
            b: color.b,
            a: color.a,
            is_start,
            publisher_id: publisher_id.to_string(),
        }
    }

    pub fn position(&self) -> Point3 {
        Point3::new(self.p_x, self.p_y, self.p_z)
    }

    pub fn color(&self) -> Rgba {
        Rgba::new(self.r, self.g, self.b, self.a)
    }

    pub fn to_json(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A broadcast clear request. Not tied to any stroke id; the timestamp is
/// informational and never used for ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearCommand {
    pub command: String,
    pub publisher_id: String,
    pub timestamp: i64,
}

impl ClearCommand {
    pub fn new(publisher_id: &str, timestamp: i64) -> Self {
        Self {
            command: CLEAR_ALL.to_string(),
            publisher_id: publisher_id.to_string(),
            timestamp,
        }
    }

    pub fn to_json(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A decoded inbound payload.
#[derive(Debug, Clone)]
pub enum WireMessage {
    Point(DrawingPoint),
    Clear(ClearCommand),
}

impl WireMessage {
    /// Decode a raw payload, discriminating on the presence of the
    /// `command` field.
    pub fn decode(payload: &str) -> Result<WireMessage, WireError> {
        if payload.contains("\"command\"") {
            Ok(WireMessage::Clear(serde_json::from_str(payload)?))
        } else {
            Ok(WireMessage::Point(serde_json::from_str(payload)?))
        }
    }
}
