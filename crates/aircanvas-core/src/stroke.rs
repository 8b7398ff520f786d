//! Stroke data: an ordered, append-only point sequence with one owner.

use crate::geometry::{Point3, Rgba};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A freehand stroke drawn by a single peer.
///
/// Points are stored in append order and never reordered. A stroke id is
/// never reused by its owning peer for a different stroke; an inbound
/// duplicate start for the same id means "replace".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stroke {
    /// Globally unique stroke id.
    pub id: String,
    /// Peer that drew this stroke.
    pub owner: String,
    pub color: Rgba,
    pub width: f32,
    pub points: Vec<Point3>,
}

impl Stroke {
    /// Create a stroke with a fresh UUID and its first point.
    pub fn begin(owner: &str, color: Rgba, width: f32, first: Point3) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            color,
            width,
            points: vec![first],
        }
    }

    /// Create a stroke carrying an id assigned by a remote peer.
    pub fn begin_remote(id: &str, owner: &str, color: Rgba, width: f32, first: Point3) -> Self {
        Self {
            id: id.to_string(),
            owner: owner.to_string(),
            color,
            width,
            points: vec![first],
        }
    }

    pub fn append(&mut self, point: Point3) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last_point(&self) -> Option<Point3> {
        self.points.last().copied()
    }
}
