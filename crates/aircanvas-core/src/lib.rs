//! AirCanvas Core Library
//!
//! Collaborative stroke synchronization engine: the local stroke session,
//! the wire encoding of stroke events, and the reconciliation of remote
//! strokes received over a best-effort pub/sub channel. Rendering, input
//! sampling and the transport itself are collaborators reached through
//! traits.

pub mod channel;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod geometry;
pub mod publisher;
pub mod registry;
pub mod render;
pub mod session;
pub mod stroke;
pub mod wire;

pub use channel::{Channel, ChannelEvent, ConnectionState, NativeChannel};
pub use config::DrawSettings;
pub use diagnostics::{DiagHandle, Diagnostics};
pub use engine::{CanvasEngine, InputPhase};
pub use geometry::{Point3, Rgba, passes_min_distance};
pub use publisher::{StrokeEvent, StrokePublisher};
pub use registry::RemoteStrokeRegistry;
pub use render::{NullSurface, RenderSurface, StrokeHandle};
pub use session::LocalStrokeSession;
pub use stroke::Stroke;
pub use wire::{CLEAR_ALL, ClearCommand, DrawingPoint, WireError, WireMessage};
