//! Fire-and-forget counters for the sync engine.
//!
//! One `Diagnostics` instance is constructed per engine and shared by
//! reference-counted handle with the components that feed it. It never
//! blocks and never influences control flow.

use std::cell::Cell;
use std::fmt::Write as _;
use std::rc::Rc;

/// Shared handle to the engine's diagnostics context.
pub type DiagHandle = Rc<Diagnostics>;

#[derive(Debug, Default)]
pub struct Diagnostics {
    points_sent: Cell<u64>,
    points_received: Cell<u64>,
    clears_sent: Cell<u64>,
    clears_received: Cell<u64>,
    strokes_started_local: Cell<u64>,
    strokes_started_remote: Cell<u64>,
    orphan_points: Cell<u64>,
    dropped_unauthenticated: Cell<u64>,
    malformed_payloads: Cell<u64>,
    active_local: Cell<usize>,
    active_remote: Cell<usize>,
}

impl Diagnostics {
    pub fn new() -> DiagHandle {
        Rc::new(Self::default())
    }

    pub fn record_point_sent(&self) {
        self.points_sent.set(self.points_sent.get() + 1);
    }

    pub fn record_point_received(&self) {
        self.points_received.set(self.points_received.get() + 1);
    }

    pub fn record_clear_sent(&self) {
        self.clears_sent.set(self.clears_sent.get() + 1);
    }

    pub fn record_clear_received(&self) {
        self.clears_received.set(self.clears_received.get() + 1);
    }

    pub fn record_local_stroke_started(&self) {
        self.strokes_started_local
            .set(self.strokes_started_local.get() + 1);
    }

    pub fn record_remote_stroke_started(&self) {
        self.strokes_started_remote
            .set(self.strokes_started_remote.get() + 1);
    }

    pub fn record_orphan_point(&self) {
        self.orphan_points.set(self.orphan_points.get() + 1);
    }

    pub fn record_dropped_unauthenticated(&self) {
        self.dropped_unauthenticated
            .set(self.dropped_unauthenticated.get() + 1);
    }

    pub fn record_malformed_payload(&self) {
        self.malformed_payloads
            .set(self.malformed_payloads.get() + 1);
    }

    pub fn update_stroke_counts(&self, local: usize, remote: usize) {
        self.active_local.set(local);
        self.active_remote.set(remote);
    }

    pub fn points_sent(&self) -> u64 {
        self.points_sent.get()
    }

    pub fn points_received(&self) -> u64 {
        self.points_received.get()
    }

    pub fn orphan_points(&self) -> u64 {
        self.orphan_points.get()
    }

    pub fn dropped_unauthenticated(&self) -> u64 {
        self.dropped_unauthenticated.get()
    }

    pub fn malformed_payloads(&self) -> u64 {
        self.malformed_payloads.get()
    }

    /// Plain-text counter dump for logs and debug overlays.
    pub fn report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== SYNC DIAGNOSTICS ===");
        let _ = writeln!(
            out,
            "sent: points={} clears={}",
            self.points_sent.get(),
            self.clears_sent.get()
        );
        let _ = writeln!(
            out,
            "received: points={} clears={}",
            self.points_received.get(),
            self.clears_received.get()
        );
        let _ = writeln!(
            out,
            "strokes started: local={} remote={}",
            self.strokes_started_local.get(),
            self.strokes_started_remote.get()
        );
        let _ = writeln!(
            out,
            "active strokes: local={} remote={}",
            self.active_local.get(),
            self.active_remote.get()
        );
        let _ = writeln!(
            out,
            "dropped: unauthenticated={} orphans={} malformed={}",
            self.dropped_unauthenticated.get(),
            self.orphan_points.get(),
            self.malformed_payloads.get()
        );
        out
    }
}
