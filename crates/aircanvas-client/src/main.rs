//! Headless AirCanvas client.
//!
//! Connects to a relay, joins a channel, draws one scripted stroke and then
//! keeps relaying inbound strokes into the engine, printing the diagnostics
//! report on exit. Usage:
//!
//! ```text
//! aircanvas-client [ws://host:3030/ws] [channel] [peer-id]
//! ```

use aircanvas_core::{
    CanvasEngine, Channel, ChannelEvent, DrawSettings, InputPhase, NativeChannel, NullSurface,
    Point3,
};
use std::time::{Duration, Instant};
use uuid::Uuid;

const SESSION_SECONDS: u64 = 10;

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .unwrap_or_else(|| "ws://localhost:3030/ws".to_string());
    let channel_name = args.next().unwrap_or_else(|| "demo".to_string());
    let peer_id = args
        .next()
        .unwrap_or_else(|| Uuid::new_v4().to_string()[..8].to_string());

    log::info!("peer {} connecting to {}", peer_id, url);

    let mut channel = NativeChannel::new();
    if let Err(e) = channel.connect(&url) {
        log::error!("connect failed: {}", e);
        std::process::exit(1);
    }
    channel.join(&channel_name);

    let mut engine = CanvasEngine::new(&peer_id, DrawSettings::default(), channel, NullSurface::new());

    let started = Instant::now();
    let mut stroke_drawn = false;

    // Single-threaded event loop: inbound delivery and local input both run
    // on this context.
    while started.elapsed() < Duration::from_secs(SESSION_SECONDS) {
        for event in engine.channel_mut().poll_events() {
            match event {
                ChannelEvent::Joined {
                    channel,
                    peer_count,
                } => {
                    log::info!("joined {} ({} peers)", channel, peer_count);
                }
                ChannelEvent::PeerJoined { peer_id } => log::info!("peer joined: {}", peer_id),
                ChannelEvent::PeerLeft { peer_id } => log::info!("peer left: {}", peer_id),
                ChannelEvent::Message { payload, .. } => engine.handle_payload(&payload),
                ChannelEvent::Disconnected => {
                    log::warn!("disconnected from relay");
                    print_report(&engine);
                    return;
                }
                ChannelEvent::Error { message } => log::warn!("channel error: {}", message),
                ChannelEvent::Connected => log::info!("connected"),
            }
        }

        if !stroke_drawn && engine.channel().is_authenticated() {
            draw_demo_stroke(&mut engine);
            stroke_drawn = true;
        }

        std::thread::sleep(Duration::from_millis(20));
    }

    print_report(&engine);
}

/// A short diagonal stroke; every second sample is too close to the
/// previous one and gets filtered out of the publish stream.
fn draw_demo_stroke(engine: &mut CanvasEngine<NativeChannel, NullSurface>) {
    engine.handle_input(Point3::new(0.0, 0.0, 1.5), InputPhase::Begin);
    for i in 1..=10 {
        let t = i as f32;
        engine.handle_input(Point3::new(t * 0.02, t * 0.02, 1.5), InputPhase::Move);
        engine.handle_input(
            Point3::new(t * 0.02 + 0.002, t * 0.02, 1.5),
            InputPhase::Move,
        );
    }
    engine.handle_input(Point3::new(0.2, 0.2, 1.5), InputPhase::End);
    log::info!("demo stroke published");
}

fn print_report(engine: &CanvasEngine<NativeChannel, NullSurface>) {
    print!("{}", engine.diagnostics().report());
    println!(
        "remote strokes held: {}, local strokes held: {}",
        engine.registry().len(),
        engine.session().stroke_count()
    );
}
