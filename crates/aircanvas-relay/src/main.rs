//! AirCanvas pub/sub relay.
//!
//! Broadcasts opaque payloads between peers subscribed to the same named
//! channel. Delivery is best-effort: no ordering across peers, no replay,
//! and at most one delivery per receiver (lagged receivers drop messages).
//! Publications are echoed to the sender as well — peers are expected to
//! suppress their own events by publisher id.
//!
//! ## Protocol
//!
//! Frames are JSON:
//! ```json
//! { "type": "join", "channel": "canvas-1" }
//! { "type": "publish", "payload": "<opaque string>" }
//! ```
//! and outbound:
//! ```json
//! { "type": "publish", "from": "<relay peer id>", "payload": "..." }
//! ```

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, net::SocketAddr, sync::Arc};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 256;

/// Frames sent by clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Subscribe to a named channel.
    Join { channel: String },
    /// Broadcast an opaque payload to the current channel.
    Publish { payload: String },
}

/// Frames sent to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayFrame {
    /// Confirm channel join.
    Joined { channel: String, peer_count: usize },
    /// Peer joined the channel.
    PeerJoined { peer_id: String },
    /// Peer left the channel.
    PeerLeft { peer_id: String },
    /// Payload broadcast on the channel.
    Publish { from: String, payload: String },
    /// Error message.
    Error { message: String },
}

/// A named pub/sub channel.
struct CanvasChannel {
    tx: broadcast::Sender<RelayFrame>,
    peers: HashSet<String>,
}

impl CanvasChannel {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            peers: HashSet::new(),
        }
    }
}

/// Shared application state.
struct AppState {
    channels: DashMap<String, CanvasChannel>,
}

impl AppState {
    fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Add a peer to a channel, creating it if needed.
    fn join(&self, channel_id: &str, peer_id: &str) -> (broadcast::Receiver<RelayFrame>, usize) {
        let mut channel = self
            .channels
            .entry(channel_id.to_string())
            .or_insert_with(CanvasChannel::new);
        channel.peers.insert(peer_id.to_string());
        (channel.tx.subscribe(), channel.peers.len())
    }

    /// Remove a peer from a channel, dropping the channel when empty.
    fn leave(&self, channel_id: &str, peer_id: &str) {
        if let Some(mut channel) = self.channels.get_mut(channel_id) {
            channel.peers.remove(peer_id);
            if channel.peers.is_empty() {
                drop(channel);
                self.channels.remove(channel_id);
            }
        }
    }

    /// Fan a frame out to every subscriber of a channel, sender included.
    fn broadcast(&self, channel_id: &str, frame: RelayFrame) {
        if let Some(channel) = self.channels.get(channel_id) {
            let _ = channel.tx.send(frame);
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aircanvas_relay=info,tower_http=info".into()),
        )
        .init();

    let state = Arc::new(AppState::new());

    let app = Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3030));
    info!("AirCanvas relay listening on {}", addr);
    info!("WebSocket endpoint: ws://localhost:3030/ws");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind listen address");
    axum::serve(listener, app)
        .await
        .expect("server terminated");
}

async fn index() -> &'static str {
    "AirCanvas relay - connect via WebSocket at /ws"
}

async fn health() -> &'static str {
    "ok"
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let peer_id = Uuid::new_v4().to_string();
    info!("new connection: {}", peer_id);

    let (mut sender, mut receiver) = socket.split();
    let mut current_channel: Option<String> = None;
    let mut channel_rx: Option<broadcast::Receiver<RelayFrame>> = None;

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientFrame>(&text) {
                            Ok(ClientFrame::Join { channel }) => {
                                if let Some(ref old) = current_channel {
                                    state.leave(old, &peer_id);
                                    state.broadcast(old, RelayFrame::PeerLeft {
                                        peer_id: peer_id.clone(),
                                    });
                                }

                                let (rx, peer_count) = state.join(&channel, &peer_id);
                                channel_rx = Some(rx);
                                current_channel = Some(channel.clone());

                                let joined = RelayFrame::Joined {
                                    channel: channel.clone(),
                                    peer_count,
                                };
                                if send_frame(&mut sender, &joined).await.is_err() {
                                    break;
                                }

                                state.broadcast(&channel, RelayFrame::PeerJoined {
                                    peer_id: peer_id.clone(),
                                });
                                info!("peer {} joined channel {}", peer_id, channel);
                            }
                            Ok(ClientFrame::Publish { payload }) => {
                                match current_channel {
                                    Some(ref channel) => {
                                        state.broadcast(channel, RelayFrame::Publish {
                                            from: peer_id.clone(),
                                            payload,
                                        });
                                    }
                                    None => {
                                        warn!("publish from {} before join", peer_id);
                                        let err = RelayFrame::Error {
                                            message: "not joined to a channel".to_string(),
                                        };
                                        let _ = send_frame(&mut sender, &err).await;
                                    }
                                }
                            }
                            Err(e) => {
                                warn!("invalid frame from {}: {}", peer_id, e);
                                let err = RelayFrame::Error {
                                    message: format!("invalid frame: {}", e),
                                };
                                let _ = send_frame(&mut sender, &err).await;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // Ignore binary, ping, pong.
                    Some(Err(e)) => {
                        warn!("websocket error for {}: {}", peer_id, e);
                        break;
                    }
                }
            }

            frame = async {
                match &mut channel_rx {
                    Some(rx) => rx.recv().await.ok(),
                    None => std::future::pending::<Option<RelayFrame>>().await,
                }
            } => {
                // Forward everything, including this peer's own publications.
                if let Some(frame) = frame {
                    if send_frame(&mut sender, &frame).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    if let Some(ref channel) = current_channel {
        state.leave(channel, &peer_id);
        state.broadcast(channel, RelayFrame::PeerLeft {
            peer_id: peer_id.clone(),
        });
    }
    info!("connection closed: {}", peer_id);
}

async fn send_frame(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    frame: &RelayFrame,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(frame).map_err(axum::Error::new)?;
    sender.send(Message::Text(json.into())).await
}
