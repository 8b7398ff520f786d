//! Pub/sub channel collaborator.
//!
//! The engine treats the transport as best-effort: at-most-once delivery,
//! no cross-peer ordering, and a peer's own publications may be delivered
//! back to it. Publishing is fire-and-forget; there is no queueing or retry.

use serde::{Deserialize, Serialize};

/// Abstract broadcast channel consumed by the publisher.
pub trait Channel {
    /// Whether the channel is logged in and joined, i.e. allowed to publish.
    fn is_authenticated(&self) -> bool;
    /// Hand a payload to the transport. Must not block; delivery is not
    /// observed.
    fn publish(&self, payload: &str);
}

/// Frames sent to the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Subscribe to a named channel.
    Join { channel: String },
    /// Broadcast an opaque payload to the current channel.
    Publish { payload: String },
}

/// Frames received from the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayFrame {
    /// Confirm channel join.
    Joined { channel: String, peer_count: usize },
    /// Peer joined the channel.
    PeerJoined { peer_id: String },
    /// Peer left the channel.
    PeerLeft { peer_id: String },
    /// Payload broadcast on the channel. `from` may be this peer's own
    /// relay id; stroke-level self-echo suppression happens in the engine
    /// via the embedded publisher id.
    Publish { from: String, payload: String },
    /// Relay-side error.
    Error { message: String },
}

/// Connection state of the native channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Events surfaced to the embedder by `poll_events`.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    Connected,
    Disconnected,
    Joined { channel: String, peer_count: usize },
    PeerJoined { peer_id: String },
    PeerLeft { peer_id: String },
    /// Inbound payload to feed into `CanvasEngine::handle_payload`.
    Message { from: String, payload: String },
    Error { message: String },
}

/// Errors from channel setup.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("already connected")]
    AlreadyConnected,
    #[error("invalid relay url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("unsupported url scheme: {0}")]
    UnsupportedScheme(String),
}

mod native {
    use super::*;
    use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;
    use tungstenite::{Message, connect};
    use url::Url;

    /// Commands sent to the socket thread.
    enum SocketCommand {
        Send(String),
        Close,
    }

    /// WebSocket channel for native platforms.
    ///
    /// Runs the socket on a background thread; inbound frames are drained
    /// on the embedder's own context via `poll_events`, which is the
    /// serialization boundary required by the engine.
    pub struct NativeChannel {
        state: ConnectionState,
        joined: bool,
        events: Vec<ChannelEvent>,
        cmd_tx: Option<Sender<SocketCommand>>,
        event_rx: Option<Receiver<ChannelEvent>>,
        _thread: Option<JoinHandle<()>>,
    }

    impl NativeChannel {
        pub fn new() -> Self {
            Self {
                state: ConnectionState::Disconnected,
                joined: false,
                events: Vec::new(),
                cmd_tx: None,
                event_rx: None,
                _thread: None,
            }
        }

        /// Connect to a relay server.
        pub fn connect(&mut self, url: &str) -> Result<(), ChannelError> {
            if self.cmd_tx.is_some() {
                return Err(ChannelError::AlreadyConnected);
            }

            let parsed = Url::parse(url)?;
            if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
                return Err(ChannelError::UnsupportedScheme(parsed.scheme().to_string()));
            }

            self.state = ConnectionState::Connecting;

            let (cmd_tx, cmd_rx) = channel::<SocketCommand>();
            let (event_tx, event_rx) = channel::<ChannelEvent>();
            let url = url.to_string();

            let handle = thread::spawn(move || {
                log::info!("channel thread: connecting to {}", url);

                match connect(&url) {
                    Ok((mut socket, response)) => {
                        log::info!("channel connected, status: {}", response.status());
                        let _ = event_tx.send(ChannelEvent::Connected);

                        // Short read timeout so commands are picked up promptly.
                        if let tungstenite::stream::MaybeTlsStream::Plain(tcp) =
                            socket.get_mut()
                        {
                            let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
                            let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
                        }

                        loop {
                            match cmd_rx.try_recv() {
                                Ok(SocketCommand::Send(frame)) => {
                                    if let Err(e) = socket.send(Message::Text(frame)) {
                                        log::error!("channel send error: {}", e);
                                        break;
                                    }
                                }
                                Ok(SocketCommand::Close) => {
                                    let _ = socket.close(None);
                                    break;
                                }
                                Err(TryRecvError::Disconnected) => break,
                                Err(TryRecvError::Empty) => {}
                            }

                            match socket.read() {
                                Ok(Message::Text(text)) => {
                                    match serde_json::from_str::<RelayFrame>(&text) {
                                        Ok(frame) => {
                                            let _ = event_tx.send(frame_to_event(frame));
                                        }
                                        Err(e) => {
                                            log::warn!("unparseable relay frame: {}", e);
                                        }
                                    }
                                }
                                Ok(Message::Ping(data)) => {
                                    let _ = socket.send(Message::Pong(data));
                                }
                                Ok(Message::Close(_)) => break,
                                Ok(_) => {}
                                Err(tungstenite::Error::Io(ref e))
                                    if e.kind() == std::io::ErrorKind::WouldBlock
                                        || e.kind() == std::io::ErrorKind::TimedOut =>
                                {
                                    continue;
                                }
                                Err(e) => {
                                    log::error!("channel read error: {}", e);
                                    break;
                                }
                            }
                        }

                        log::info!("channel thread exiting");
                        let _ = event_tx.send(ChannelEvent::Disconnected);
                    }
                    Err(e) => {
                        log::error!("channel connection failed: {}", e);
                        let _ = event_tx.send(ChannelEvent::Error {
                            message: format!("connection failed: {}", e),
                        });
                    }
                }
            });

            self.cmd_tx = Some(cmd_tx);
            self.event_rx = Some(event_rx);
            self._thread = Some(handle);
            Ok(())
        }

        /// Request to join a named channel. Authentication is complete once
        /// the relay's join confirmation is seen by `poll_events`.
        pub fn join(&self, channel: &str) {
            let frame = ClientFrame::Join {
                channel: channel.to_string(),
            };
            self.send_frame(&frame);
        }

        pub fn disconnect(&mut self) {
            if let Some(tx) = self.cmd_tx.take() {
                let _ = tx.send(SocketCommand::Close);
            }
            self.event_rx = None;
            self._thread = None;
            self.state = ConnectionState::Disconnected;
            self.joined = false;
        }

        /// Drain pending events, updating connection state.
        pub fn poll_events(&mut self) -> Vec<ChannelEvent> {
            if let Some(ref rx) = self.event_rx {
                while let Ok(event) = rx.try_recv() {
                    match &event {
                        ChannelEvent::Connected => self.state = ConnectionState::Connected,
                        ChannelEvent::Disconnected => {
                            self.state = ConnectionState::Disconnected;
                            self.joined = false;
                        }
                        ChannelEvent::Joined { .. } => self.joined = true,
                        ChannelEvent::Error { .. } => self.state = ConnectionState::Error,
                        _ => {}
                    }
                    self.events.push(event);
                }
            }
            std::mem::take(&mut self.events)
        }

        pub fn state(&self) -> ConnectionState {
            self.state
        }

        fn send_frame(&self, frame: &ClientFrame) {
            let Some(ref tx) = self.cmd_tx else {
                log::warn!("channel not connected; frame dropped");
                return;
            };
            match serde_json::to_string(frame) {
                Ok(json) => {
                    if tx.send(SocketCommand::Send(json)).is_err() {
                        log::warn!("channel thread gone; frame dropped");
                    }
                }
                Err(e) => log::warn!("frame encode failed: {}", e),
            }
        }
    }

    fn frame_to_event(frame: RelayFrame) -> ChannelEvent {
        match frame {
            RelayFrame::Joined {
                channel,
                peer_count,
            } => ChannelEvent::Joined {
                channel,
                peer_count,
            },
            RelayFrame::PeerJoined { peer_id } => ChannelEvent::PeerJoined { peer_id },
            RelayFrame::PeerLeft { peer_id } => ChannelEvent::PeerLeft { peer_id },
            RelayFrame::Publish { from, payload } => ChannelEvent::Message { from, payload },
            RelayFrame::Error { message } => ChannelEvent::Error { message },
        }
    }

    impl Channel for NativeChannel {
        fn is_authenticated(&self) -> bool {
            self.state == ConnectionState::Connected && self.joined
        }

        fn publish(&self, payload: &str) {
            let frame = ClientFrame::Publish {
                payload: payload.to_string(),
            };
            self.send_frame(&frame);
        }
    }

    impl Default for NativeChannel {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Drop for NativeChannel {
        fn drop(&mut self) {
            self.disconnect();
        }
    }
}

pub use native::NativeChannel;
