//! One Socket.IO connection scoped to one open session.
//!
//! `RealtimeChannel::open` performs the Engine.IO handshake, the namespace connect
//! (presenting the bearer token) and only then emits `join`. A background task owns
//! the socket: it answers pings, forwards `receive_message` records as `ScopedEvent`s
//! and writes outbound frames. `close()` disconnects; dropping the handle aborts the task.

use super::packet::{EnginePacket, FrameError, Handshake, SocketPacket, DEFAULT_NAMESPACE};
use super::{JoinPayload, SendMessagePayload, EVENT_JOIN, EVENT_RECEIVE_MESSAGE, EVENT_SEND_MESSAGE};
use crate::models::{Message, SessionId};
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Identifies the thread scope a channel belongs to. Increases on every session switch.
pub type ScopeId = u64;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("invalid channel url {0:?}")]
    Url(String),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("bad frame: {0}")]
    Frame(#[from] FrameError),
    #[error("unexpected handshake packet: {0}")]
    Handshake(String),
    #[error("connection rejected: {0}")]
    Rejected(String),
    #[error("channel closed")]
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// A `receive_message` record.
    Received(Message),
    /// The connection ended; no further events follow for this scope.
    Closed { reason: String },
}

/// An event tagged with the scope of the channel that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedEvent {
    pub scope: ScopeId,
    pub event: ChannelEvent,
}

enum Outbound {
    Frame(String),
    Close,
}

/// Handle to an established, joined channel.
pub struct RealtimeChannel {
    scope: ScopeId,
    session_id: SessionId,
    outbound: mpsc::Sender<Outbound>,
    closed: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

/// Engine.IO WebSocket endpoint for an http(s)/ws(s) origin.
pub fn socket_url(origin: &str) -> Result<Url, ChannelError> {
    let mut url = Url::parse(origin.trim()).map_err(|_| ChannelError::Url(origin.to_string()))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(ChannelError::Url(origin.to_string())),
    };
    url.set_scheme(scheme)
        .map_err(|_| ChannelError::Url(origin.to_string()))?;
    url.set_path("/socket.io/");
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url)
}

impl RealtimeChannel {
    /// Connect, authenticate with `token`, and join the room of `session_id`.
    /// Inbound events for this channel are sent to `events` tagged with `scope`.
    pub async fn open(
        origin: &str,
        token: Option<&str>,
        session_id: &str,
        scope: ScopeId,
        events: mpsc::Sender<ScopedEvent>,
    ) -> Result<Self, ChannelError> {
        let url = socket_url(origin)?;
        log::debug!("opening channel {} for session {}", url, session_id);
        let (mut ws, _) = tokio_tungstenite::connect_async(url.as_str()).await?;

        let handshake = loop {
            match next_packet(&mut ws).await? {
                EnginePacket::Open(h) => break h,
                EnginePacket::Noop => continue,
                other => return Err(ChannelError::Handshake(format!("{:?}", other))),
            }
        };

        let auth = token.map(|t| serde_json::json!({ "token": t }));
        send_packet(&mut ws, EnginePacket::Message(SocketPacket::connect(auth))).await?;
        loop {
            match next_packet(&mut ws).await? {
                EnginePacket::Ping(d) => send_packet(&mut ws, EnginePacket::Pong(d)).await?,
                EnginePacket::Message(SocketPacket::Connect { .. }) => break,
                EnginePacket::Message(SocketPacket::ConnectError { data, .. }) => {
                    return Err(ChannelError::Rejected(connect_error_reason(data)));
                }
                EnginePacket::Close | EnginePacket::Message(SocketPacket::Disconnect { .. }) => {
                    return Err(ChannelError::Closed)
                }
                other => log::debug!("ignoring packet before connect ack: {:?}", other),
            }
        }

        let join = JoinPayload {
            session_id: session_id.to_string(),
        };
        send_packet(&mut ws, event_packet(EVENT_JOIN, &join)).await?;
        log::info!("joined session {} (scope {})", session_id, scope);

        let (tx, rx) = mpsc::channel(32);
        let closed = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(run_channel(
            ws,
            rx,
            events,
            scope,
            closed.clone(),
            liveness_window(&handshake),
        ));
        Ok(Self {
            scope,
            session_id: session_id.to_string(),
            outbound: tx,
            closed,
            task: Some(task),
        })
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    /// Emit `sendMessage`. Fire-and-forget: the message shows up only when the server rebroadcasts it.
    pub async fn send_message(&self, text: &str) -> Result<(), ChannelError> {
        if !self.is_open() {
            return Err(ChannelError::Closed);
        }
        let payload = SendMessagePayload {
            text: text.to_string(),
            session_id: self.session_id.clone(),
        };
        let frame = event_packet(EVENT_SEND_MESSAGE, &payload).encode();
        self.outbound
            .send(Outbound::Frame(frame))
            .await
            .map_err(|_| ChannelError::Closed)
    }

    /// Disconnect and wait for the socket task to finish.
    pub async fn close(mut self) {
        self.closed.store(true, Ordering::SeqCst);
        let _ = self.outbound.send(Outbound::Close).await;
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        log::debug!("closed channel for session {} (scope {})", self.session_id, self.scope);
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn event_packet<T: serde::Serialize>(name: &str, payload: &T) -> EnginePacket {
    let value = serde_json::to_value(payload).unwrap_or(serde_json::Value::Null);
    EnginePacket::Message(SocketPacket::event(name, value))
}

fn connect_error_reason(data: Option<serde_json::Value>) -> String {
    match data {
        Some(serde_json::Value::String(s)) => s,
        Some(v) => v
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| v.to_string()),
        None => "connect error".to_string(),
    }
}

/// Server pings every `pingInterval`; the connection is dead if none arrives within interval + timeout.
fn liveness_window(h: &Handshake) -> Duration {
    Duration::from_millis(h.ping_interval.saturating_add(h.ping_timeout))
}

async fn send_packet(ws: &mut Socket, packet: EnginePacket) -> Result<(), ChannelError> {
    ws.send(WsMessage::Text(packet.encode())).await?;
    Ok(())
}

async fn next_packet(ws: &mut Socket) -> Result<EnginePacket, ChannelError> {
    while let Some(msg) = ws.next().await {
        match msg? {
            WsMessage::Text(text) => return Ok(EnginePacket::decode(&text)?),
            WsMessage::Close(_) => return Err(ChannelError::Closed),
            _ => continue,
        }
    }
    Err(ChannelError::Closed)
}

/// Write one outbound command. Returns the stop reason when the channel must end.
async fn handle_outbound(ws: &mut Socket, cmd: Option<Outbound>) -> Option<String> {
    match cmd {
        Some(Outbound::Frame(text)) => match ws.send(WsMessage::Text(text)).await {
            Ok(()) => None,
            Err(e) => Some(format!("send failed: {}", e)),
        },
        Some(Outbound::Close) | None => {
            let disconnect = EnginePacket::Message(SocketPacket::Disconnect {
                nsp: DEFAULT_NAMESPACE.to_string(),
            });
            let _ = ws.send(WsMessage::Text(disconnect.encode())).await;
            let _ = ws.close(None).await;
            Some("closed by client".to_string())
        }
    }
}

/// A `receive_message` record on the default namespace, if `packet` is one.
fn received_message(packet: SocketPacket) -> Option<Message> {
    let SocketPacket::Event { nsp, name, mut args, .. } = packet else {
        return None;
    };
    if nsp != DEFAULT_NAMESPACE || name != EVENT_RECEIVE_MESSAGE || args.is_empty() {
        log::debug!("ignoring event {} on {}", name, nsp);
        return None;
    }
    match serde_json::from_value(args.swap_remove(0)) {
        Ok(m) => Some(m),
        Err(e) => {
            log::warn!("dropping malformed {}: {}", EVENT_RECEIVE_MESSAGE, e);
            None
        }
    }
}

async fn run_channel(
    mut ws: Socket,
    mut outbound: mpsc::Receiver<Outbound>,
    events: mpsc::Sender<ScopedEvent>,
    scope: ScopeId,
    closed: Arc<AtomicBool>,
    liveness: Duration,
) {
    let mut deadline = Instant::now() + liveness;
    let reason = loop {
        tokio::select! {
            cmd = outbound.recv() => {
                if let Some(reason) = handle_outbound(&mut ws, cmd).await {
                    break reason;
                }
            }
            frame = ws.next() => {
                let text = match frame {
                    None => break "connection closed".to_string(),
                    Some(Err(e)) => break e.to_string(),
                    Some(Ok(WsMessage::Text(text))) => text,
                    Some(Ok(WsMessage::Close(_))) => break "connection closed".to_string(),
                    Some(Ok(_)) => continue,
                };
                match EnginePacket::decode(&text) {
                    Ok(EnginePacket::Ping(d)) => {
                        deadline = Instant::now() + liveness;
                        if let Err(e) = ws.send(WsMessage::Text(EnginePacket::Pong(d).encode())).await {
                            break format!("pong failed: {}", e);
                        }
                    }
                    Ok(EnginePacket::Close)
                    | Ok(EnginePacket::Message(SocketPacket::Disconnect { .. })) => {
                        break "server disconnected".to_string();
                    }
                    Ok(EnginePacket::Message(packet)) => {
                        let Some(message) = received_message(packet) else {
                            continue;
                        };
                        if closed.load(Ordering::SeqCst) {
                            log::debug!("discarding message for closed scope {}", scope);
                            continue;
                        }
                        let ev = ScopedEvent { scope, event: ChannelEvent::Received(message) };
                        // A full listener must not stall outbound commands, close in particular.
                        let stop = loop {
                            tokio::select! {
                                permit = events.reserve() => match permit {
                                    Ok(permit) => {
                                        permit.send(ev);
                                        break None;
                                    }
                                    Err(_) => break Some("event listener gone".to_string()),
                                },
                                cmd = outbound.recv() => {
                                    if let Some(reason) = handle_outbound(&mut ws, cmd).await {
                                        break Some(reason);
                                    }
                                }
                            }
                        };
                        if let Some(reason) = stop {
                            break reason;
                        }
                    }
                    Ok(other) => log::debug!("ignoring packet {:?}", other),
                    Err(e) => log::warn!("bad frame from server: {}", e),
                }
            }
            _ = tokio::time::sleep_until(deadline) => {
                break "ping timeout".to_string();
            }
        }
    };

    let by_client = closed.swap(true, Ordering::SeqCst);
    if by_client {
        log::debug!("channel scope {} ended: {}", scope, reason);
    } else {
        log::warn!("channel scope {} ended: {}", scope, reason);
    }
    let _ = events.try_send(ScopedEvent {
        scope,
        event: ChannelEvent::Closed { reason },
    });
}
