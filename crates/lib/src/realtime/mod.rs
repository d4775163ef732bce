//! Real-time channel: Socket.IO over WebSocket, one connection per open session.

mod channel;
pub mod packet;

pub use channel::{socket_url, ChannelError, ChannelEvent, RealtimeChannel, ScopeId, ScopedEvent};

use serde::{Deserialize, Serialize};

/// Client → server: subscribe to a session's room.
pub const EVENT_JOIN: &str = "join";
/// Client → server: post a user message.
pub const EVENT_SEND_MESSAGE: &str = "sendMessage";
/// Server → client: a message was stored in the joined session.
pub const EVENT_RECEIVE_MESSAGE: &str = "receive_message";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPayload {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub text: String,
    pub session_id: String,
}
