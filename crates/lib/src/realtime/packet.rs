//! Engine.IO v4 / Socket.IO v5 text framing.
//!
//! A WebSocket text frame holds one Engine.IO packet: a type digit followed by data.
//! Engine.IO `message` packets (`4`) carry one Socket.IO packet: a type digit, an
//! optional `/namespace,`, an optional ack id, then JSON (`42["event",{...}]`).
//! Binary attachments are not supported.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_NAMESPACE: &str = "/";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("empty frame")]
    Empty,
    #[error("unknown engine.io packet type {0:?}")]
    UnknownEngineType(char),
    #[error("unknown socket.io packet type {0:?}")]
    UnknownSocketType(char),
    #[error("binary socket.io packets are not supported")]
    Binary,
    #[error("invalid packet payload: {0}")]
    Payload(String),
}

/// Engine.IO open handshake (`0{...}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        nsp: String,
        data: Option<Value>,
    },
    Disconnect {
        nsp: String,
    },
    Event {
        nsp: String,
        id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        nsp: String,
        id: u64,
        args: Vec<Value>,
    },
    ConnectError {
        nsp: String,
        data: Option<Value>,
    },
}

impl SocketPacket {
    /// Event on the default namespace without ack: `["name", payload]`.
    pub fn event(name: impl Into<String>, payload: Value) -> Self {
        SocketPacket::Event {
            nsp: DEFAULT_NAMESPACE.to_string(),
            id: None,
            name: name.into(),
            args: vec![payload],
        }
    }

    /// Namespace connect, optionally carrying the auth payload.
    pub fn connect(auth: Option<Value>) -> Self {
        SocketPacket::Connect {
            nsp: DEFAULT_NAMESPACE.to_string(),
            data: auth,
        }
    }

    fn encode(&self) -> String {
        let mut out = String::new();
        let (typ, nsp) = match self {
            SocketPacket::Connect { nsp, .. } => ('0', nsp),
            SocketPacket::Disconnect { nsp } => ('1', nsp),
            SocketPacket::Event { nsp, .. } => ('2', nsp),
            SocketPacket::Ack { nsp, .. } => ('3', nsp),
            SocketPacket::ConnectError { nsp, .. } => ('4', nsp),
        };
        out.push(typ);
        if nsp != DEFAULT_NAMESPACE && !nsp.is_empty() {
            out.push_str(nsp);
            out.push(',');
        }
        match self {
            SocketPacket::Connect { data, .. } | SocketPacket::ConnectError { data, .. } => {
                if let Some(d) = data {
                    out.push_str(&d.to_string());
                }
            }
            SocketPacket::Disconnect { .. } => {}
            SocketPacket::Event { id, name, args, .. } => {
                if let Some(id) = id {
                    out.push_str(&id.to_string());
                }
                let mut arr = Vec::with_capacity(args.len() + 1);
                arr.push(Value::String(name.clone()));
                arr.extend(args.iter().cloned());
                out.push_str(&Value::Array(arr).to_string());
            }
            SocketPacket::Ack { id, args, .. } => {
                out.push_str(&id.to_string());
                out.push_str(&Value::Array(args.clone()).to_string());
            }
        }
        out
    }

    fn decode(s: &str) -> Result<Self, FrameError> {
        let mut chars = s.chars();
        let typ = chars.next().ok_or(FrameError::Empty)?;
        match typ {
            '0'..='4' => {}
            '5' | '6' => return Err(FrameError::Binary),
            other => return Err(FrameError::UnknownSocketType(other)),
        }
        let mut rest = chars.as_str();

        let nsp = if rest.starts_with('/') {
            let end = rest.find(',').unwrap_or(rest.len());
            let nsp = rest[..end].to_string();
            rest = rest.get(end + 1..).unwrap_or("");
            nsp
        } else {
            DEFAULT_NAMESPACE.to_string()
        };

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let id = if digits > 0 {
            Some(
                rest[..digits]
                    .parse::<u64>()
                    .map_err(|e| FrameError::Payload(e.to_string()))?,
            )
        } else {
            None
        };
        let rest = &rest[digits..];
        let data = if rest.is_empty() {
            None
        } else {
            Some(
                serde_json::from_str::<Value>(rest)
                    .map_err(|e| FrameError::Payload(e.to_string()))?,
            )
        };

        match typ {
            '0' => Ok(SocketPacket::Connect { nsp, data }),
            '1' => Ok(SocketPacket::Disconnect { nsp }),
            '2' => {
                let Some(Value::Array(mut arr)) = data else {
                    return Err(FrameError::Payload("event payload is not an array".into()));
                };
                if arr.is_empty() {
                    return Err(FrameError::Payload("event without name".into()));
                }
                let Value::String(name) = arr.remove(0) else {
                    return Err(FrameError::Payload("event name is not a string".into()));
                };
                Ok(SocketPacket::Event {
                    nsp,
                    id,
                    name,
                    args: arr,
                })
            }
            '3' => {
                let id = id.ok_or_else(|| FrameError::Payload("ack without id".into()))?;
                let args = match data {
                    Some(Value::Array(arr)) => arr,
                    None => Vec::new(),
                    Some(_) => return Err(FrameError::Payload("ack payload is not an array".into())),
                };
                Ok(SocketPacket::Ack { nsp, id, args })
            }
            _ => Ok(SocketPacket::ConnectError { nsp, data }),
        }
    }
}

impl EnginePacket {
    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(h) => format!("0{}", serde_json::to_string(h).unwrap_or_default()),
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(d) => format!("2{}", d),
            EnginePacket::Pong(d) => format!("3{}", d),
            EnginePacket::Message(p) => format!("4{}", p.encode()),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }

    pub fn decode(s: &str) -> Result<Self, FrameError> {
        let mut chars = s.chars();
        let typ = chars.next().ok_or(FrameError::Empty)?;
        let rest = chars.as_str();
        match typ {
            '0' => serde_json::from_str(rest)
                .map(EnginePacket::Open)
                .map_err(|e| FrameError::Payload(e.to_string())),
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(rest.to_string())),
            '3' => Ok(EnginePacket::Pong(rest.to_string())),
            '4' => SocketPacket::decode(rest).map(EnginePacket::Message),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(FrameError::UnknownEngineType(other)),
        }
    }
}
