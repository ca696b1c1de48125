//! Engine.IO v4 and Socket.IO v5 text packet codec
//!
//! Only the text subset over websocket frames is handled; one frame carries
//! exactly one packet.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PacketError {
    #[error("empty packet")]
    Empty,
    #[error("unknown engine.io packet type {0:?}")]
    UnknownEngineType(char),
    #[error("unknown socket.io packet type {0:?}")]
    UnknownSocketType(char),
    #[error("binary packets are not supported")]
    Binary,
    #[error("event packet without a name")]
    MissingEventName,
    #[error("unexpected packet during handshake: {0}")]
    Unexpected(String),
    #[error("malformed packet payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Session parameters from the Engine.IO open packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPayload {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    Open(OpenPayload),
    Close,
    Ping,
    Pong,
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn decode(text: &str) -> Result<Self, PacketError> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(PacketError::Empty)?;
        let body = chars.as_str();
        match kind {
            '0' => Ok(EnginePacket::Open(serde_json::from_str(body)?)),
            '1' => Ok(EnginePacket::Close),
            // Probe data on pings is ignored
            '2' => Ok(EnginePacket::Ping),
            '3' => Ok(EnginePacket::Pong),
            '4' => Ok(EnginePacket::Message(body.to_string())),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            'b' => Err(PacketError::Binary),
            other => Err(PacketError::UnknownEngineType(other)),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(open) => {
                format!("0{}", serde_json::to_string(open).unwrap_or_else(|_| "{}".to_string()))
            }
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping => "2".to_string(),
            EnginePacket::Pong => "3".to_string(),
            EnginePacket::Message(body) => format!("4{body}"),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConnectAck {
    sid: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ConnectErrorBody {
    Record { message: String },
    Bare(String),
}

/// A Socket.IO packet on the default namespace
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    /// Client request, or server acknowledgement carrying the socket id
    Connect { sid: Option<String> },
    Disconnect,
    Event { name: String, args: Vec<Value> },
    Ack { id: u64, args: Vec<Value> },
    ConnectError { message: String },
}

impl SocketPacket {
    /// `42["message", text]`-style event with a single argument
    pub fn event(name: impl Into<String>, arg: Value) -> Self {
        SocketPacket::Event {
            name: name.into(),
            args: vec![arg],
        }
    }

    pub fn decode(text: &str) -> Result<Self, PacketError> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(PacketError::Empty)?;
        let rest = skip_namespace(chars.as_str());
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (id, payload) = rest.split_at(digits);

        match kind {
            '0' => {
                let sid = if payload.is_empty() {
                    None
                } else {
                    serde_json::from_str::<ConnectAck>(payload)?.sid
                };
                Ok(SocketPacket::Connect { sid })
            }
            '1' => Ok(SocketPacket::Disconnect),
            '2' => {
                let mut args: Vec<Value> = serde_json::from_str(payload)?;
                if args.is_empty() {
                    return Err(PacketError::MissingEventName);
                }
                let Value::String(name) = args.remove(0) else {
                    return Err(PacketError::MissingEventName);
                };
                Ok(SocketPacket::Event { name, args })
            }
            '3' => Ok(SocketPacket::Ack {
                id: id.parse().unwrap_or_default(),
                args: serde_json::from_str(payload)?,
            }),
            '4' => {
                let message = match serde_json::from_str::<ConnectErrorBody>(payload)? {
                    ConnectErrorBody::Record { message } | ConnectErrorBody::Bare(message) => message,
                };
                Ok(SocketPacket::ConnectError { message })
            }
            '5' | '6' => Err(PacketError::Binary),
            other => Err(PacketError::UnknownSocketType(other)),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            SocketPacket::Connect { .. } => "0".to_string(),
            SocketPacket::Disconnect => "1".to_string(),
            SocketPacket::Event { name, args } => {
                let mut array = Vec::with_capacity(args.len() + 1);
                array.push(Value::String(name.clone()));
                array.extend(args.iter().cloned());
                format!("2{}", Value::Array(array))
            }
            SocketPacket::Ack { id, args } => format!("3{id}{}", Value::Array(args.clone())),
            SocketPacket::ConnectError { message } => {
                format!("4{}", serde_json::json!({ "message": message }))
            }
        }
    }

    /// Wrap in an Engine.IO message, ready for a websocket text frame
    pub fn into_frame(self) -> String {
        EnginePacket::Message(self.encode()).encode()
    }
}

/// Strip a leading `/namespace,` if present
fn skip_namespace(text: &str) -> &str {
    if text.starts_with('/') {
        text.split_once(',').map_or("", |(_, rest)| rest)
    } else {
        text
    }
}
