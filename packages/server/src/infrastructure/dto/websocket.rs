//! WebSocket frame DTOs.
//!
//! Every frame is a JSON text frame. Inbound frames carry `{nickname, content}`;
//! outbound frames are either a stored message record or an error object.

use serde::{Deserialize, Serialize, de::Error as _};
use serde_json::Value;

/// Chat payload written by a client: `{nickname, content}`.
///
/// Also the request body of the HTTP fallback `POST /send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageDto {
    pub nickname: String,
    pub content: String,
}

/// Inbound frame as read by the server.
///
/// Fields are optional so that a well-formed JSON object with a missing field
/// can be told apart from malformed JSON.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundChatMessage {
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl InboundChatMessage {
    /// Parse a text frame. Only a JSON object is accepted, never an array.
    pub fn from_frame(text: &str) -> Result<Self, serde_json::Error> {
        match serde_json::from_str::<Value>(text)? {
            value @ Value::Object(_) => serde_json::from_value(value),
            _ => Err(serde_json::Error::custom("expected a JSON object")),
        }
    }
}

/// Stored message record: `{id, nickname, content, timestamp}`.
///
/// `timestamp` is an RFC 3339 UTC string with microsecond precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: String,
    pub nickname: String,
    pub content: String,
    pub timestamp: String,
}

/// In-band error event sent to a single connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDto {
    pub error: String,
}

impl ErrorDto {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Any frame the server sends after the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerEvent {
    Message(MessageDto),
    Error(ErrorDto),
}
