//! WebSocket message DTOs.
//!
//! Every frame is a JSON object with a `type` tag. Field names are camelCase on
//! the wire.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reply text for payloads that cannot be decoded.
pub const MALFORMED_MESSAGE_REPLY: &str = "Error processing message";

/// Error returned when an inbound frame is not a valid client message.
#[derive(Debug, Error)]
#[error("Malformed message: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

/// Messages sent from clients to the server.
///
/// Types the server does not interpret (`play`, `pause`, `seek`, `timeupdate`,
/// `volume`, `url_change`, ...) decode as [`ClientMessage::Relay`] and are
/// forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    CreateRoom {
        room_id: Option<String>,
        client_id: Option<String>,
    },
    JoinRoom {
        room_id: Option<String>,
        client_id: Option<String>,
    },
    LeaveRoom,
    SyncRequest,
    SyncResponse {
        time: f64,
        playing: bool,
        volume: Option<f64>,
        url: Option<String>,
        /// Informational only; periodic and on-demand snapshots are relayed the same way.
        is_periodic: Option<bool>,
    },
    Ping,
    #[serde(other)]
    Relay,
}

impl ClientMessage {
    /// Decode a text frame.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Member entry of `room_members`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    pub client_id: String,
    pub is_host: bool,
}

/// Messages sent from the server to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    RoomCreated {
        room_id: String,
        is_host: bool,
        participants: usize,
    },
    RoomJoined {
        room_id: String,
        is_host: bool,
        participants: usize,
    },
    RoomLeft,
    Error {
        message: String,
    },
    ParticipantJoined {
        participants: usize,
    },
    ParticipantLeft {
        participants: usize,
    },
    RoomMembers {
        members: Vec<MemberInfo>,
    },
    HostAssigned {
        is_host: bool,
    },
    SyncRequest {
        from: String,
    },
    Sync {
        time: f64,
        playing: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        volume: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    Pong,
    ServerShutdown,
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Encode as a text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
