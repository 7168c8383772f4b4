//! Conversion logic from domain entities to DTOs.

use syncroom_shared::time::timestamp_to_rfc3339;

use crate::domain::{Participant, Room};
use crate::infrastructure::dto::{http, websocket};

// ========================================
// Domain Entity → WebSocket DTO
// ========================================

impl From<&Participant> for websocket::MemberInfo {
    fn from(participant: &Participant) -> Self {
        Self {
            client_id: participant.client_id.as_str().to_string(),
            is_host: participant.is_host,
        }
    }
}

/// Build a `room_members` message from a membership snapshot.
pub fn room_members_message(members: &[Participant]) -> websocket::ServerMessage {
    websocket::ServerMessage::RoomMembers {
        members: members.iter().map(websocket::MemberInfo::from).collect(),
    }
}

// ========================================
// Domain Entity → HTTP DTO
// ========================================

impl From<&Room> for http::RoomSummaryDto {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.as_str().to_string(),
            participants: room.participant_count(),
            host: room.host().map(|p| p.client_id.as_str().to_string()),
            created_at: timestamp_to_rfc3339(room.created_at.value()),
        }
    }
}

impl From<&Participant> for http::MemberDetailDto {
    fn from(participant: &Participant) -> Self {
        Self {
            client_id: participant.client_id.as_str().to_string(),
            is_host: participant.is_host,
            joined_at: timestamp_to_rfc3339(participant.joined_at.value()),
        }
    }
}

impl From<&Room> for http::RoomDetailDto {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.as_str().to_string(),
            members: room
                .participants()
                .iter()
                .map(http::MemberDetailDto::from)
                .collect(),
            created_at: timestamp_to_rfc3339(room.created_at.value()),
        }
    }
}
