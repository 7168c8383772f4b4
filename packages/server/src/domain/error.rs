//! Domain errors.

use thiserror::Error;

use super::value_object::{ConnectionId, ValueObjectError};

/// ルーム操作に関するエラー
///
/// `Display` の文言はそのまま `error{message}` としてクライアントに返されるものがある。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// 参加先のルームが存在しない
    #[error("Room not found")]
    RoomNotFound,

    /// 作成しようとしたルームコードが使用中（クライアントは join にフォールバックする）
    #[error("Room already exists")]
    RoomAlreadyExists,

    /// roomId が指定されていない
    #[error("Room ID is required")]
    RoomIdRequired,

    /// roomId の形式が不正
    #[error("Invalid room ID: {0}")]
    InvalidRoomId(ValueObjectError),

    /// ルームに所属していない接続からのルーム宛てメッセージ
    #[error("Connection is not in a room")]
    NotInRoom,

    /// ホスト以外からのホスト専用メッセージ（クライアントには通知しない）
    #[error("Only the host may perform this action")]
    UnauthorizedHostAction,

    /// Registry に登録されていない接続
    #[error("Unknown connection: {0}")]
    UnknownConnection(ConnectionId),
}

impl RelayError {
    /// 送信元に `error` として返すべきエラーかどうか
    pub fn is_reported_to_sender(&self) -> bool {
        matches!(
            self,
            RelayError::RoomNotFound
                | RelayError::RoomAlreadyExists
                | RelayError::RoomIdRequired
                | RelayError::InvalidRoomId(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_error_messages() {
        // テスト項目: クライアントに返すエラー文言が期待通りである
        // given (前提条件):

        // when (操作):
        let not_found = RelayError::RoomNotFound.to_string();
        let exists = RelayError::RoomAlreadyExists.to_string();
        let required = RelayError::RoomIdRequired.to_string();

        // then (期待する結果):
        assert_eq!(not_found, "Room not found");
        assert_eq!(exists, "Room already exists");
        assert_eq!(required, "Room ID is required");
    }

    #[test]
    fn test_unauthorized_host_action_is_not_reported() {
        // テスト項目: ホスト権限違反は送信元に通知されない
        // given (前提条件):
        let error = RelayError::UnauthorizedHostAction;

        // when (操作):
        let reported = error.is_reported_to_sender();

        // then (期待する結果):
        assert!(!reported);
        assert!(RelayError::RoomNotFound.is_reported_to_sender());
    }
}
