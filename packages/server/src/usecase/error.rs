//! UseCase 層のエラー定義

use thiserror::Error;

/// ルーム詳細取得のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GetRoomDetailError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Invalid room ID")]
    InvalidRoomId,
}
