//! UseCase: ルーム情報の取得（HTTP API 向け）

use std::sync::Arc;

use crate::domain::{RelayRepository, Room, RoomId};

use super::error::GetRoomDetailError;

/// ルーム一覧取得のユースケース
pub struct GetRoomsUseCase {
    repository: Arc<dyn RelayRepository>,
}

impl GetRoomsUseCase {
    pub fn new(repository: Arc<dyn RelayRepository>) -> Self {
        Self { repository }
    }

    /// 全ルームのスナップショット（ID 順）
    pub async fn execute(&self) -> Vec<Room> {
        self.repository.get_rooms().await
    }

    /// アクティブなルーム数
    pub async fn count(&self) -> usize {
        self.repository.count_rooms().await
    }
}

/// ルーム詳細取得のユースケース
pub struct GetRoomDetailUseCase {
    repository: Arc<dyn RelayRepository>,
}

impl GetRoomDetailUseCase {
    pub fn new(repository: Arc<dyn RelayRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(&self, room_id: String) -> Result<Room, GetRoomDetailError> {
        let room_id = RoomId::new(room_id).map_err(|_| GetRoomDetailError::InvalidRoomId)?;
        self.repository
            .get_room(&room_id)
            .await
            .ok_or(GetRoomDetailError::RoomNotFound)
    }
}
