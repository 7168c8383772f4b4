//! Room Store
//!
//! ルームコードからルームへの対応表。ルームコードごとにルームは高々 1 つ。
//! ブロードキャストは行わず、参加者の参照だけを提供する。

use std::collections::HashMap;

use super::{
    entity::Room,
    error::RelayError,
    value_object::{ClientId, ConnectionId, RoomId, Timestamp},
};

#[derive(Debug, Default)]
pub struct RoomStore {
    rooms: HashMap<RoomId, Room>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, room_id: &RoomId) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn get_mut(&mut self, room_id: &RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// ルームを作成する。作成者はそのままホストになる。
    pub fn create(
        &mut self,
        room_id: RoomId,
        host_connection: ConnectionId,
        host_client_id: ClientId,
        created_at: Timestamp,
    ) -> Result<&Room, RelayError> {
        if self.rooms.contains_key(&room_id) {
            return Err(RelayError::RoomAlreadyExists);
        }
        let room = Room::new(room_id.clone(), host_connection, host_client_id, created_at);
        Ok(self.rooms.entry(room_id).or_insert(room))
    }

    /// ルームを削除する（存在しなくてもよい）
    pub fn remove(&mut self, room_id: &RoomId) -> Option<Room> {
        self.rooms.remove(room_id)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn clear(&mut self) {
        self.rooms.clear();
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
