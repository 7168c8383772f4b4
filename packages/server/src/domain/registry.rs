//! Connection Registry
//!
//! 生きている接続ごとに、クライアント ID・所属ルーム・接続状態を記録する。
//! ルーム所属の書き換え（`bind` / `unbind`）はメンバーシップ処理からのみ行う。

use std::collections::HashMap;

use super::{
    error::RelayError,
    value_object::{ClientId, ClientIdFactory, ConnectionId, RoomId, Timestamp},
};

/// 接続状態
///
/// 切断時のクリーンアップは `Active` の接続に対してのみ退出処理を行う。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// 通常の接続
    Active,
    /// 同じクライアント ID の新しい接続に置き換えられた
    Evicted,
    /// サーバー停止などでクローズ済み
    Closed,
}

/// 接続ごとの記録
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    /// 最初の識別メッセージで確定し、以後変わらない
    pub client_id: Option<ClientId>,
    pub room: Option<RoomId>,
    pub state: ConnectionState,
    pub connected_at: Timestamp,
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    records: HashMap<ConnectionId, ConnectionRecord>,
    next_id: u64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新しい接続を登録してハンドルを払い出す
    pub fn register(&mut self, connected_at: Timestamp) -> ConnectionId {
        self.next_id += 1;
        let connection = ConnectionId::new(self.next_id);
        self.records.insert(
            connection,
            ConnectionRecord {
                client_id: None,
                room: None,
                state: ConnectionState::Active,
                connected_at,
            },
        );
        connection
    }

    /// 接続のクライアント ID を確定する
    ///
    /// 既に確定している場合はそれを返す。未確定なら名乗った ID を採用し、
    /// 名乗りがなければ新しく生成する。
    pub fn identify(
        &mut self,
        connection: ConnectionId,
        claimed: Option<ClientId>,
    ) -> Result<ClientId, RelayError> {
        let record = self
            .records
            .get_mut(&connection)
            .ok_or(RelayError::UnknownConnection(connection))?;

        if let Some(existing) = &record.client_id {
            return Ok(existing.clone());
        }

        let client_id = claimed.unwrap_or_else(ClientIdFactory::generate);
        record.client_id = Some(client_id.clone());
        Ok(client_id)
    }

    pub fn record(&self, connection: ConnectionId) -> Option<&ConnectionRecord> {
        self.records.get(&connection)
    }

    pub fn client_id_of(&self, connection: ConnectionId) -> Option<&ClientId> {
        self.records
            .get(&connection)
            .and_then(|record| record.client_id.as_ref())
    }

    pub fn room_of(&self, connection: ConnectionId) -> Option<&RoomId> {
        self.records
            .get(&connection)
            .and_then(|record| record.room.as_ref())
    }

    pub fn state_of(&self, connection: ConnectionId) -> Option<ConnectionState> {
        self.records.get(&connection).map(|record| record.state)
    }

    pub fn bind(&mut self, connection: ConnectionId, room_id: RoomId) {
        if let Some(record) = self.records.get_mut(&connection) {
            record.room = Some(room_id);
        }
    }

    pub fn unbind(&mut self, connection: ConnectionId) -> Option<RoomId> {
        self.records
            .get_mut(&connection)
            .and_then(|record| record.room.take())
    }

    /// 置き換えられた接続としてマークし、ルームから外す
    pub fn mark_evicted(&mut self, connection: ConnectionId) {
        if let Some(record) = self.records.get_mut(&connection) {
            record.state = ConnectionState::Evicted;
            record.room = None;
        }
    }

    /// 全接続をクローズ済みにして、そのハンドルを返す
    pub fn close_all(&mut self) -> Vec<ConnectionId> {
        self.records
            .iter_mut()
            .map(|(connection, record)| {
                record.state = ConnectionState::Closed;
                record.room = None;
                *connection
            })
            .collect()
    }

    /// 記録を削除する（トランスポートのクローズ時）
    pub fn release(&mut self, connection: ConnectionId) -> Option<ConnectionRecord> {
        self.records.remove(&connection)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
