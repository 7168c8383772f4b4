//! InMemory Relay Repository 実装
//!
//! ドメイン層が定義する RelayRepository trait の具体的な実装。
//! `RelayState`（Connection Registry + Room Store）を 1 つの Mutex で保護します。
//!
//! ## ロックの粒度
//!
//! 想定するルーム数は多くないため、ルームごとではなくグローバルな Mutex を使う。
//! 各メソッドはロックを 1 回だけ取得し、その中で遷移を完結させる。
//! ブロードキャストはロックの外で、返されたスナップショットを使って行われる。
//! 通知の順序は UseCase 層が `Notifier::ordered()` で揃える。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ClientId, ConnectionId, CreateOutcome, JoinOutcome, LeaveOutcome, RelayError,
    RelayRepository, RelayState, Room, RoomId, SyncRoute, Timestamp, Transition,
};

/// インメモリ Relay Repository 実装
pub struct InMemoryRelayRepository {
    state: Arc<Mutex<RelayState>>,
}

impl InMemoryRelayRepository {
    /// 新しい InMemoryRelayRepository を作成
    pub fn new(state: Arc<Mutex<RelayState>>) -> Self {
        Self { state }
    }
}

impl Default for InMemoryRelayRepository {
    fn default() -> Self {
        Self::new(Arc::new(Mutex::new(RelayState::new())))
    }
}

#[async_trait]
impl RelayRepository for InMemoryRelayRepository {
    async fn register_connection(&self, connected_at: Timestamp) -> ConnectionId {
        let mut state = self.state.lock().await;
        state.register(connected_at)
    }

    async fn create_room(
        &self,
        connection: ConnectionId,
        room_id: RoomId,
        claimed: Option<ClientId>,
        now: Timestamp,
    ) -> Transition<CreateOutcome> {
        let mut state = self.state.lock().await;
        state.create_room(connection, room_id, claimed, now)
    }

    async fn join_room(
        &self,
        connection: ConnectionId,
        room_id: RoomId,
        claimed: Option<ClientId>,
        now: Timestamp,
    ) -> Transition<JoinOutcome> {
        let mut state = self.state.lock().await;
        state.join_room(connection, room_id, claimed, now)
    }

    async fn leave_room(&self, connection: ConnectionId) -> Option<LeaveOutcome> {
        let mut state = self.state.lock().await;
        state.leave_current_room(connection)
    }

    async fn release_connection(&self, connection: ConnectionId) -> Option<LeaveOutcome> {
        let mut state = self.state.lock().await;
        state.release(connection)
    }

    async fn sync_request_route(&self, connection: ConnectionId) -> Result<SyncRoute, RelayError> {
        let state = self.state.lock().await;
        state.sync_request_route(connection)
    }

    async fn sync_broadcast_targets(
        &self,
        connection: ConnectionId,
    ) -> Result<Vec<ConnectionId>, RelayError> {
        let state = self.state.lock().await;
        state.sync_broadcast_targets(connection)
    }

    async fn fanout_targets(
        &self,
        connection: ConnectionId,
    ) -> Result<Vec<ConnectionId>, RelayError> {
        let state = self.state.lock().await;
        state.fanout_targets(connection)
    }

    async fn close_all(&self) -> Vec<ConnectionId> {
        let mut state = self.state.lock().await;
        state.close_all()
    }

    async fn count_connections(&self) -> usize {
        let state = self.state.lock().await;
        state.registry().len()
    }

    async fn count_rooms(&self) -> usize {
        let state = self.state.lock().await;
        state.rooms().len()
    }

    async fn get_rooms(&self) -> Vec<Room> {
        let state = self.state.lock().await;
        let mut rooms: Vec<Room> = state.rooms().rooms().cloned().collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        rooms
    }

    async fn get_room(&self, room_id: &RoomId) -> Option<Room> {
        let state = self.state.lock().await;
        state.rooms().get(room_id).cloned()
    }
}
