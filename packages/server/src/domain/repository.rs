//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! メンバーシップを変更するメソッドは、それぞれ 1 回の呼び出しが
//! 1 つのクリティカルセクションとして実行されなければならない。

use async_trait::async_trait;

use super::{
    ClientId, ConnectionId, Room, RoomId, Timestamp,
    relay::{CreateOutcome, JoinOutcome, LeaveOutcome, SyncRoute, Transition},
    RelayError,
};

/// Relay Repository trait
///
/// Connection Registry と Room Store への操作をまとめたインターフェース。
/// UseCase 層はこの trait に依存し、Infrastructure 層の具体的な実装には依存しない。
#[async_trait]
pub trait RelayRepository: Send + Sync {
    /// 新しい接続を登録
    async fn register_connection(&self, connected_at: Timestamp) -> ConnectionId;

    /// ルームを作成（現在のルームからの退出を含む）
    async fn create_room(
        &self,
        connection: ConnectionId,
        room_id: RoomId,
        claimed: Option<ClientId>,
        now: Timestamp,
    ) -> Transition<CreateOutcome>;

    /// ルームに参加（退出・重複排除・追加を含む）
    async fn join_room(
        &self,
        connection: ConnectionId,
        room_id: RoomId,
        claimed: Option<ClientId>,
        now: Timestamp,
    ) -> Transition<JoinOutcome>;

    /// 現在のルームから退出
    async fn leave_room(&self, connection: ConnectionId) -> Option<LeaveOutcome>;

    /// トランスポートのクローズ時の後始末
    async fn release_connection(&self, connection: ConnectionId) -> Option<LeaveOutcome>;

    /// `sync_request` の転送先
    async fn sync_request_route(&self, connection: ConnectionId) -> Result<SyncRoute, RelayError>;

    /// `sync_response` の配信先
    async fn sync_broadcast_targets(
        &self,
        connection: ConnectionId,
    ) -> Result<Vec<ConnectionId>, RelayError>;

    /// 不透明メッセージのファンアウト先
    async fn fanout_targets(&self, connection: ConnectionId)
    -> Result<Vec<ConnectionId>, RelayError>;

    /// 全接続をクローズ済みにする
    async fn close_all(&self) -> Vec<ConnectionId>;

    /// Registry に残っている接続数
    async fn count_connections(&self) -> usize;

    /// ルーム数
    async fn count_rooms(&self) -> usize;

    /// 全ルームのスナップショット
    async fn get_rooms(&self) -> Vec<Room>;

    /// ルームのスナップショット
    async fn get_room(&self, room_id: &RoomId) -> Option<Room>;
}
