//! UseCase: 受信メッセージの振り分け（Message Router）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - RouteMessageUseCase::execute() メソッド
//! - 受信したテキストフレームの種類ごとの配信先
//!
//! ### なぜこのテストが必要か
//! - sync_response を配信できるのはホストだけであることを保証
//! - 解釈しないメッセージが加工されずに同じルームの他の参加者へ届くことを保証
//! - 壊れたメッセージで接続が落ちないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：sync_request / sync_response / ping / 再生イベントの転送
//! - 異常系：JSON でない入力、ホスト以外からの sync_response
//! - エッジケース：ルームに入っていない接続からの転送要求

use std::sync::Arc;

use crate::{
    domain::{ConnectionId, RelayRepository},
    infrastructure::dto::websocket::{ClientMessage, MALFORMED_MESSAGE_REPLY, ServerMessage},
};

use super::{membership::MembershipUseCase, notifier::Notifier};

/// メッセージ振り分けのユースケース
pub struct RouteMessageUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn RelayRepository>,
    /// ルームの作成・参加・退出
    membership: Arc<MembershipUseCase>,
    /// メッセージ送信
    notifier: Notifier,
}

impl RouteMessageUseCase {
    /// 新しい RouteMessageUseCase を作成
    pub fn new(
        repository: Arc<dyn RelayRepository>,
        membership: Arc<MembershipUseCase>,
        notifier: Notifier,
    ) -> Self {
        Self {
            repository,
            membership,
            notifier,
        }
    }

    /// 1 つのテキストフレームを処理する
    ///
    /// どの入力でも接続は閉じない。失敗は送信元への `error` か、破棄のどちらか。
    pub async fn execute(&self, connection: ConnectionId, text: &str) {
        let message = match ClientMessage::decode(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("{} from {}", e, connection);
                self.notifier
                    .send(connection, &ServerMessage::error(MALFORMED_MESSAGE_REPLY))
                    .await;
                return;
            }
        };

        match message {
            // 失敗は送信元に応答済み
            ClientMessage::CreateRoom { room_id, client_id } => {
                if let Err(e) = self
                    .membership
                    .create_room(connection, room_id, client_id)
                    .await
                {
                    tracing::debug!("create_room from {} rejected: {}", connection, e);
                }
            }
            ClientMessage::JoinRoom { room_id, client_id } => {
                if let Err(e) = self
                    .membership
                    .join_room(connection, room_id, client_id)
                    .await
                {
                    tracing::debug!("join_room from {} rejected: {}", connection, e);
                }
            }
            ClientMessage::LeaveRoom => {
                self.membership.leave_room(connection).await;
            }
            ClientMessage::SyncRequest => self.route_sync_request(connection).await,
            ClientMessage::SyncResponse {
                time,
                playing,
                volume,
                url,
                ..
            } => {
                let sync = ServerMessage::Sync {
                    time,
                    playing,
                    volume,
                    url,
                };
                self.route_sync_response(connection, sync).await;
            }
            ClientMessage::Ping => {
                self.notifier.send(connection, &ServerMessage::Pong).await;
            }
            ClientMessage::Relay => self.relay(connection, text).await,
        }
    }

    /// 参加者からの同期要求をホストに転送
    async fn route_sync_request(&self, connection: ConnectionId) {
        let _ordered = self.notifier.ordered().await;
        match self.repository.sync_request_route(connection).await {
            Ok(route) => {
                tracing::debug!("Forwarding sync_request from '{}' to {}", route.from, route.host);
                self.notifier
                    .send(
                        route.host,
                        &ServerMessage::SyncRequest {
                            from: route.from.into_string(),
                        },
                    )
                    .await;
            }
            Err(e) => tracing::debug!("Dropping sync_request from {}: {}", connection, e),
        }
    }

    /// ホストの再生状態を他の参加者に配信
    async fn route_sync_response(&self, connection: ConnectionId, sync: ServerMessage) {
        let _ordered = self.notifier.ordered().await;
        match self.repository.sync_broadcast_targets(connection).await {
            Ok(targets) => self.notifier.broadcast(targets, &sync).await,
            Err(e) => tracing::debug!("Dropping sync_response from {}: {}", connection, e),
        }
    }

    /// 解釈しないメッセージを同じルームの他の参加者にそのまま転送
    async fn relay(&self, connection: ConnectionId, text: &str) {
        let _ordered = self.notifier.ordered().await;
        match self.repository.fanout_targets(connection).await {
            Ok(targets) => self.notifier.broadcast_raw(targets, text).await,
            Err(e) => tracing::debug!("Dropping message from {}: {}", connection, e),
        }
    }
}
