//! UseCase: ルームの作成・参加・退出（Membership Manager）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - MembershipUseCase の create_room / join_room / leave_room
//! - 各操作で誰にどのメッセージがどの順序で届くか
//!
//! ### なぜこのテストが必要か
//! - ホストが常に 1 人であること、重複接続が追い出されることをクライアントから見える形で保証する
//! - 参加者には必ずホストへの同期要求が飛ぶことを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：作成 → 参加 → 退出
//! - 異常系：存在しないルームへの参加、使用中のルームコードでの作成、roomId なし
//! - エッジケース：同じルームへの再参加、同じ client_id での再接続、ホストの退出

use std::sync::Arc;

use syncroom_shared::time::Clock;

use crate::{
    domain::{
        ClientId, ConnectionId, CreateOutcome, JoinOutcome, RelayError, RelayRepository, RoomId,
        Timestamp, ValueObjectError,
    },
    infrastructure::dto::{conversion::room_members_message, websocket::ServerMessage},
};

use super::notifier::Notifier;

/// roomId をドメインモデルに変換
fn parse_room_id(room_id: Option<String>) -> Result<RoomId, RelayError> {
    let room_id = room_id.ok_or(RelayError::RoomIdRequired)?;
    RoomId::new(room_id).map_err(|e| match e {
        ValueObjectError::RoomIdEmpty => RelayError::RoomIdRequired,
        other => RelayError::InvalidRoomId(other),
    })
}

/// 名乗られた clientId をドメインモデルに変換（不正な値は名乗りなしとして扱う）
fn parse_client_id(client_id: Option<String>) -> Option<ClientId> {
    client_id.and_then(|id| match ClientId::new(id) {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::debug!("Ignoring claimed client ID: {}", e);
            None
        }
    })
}

/// メンバーシップのユースケース
pub struct MembershipUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn RelayRepository>,
    /// メッセージ送信
    notifier: Notifier,
    /// 参加時刻の取得
    clock: Arc<dyn Clock>,
}

impl MembershipUseCase {
    /// 新しい MembershipUseCase を作成
    pub fn new(
        repository: Arc<dyn RelayRepository>,
        notifier: Notifier,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            notifier,
            clock,
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    async fn reply_error(&self, connection: ConnectionId, error: &RelayError) {
        if error.is_reported_to_sender() {
            self.notifier
                .send(connection, &ServerMessage::error(error.to_string()))
                .await;
        }
    }

    /// ルームを作成
    ///
    /// 成功・失敗にかかわらず送信元には必ず応答する
    /// （`room_created` または `error`）。
    pub async fn create_room(
        &self,
        connection: ConnectionId,
        room_id: Option<String>,
        client_id: Option<String>,
    ) -> Result<CreateOutcome, RelayError> {
        let room_id = match parse_room_id(room_id) {
            Ok(id) => id,
            Err(e) => {
                self.reply_error(connection, &e).await;
                return Err(e);
            }
        };

        let _ordered = self.notifier.ordered().await;
        let transition = self
            .repository
            .create_room(connection, room_id.clone(), parse_client_id(client_id), self.now())
            .await;

        if let Some(previous) = &transition.previous {
            self.notifier.announce_departure(previous).await;
        }

        match transition.result {
            Ok(outcome) => {
                tracing::info!(
                    "Room {} created by '{}' ({})",
                    outcome.room_id,
                    outcome.client_id,
                    connection
                );
                self.notifier
                    .send(
                        connection,
                        &ServerMessage::RoomCreated {
                            room_id: outcome.room_id.as_str().to_string(),
                            is_host: true,
                            participants: outcome.members.len(),
                        },
                    )
                    .await;
                self.notifier
                    .broadcast(
                        outcome.members.iter().map(|p| p.connection).collect(),
                        &room_members_message(&outcome.members),
                    )
                    .await;
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!("Failed to create room {} for {}: {}", room_id, connection, e);
                self.reply_error(connection, &e).await;
                Err(e)
            }
        }
    }

    /// ルームに参加
    ///
    /// 成功・失敗にかかわらず送信元には必ず応答する
    /// （`room_joined` または `error`）。
    pub async fn join_room(
        &self,
        connection: ConnectionId,
        room_id: Option<String>,
        client_id: Option<String>,
    ) -> Result<JoinOutcome, RelayError> {
        let room_id = match parse_room_id(room_id) {
            Ok(id) => id,
            Err(e) => {
                self.reply_error(connection, &e).await;
                return Err(e);
            }
        };

        let _ordered = self.notifier.ordered().await;
        let transition = self
            .repository
            .join_room(connection, room_id.clone(), parse_client_id(client_id), self.now())
            .await;

        if let Some(previous) = &transition.previous {
            self.notifier.announce_departure(previous).await;
        }

        let outcome = match transition.result {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("Failed to join room {} for {}: {}", room_id, connection, e);
                self.reply_error(connection, &e).await;
                return Err(e);
            }
        };

        match &outcome {
            JoinOutcome::AlreadyJoined {
                room_id,
                is_host,
                members,
                ..
            } => {
                tracing::debug!("{} is already in room {}", connection, room_id);
                self.notifier
                    .send(
                        connection,
                        &ServerMessage::RoomJoined {
                            room_id: room_id.as_str().to_string(),
                            is_host: *is_host,
                            participants: members.len(),
                        },
                    )
                    .await;
                self.notifier
                    .send(connection, &room_members_message(members))
                    .await;
            }
            JoinOutcome::Joined {
                room_id,
                client_id,
                is_host,
                members,
                evicted,
                sync_host,
            } => {
                if let Some(eviction) = evicted {
                    // 書き込みチャンネルを破棄して古いトランスポートを閉じる
                    self.notifier
                        .message_pusher()
                        .unregister_client(eviction.connection)
                        .await;
                }

                tracing::info!(
                    "'{}' ({}) joined room {} (host: {}, participants: {})",
                    client_id,
                    connection,
                    room_id,
                    is_host,
                    members.len()
                );

                self.notifier
                    .send(
                        connection,
                        &ServerMessage::RoomJoined {
                            room_id: room_id.as_str().to_string(),
                            is_host: *is_host,
                            participants: members.len(),
                        },
                    )
                    .await;

                let others: Vec<ConnectionId> = members
                    .iter()
                    .map(|p| p.connection)
                    .filter(|c| *c != connection)
                    .collect();
                self.notifier
                    .broadcast(
                        others,
                        &ServerMessage::ParticipantJoined {
                            participants: members.len(),
                        },
                    )
                    .await;

                self.notifier
                    .broadcast(
                        members.iter().map(|p| p.connection).collect(),
                        &room_members_message(members),
                    )
                    .await;

                if let Some(host) = sync_host {
                    self.notifier
                        .send(
                            *host,
                            &ServerMessage::SyncRequest {
                                from: client_id.as_str().to_string(),
                            },
                        )
                        .await;
                }
            }
        }

        Ok(outcome)
    }

    /// 現在のルームから退出（ルームにいなければ何もしない）
    ///
    /// 退出した接続は開いたままで、再び作成・参加できる。
    pub async fn leave_room(&self, connection: ConnectionId) -> bool {
        let _ordered = self.notifier.ordered().await;
        let Some(outcome) = self.repository.leave_room(connection).await else {
            tracing::debug!("{} requested leave but is not in a room", connection);
            return false;
        };

        tracing::info!(
            "'{}' ({}) left room {}",
            outcome.client_id,
            connection,
            outcome.room_id
        );
        self.notifier.announce_departure(&outcome).await;
        self.notifier.send(connection, &ServerMessage::RoomLeft).await;
        true
    }
}
