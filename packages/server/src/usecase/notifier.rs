//! サーバーメッセージの送信ヘルパー
//!
//! `ServerMessage` を JSON にして `MessagePusher` に渡す。
//! 送信先がすでに切断していても送信元の処理は止めない（切断処理は相手側の接続で行われる）。
//!
//! ## 配信順序
//!
//! 状態の遷移はロック内で確定し、通知はロックの外で送られる。
//! 遷移と通知の間に別の遷移の通知が割り込まないよう、遷移を起こす側は
//! `ordered()` のガードを遷移の前に取得し、通知を送り終えるまで保持する。
//! これにより、クライアントに届く通知の順序は遷移が確定した順序と一致する。

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::{
    domain::{ConnectionId, LeaveOutcome, MessagePusher},
    infrastructure::dto::{conversion::room_members_message, websocket::ServerMessage},
};

#[derive(Clone)]
pub struct Notifier {
    message_pusher: Arc<dyn MessagePusher>,
    /// クローン間で共有される配信順序のロック
    order: Arc<Mutex<()>>,
}

impl Notifier {
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self {
            message_pusher,
            order: Arc::new(Mutex::new(())),
        }
    }

    /// 遷移とその通知をひとまとまりにするガード
    ///
    /// ガードを保持したまま別の `ordered()` を待つとデッドロックする。
    pub async fn ordered(&self) -> MutexGuard<'_, ()> {
        self.order.lock().await
    }

    pub fn message_pusher(&self) -> &Arc<dyn MessagePusher> {
        &self.message_pusher
    }

    fn encode(message: &ServerMessage) -> Option<String> {
        match message.to_json() {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::error!("Failed to encode {:?}: {}", message, e);
                None
            }
        }
    }

    /// 1 つの接続に送信
    pub async fn send(&self, connection: ConnectionId, message: &ServerMessage) {
        let Some(json) = Self::encode(message) else {
            return;
        };
        if let Err(e) = self.message_pusher.push_to(connection, &json).await {
            tracing::warn!("Failed to send message to {}: {}", connection, e);
        }
    }

    /// 複数の接続に送信
    pub async fn broadcast(&self, targets: Vec<ConnectionId>, message: &ServerMessage) {
        if targets.is_empty() {
            return;
        }
        let Some(json) = Self::encode(message) else {
            return;
        };
        self.broadcast_raw(targets, &json).await;
    }

    /// 受け取ったテキストをそのまま複数の接続に送信
    pub async fn broadcast_raw(&self, targets: Vec<ConnectionId>, text: &str) {
        if targets.is_empty() {
            return;
        }
        if let Err(e) = self.message_pusher.broadcast(targets, text).await {
            tracing::warn!("Failed to broadcast message: {}", e);
        }
    }

    /// 退出を残りの参加者に通知する
    ///
    /// 順序は `participant_left` → (新ホストへの) `host_assigned` → `room_members`。
    /// 新ホストは、他の参加者が更新後の `room_members` を受け取る前に昇格を知る。
    pub async fn announce_departure(&self, outcome: &LeaveOutcome) {
        if outcome.room_closed {
            tracing::info!("Room {} deleted", outcome.room_id);
            return;
        }

        let remaining: Vec<ConnectionId> =
            outcome.remaining.iter().map(|p| p.connection).collect();
        self.broadcast(
            remaining.clone(),
            &ServerMessage::ParticipantLeft {
                participants: remaining.len(),
            },
        )
        .await;

        if let Some(new_host) = outcome.new_host {
            tracing::info!(
                "Host of room {} left, {} promoted to host",
                outcome.room_id,
                new_host
            );
            self.send(new_host, &ServerMessage::HostAssigned { is_host: true })
                .await;
        }

        self.broadcast(remaining, &room_members_message(&outcome.remaining))
            .await;
    }
}
