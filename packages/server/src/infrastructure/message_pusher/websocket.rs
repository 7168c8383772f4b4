//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - WebSocket の `UnboundedSender` を接続ハンドルごとに管理
//! - クライアントへのメッセージ送信（push_to, broadcast）
//! - 送信チャンネルの破棄によるトランスポートのクローズ
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層（`src/ui/handler/websocket.rs`）で行われます。
//! この実装は生成された `UnboundedSender` を受け取り、メッセージ送信に使用します。
//! `unregister_client` で sender を drop すると、UI 層の書き込みタスクが
//! close フレームを送って終了します。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ConnectionId, MessagePushError, MessagePusher, PusherChannel};

/// WebSocket を使った MessagePusher 実装
///
/// ## 使用例
///
/// ```ignore
/// let clients = Arc::new(Mutex::new(HashMap::new()));
/// let pusher = WebSocketMessagePusher::new(clients.clone());
///
/// pusher.push_to(connection, "{\"type\":\"pong\"}").await?;
/// ```
pub struct WebSocketMessagePusher {
    /// Key: ConnectionId
    /// Value: PusherChannel
    clients: Arc<Mutex<HashMap<ConnectionId, PusherChannel>>>,
}

impl WebSocketMessagePusher {
    /// 新しい WebSocketMessagePusher を作成
    pub fn new(clients: Arc<Mutex<HashMap<ConnectionId, PusherChannel>>>) -> Self {
        Self { clients }
    }
}

impl Default for WebSocketMessagePusher {
    fn default() -> Self {
        Self::new(Arc::new(Mutex::new(HashMap::new())))
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, connection: ConnectionId, sender: PusherChannel) {
        let mut clients = self.clients.lock().await;
        clients.insert(connection, sender);
        tracing::debug!("Connection {} registered to MessagePusher", connection);
    }

    async fn unregister_client(&self, connection: ConnectionId) {
        let mut clients = self.clients.lock().await;
        if clients.remove(&connection).is_some() {
            tracing::debug!("Connection {} unregistered from MessagePusher", connection);
        }
    }

    async fn push_to(
        &self,
        connection: ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;

        let sender = clients
            .get(&connection)
            .ok_or(MessagePushError::ClientNotFound(connection))?;
        sender
            .send(content.to_string())
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
        tracing::debug!("Pushed message to {}", connection);
        Ok(())
    }

    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;

        for target in targets {
            if let Some(sender) = clients.get(&target) {
                // 書き込みタスクが終了済みの接続は、その接続自身の切断処理で片付く
                if let Err(e) = sender.send(content.to_string()) {
                    tracing::warn!("Failed to push message to {}: {}", target, e);
                } else {
                    tracing::debug!("Broadcasted message to {}", target);
                }
            } else {
                tracing::warn!("{} not found during broadcast, skipping", target);
            }
        }

        Ok(())
    }

    async fn connected_clients(&self) -> Vec<ConnectionId> {
        let clients = self.clients.lock().await;
        let mut connections: Vec<ConnectionId> = clients.keys().copied().collect();
        connections.sort();
        connections
    }
}
