//! MessagePusher trait 定義
//!
//! クライアントへのメッセージ送信（通知）の抽象化。
//! 具体的な実装（WebSocket など）は Infrastructure 層が提供します。

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::ConnectionId;

/// クライアントへの送信チャンネル
///
/// 送信側をすべて drop すると、その接続の書き込みタスクが終了しトランスポートが閉じる。
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// メッセージ送信エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("Client not found: {0}")]
    ClientNotFound(ConnectionId),

    #[error("Failed to push message: {0}")]
    PushFailed(String),
}

/// MessagePusher trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続の送信チャンネルを登録
    async fn register_client(&self, connection: ConnectionId, sender: PusherChannel);

    /// 送信チャンネルを破棄する（トランスポートのクローズを引き起こす）
    async fn unregister_client(&self, connection: ConnectionId);

    /// 特定の接続に送信
    async fn push_to(&self, connection: ConnectionId, content: &str)
    -> Result<(), MessagePushError>;

    /// 複数の接続に送信（一部の失敗は許容する）
    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        content: &str,
    ) -> Result<(), MessagePushError>;

    /// 登録中の全接続
    async fn connected_clients(&self) -> Vec<ConnectionId>;
}
