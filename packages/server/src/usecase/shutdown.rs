//! UseCase: サーバー停止時の後始末（Lifecycle Controller）
//!
//! 停止シグナルを受けたら全接続に `server_shutdown` を送り、
//! ルームを破棄して、送信チャンネルを閉じる。
//! 各接続の切断処理が終わるまでは `wait_until_drained` で待つ。

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use crate::{
    domain::{ConnectionId, RelayRepository},
    infrastructure::dto::websocket::ServerMessage,
};

use super::notifier::Notifier;

/// 切断処理の完了を確認する間隔
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// サーバー停止のユースケース
pub struct ShutdownUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn RelayRepository>,
    /// メッセージ送信
    notifier: Notifier,
}

impl ShutdownUseCase {
    /// 新しい ShutdownUseCase を作成
    pub fn new(repository: Arc<dyn RelayRepository>, notifier: Notifier) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    /// 全接続に停止を通知して閉じる
    ///
    /// # Returns
    ///
    /// 通知した接続数
    pub async fn execute(&self) -> usize {
        let _ordered = self.notifier.ordered().await;
        let pusher = self.notifier.message_pusher();
        let connections = pusher.connected_clients().await;

        // 1. 停止を通知
        self.notifier
            .broadcast(connections.clone(), &ServerMessage::ServerShutdown)
            .await;

        // 2. ルームを破棄し、全接続をクローズ済みにする
        let closed = self.repository.close_all().await;
        tracing::info!(
            "Notified {} connection(s) of shutdown, closing {} registered connection(s)",
            connections.len(),
            closed.len()
        );

        // 3. 送信チャンネルを閉じる（書き込みタスクが close フレームを送る）
        //    通知後に登録された接続もクローズ済みなので一緒に閉じる
        let to_close: BTreeSet<ConnectionId> =
            connections.iter().chain(closed.iter()).copied().collect();
        for connection in to_close {
            pusher.unregister_client(connection).await;
        }

        connections.len()
    }

    /// すべての接続の切断処理が終わるまで待つ
    pub async fn wait_until_drained(&self) {
        loop {
            let remaining = self.repository.count_connections().await;
            if remaining == 0 {
                return;
            }
            tracing::debug!("Waiting for {} connection(s) to close", remaining);
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    }
}
