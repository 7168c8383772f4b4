//! UseCase: 接続の受け入れ
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 接続ごとに一意なハンドルが払い出され、Registry と MessagePusher の両方に登録されることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規接続
//! - エッジケース：複数の接続を続けて受け入れる

use std::sync::Arc;

use syncroom_shared::time::Clock;

use crate::domain::{ConnectionId, MessagePusher, PusherChannel, RelayRepository, Timestamp};

/// 接続受け入れのユースケース
pub struct ConnectParticipantUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn RelayRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    /// 接続時刻の取得
    clock: Arc<dyn Clock>,
}

impl ConnectParticipantUseCase {
    /// 新しい ConnectParticipantUseCase を作成
    pub fn new(
        repository: Arc<dyn RelayRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            clock,
        }
    }

    /// 接続を登録する
    ///
    /// この時点ではまだ client_id は決まらない（最初の create_room / join_room で決まる）。
    ///
    /// # Arguments
    ///
    /// * `sender` - クライアントへのメッセージ送信用チャンネル
    ///
    /// # Returns
    ///
    /// 払い出された接続ハンドル
    pub async fn execute(&self, sender: PusherChannel) -> ConnectionId {
        // 1. Registry に接続を登録
        let connected_at = Timestamp::new(self.clock.now_millis());
        let connection = self.repository.register_connection(connected_at).await;

        // 2. MessagePusher に送信チャンネルを登録
        self.message_pusher.register_client(connection, sender).await;

        tracing::info!("Connection {} established", connection);
        connection
    }
}
