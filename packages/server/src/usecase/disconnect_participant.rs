//! UseCase: 接続のクローズ処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() メソッド
//! - 切断時の退出処理と残りの参加者への通知
//!
//! ### なぜこのテストが必要か
//! - ホストが切断しても、ルームにはホストが 1 人残ることを保証
//! - 追い出された古い接続のクローズでは、ルームに何も起きないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加者の切断
//! - エッジケース：ホストの切断、最後の参加者の切断、追い出し済み接続の切断

use std::sync::Arc;

use crate::domain::{ConnectionId, LeaveOutcome, RelayRepository};

use super::notifier::Notifier;

/// 接続クローズのユースケース
pub struct DisconnectParticipantUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn RelayRepository>,
    /// メッセージ送信
    notifier: Notifier,
}

impl DisconnectParticipantUseCase {
    /// 新しい DisconnectParticipantUseCase を作成
    pub fn new(repository: Arc<dyn RelayRepository>, notifier: Notifier) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    /// 接続のクローズを処理する
    ///
    /// 何度呼ばれても 2 回目以降は何もしない。
    ///
    /// # Returns
    ///
    /// 退出が発生した場合はその結果
    pub async fn execute(&self, connection: ConnectionId) -> Option<LeaveOutcome> {
        // 1. Registry とルームから取り除く
        let _ordered = self.notifier.ordered().await;
        let outcome = self.repository.release_connection(connection).await;

        // 2. 残りの参加者に通知
        if let Some(outcome) = &outcome {
            tracing::info!(
                "'{}' ({}) disconnected from room {}",
                outcome.client_id,
                connection,
                outcome.room_id
            );
            self.notifier.announce_departure(outcome).await;
        }

        // 3. 送信チャンネルを破棄
        self.notifier
            .message_pusher()
            .unregister_client(connection)
            .await;

        tracing::info!("Connection {} closed", connection);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{MessagePusher, RoomId},
        usecase::membership::tests::TestHarness,
    };
    use serde_json::json;

    fn create_usecase(harness: &TestHarness) -> DisconnectParticipantUseCase {
        DisconnectParticipantUseCase::new(
            harness.repository.clone(),
            harness.notifier.clone(),
        )
    }

    fn some(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[tokio::test]
    async fn test_disconnect_host_promotes_next_participant() {
        // テスト項目: ホストが切断すると残った参加者がホストになり、通知を受け取る
        // given (前提条件):
        let harness = TestHarness::new();
        let usecase = create_usecase(&harness);
        let mut a = harness.connect().await;
        let mut b = harness.connect().await;
        harness
            .membership
            .create_room(a.id, some("ABC1234"), some("alice"))
            .await
            .unwrap();
        harness
            .membership
            .join_room(b.id, some("ABC1234"), some("bob"))
            .await
            .unwrap();
        a.drain();
        b.drain();

        // when (操作):
        let outcome = usecase.execute(a.id).await;

        // then (期待する結果):
        let outcome = outcome.unwrap();
        assert!(outcome.was_host);
        assert_eq!(outcome.new_host, Some(b.id));
        assert_eq!(
            b.drain(),
            vec![
                json!({"type": "participant_left", "participants": 1}),
                json!({"type": "host_assigned", "isHost": true}),
                json!({"type": "room_members", "members": [{"clientId": "bob", "isHost": true}]}),
            ]
        );
        assert!(a.is_closed());
        assert_eq!(harness.repository.count_connections().await, 1);
    }

    #[tokio::test]
    async fn test_disconnect_last_participant_deletes_room() {
        // テスト項目: 最後の参加者が切断するとルームが削除される
        // given (前提条件):
        let harness = TestHarness::new();
        let usecase = create_usecase(&harness);
        let a = harness.connect().await;
        harness
            .membership
            .create_room(a.id, some("ABC1234"), some("alice"))
            .await
            .unwrap();

        // when (操作):
        let outcome = usecase.execute(a.id).await;

        // then (期待する結果):
        assert!(outcome.unwrap().room_closed);
        assert_eq!(harness.repository.count_rooms().await, 0);
        assert!(
            harness
                .repository
                .get_room(&RoomId::new("ABC1234".to_string()).unwrap())
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_disconnect_evicted_connection_leaves_room_untouched() {
        // テスト項目: 追い出された古い接続のクローズでは退出が通知されない
        // given (前提条件):
        let harness = TestHarness::new();
        let usecase = create_usecase(&harness);
        let mut a = harness.connect().await;
        let b_old = harness.connect().await;
        let b_new = harness.connect().await;
        harness
            .membership
            .create_room(a.id, some("ABC1234"), some("alice"))
            .await
            .unwrap();
        harness
            .membership
            .join_room(b_old.id, some("ABC1234"), some("bob"))
            .await
            .unwrap();
        harness
            .membership
            .join_room(b_new.id, some("ABC1234"), some("bob"))
            .await
            .unwrap();
        a.drain();

        // when (操作):
        let outcome = usecase.execute(b_old.id).await;

        // then (期待する結果):
        assert!(outcome.is_none());
        assert!(a.drain().is_empty());
        let room = harness
            .repository
            .get_room(&RoomId::new("ABC1234".to_string()).unwrap())
            .await
            .unwrap();
        assert_eq!(room.participant_count(), 2);
        assert!(room.contains(b_new.id));
    }

    #[tokio::test]
    async fn test_disconnect_twice_is_noop() {
        // テスト項目: 同じ接続の 2 回目のクローズは何もしない
        // given (前提条件):
        let harness = TestHarness::new();
        let usecase = create_usecase(&harness);
        let a = harness.connect().await;
        let mut b = harness.connect().await;
        harness
            .membership
            .create_room(a.id, some("ABC1234"), some("alice"))
            .await
            .unwrap();
        harness
            .membership
            .join_room(b.id, some("ABC1234"), some("bob"))
            .await
            .unwrap();
        usecase.execute(a.id).await;
        b.drain();

        // when (操作):
        let outcome = usecase.execute(a.id).await;

        // then (期待する結果):
        assert!(outcome.is_none());
        assert!(b.drain().is_empty());
        assert_eq!(harness.pusher.connected_clients().await, vec![b.id]);
    }

    #[tokio::test]
    async fn test_promoted_host_learns_role_before_member_list() {
        // テスト項目: ホストの切断と参加が並行しても、新ホストは自分がホストの room_members より先に host_assigned を受け取る
        // given (前提条件):
        let harness = TestHarness::new();
        let usecase = Arc::new(create_usecase(&harness));
        let a = harness.connect().await;
        let mut b = harness.connect().await;
        let c = harness.connect().await;
        harness
            .membership
            .create_room(a.id, some("ABC1234"), some("alice"))
            .await
            .unwrap();
        harness
            .membership
            .join_room(b.id, some("ABC1234"), some("bob"))
            .await
            .unwrap();
        b.drain();

        // when (操作):
        let disconnect = {
            let usecase = usecase.clone();
            let a_id = a.id;
            tokio::spawn(async move { usecase.execute(a_id).await })
        };
        let join = {
            let membership = harness.membership.clone();
            let c_id = c.id;
            tokio::spawn(async move {
                membership
                    .join_room(c_id, some("ABC1234"), some("charlie"))
                    .await
            })
        };
        disconnect.await.unwrap();
        join.await.unwrap().unwrap();

        // then (期待する結果):
        let received = b.drain();
        let assigned_at = received
            .iter()
            .position(|m| m["type"] == "host_assigned")
            .unwrap();
        let bob_is_host = |m: &serde_json::Value| {
            m["type"] == "room_members"
                && m["members"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .any(|p| p["clientId"] == "bob" && p["isHost"] == true)
        };
        let first_listed_as_host = received.iter().position(bob_is_host).unwrap();
        assert!(assigned_at < first_listed_as_host);
    }
}
