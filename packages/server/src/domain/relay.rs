//! Relay state (Membership Manager)
//!
//! Connection Registry と Room Store をまとめた集約。
//! create / join / leave / 重複排除 / ホスト昇格はすべてこの集約のメソッド 1 回で完結し、
//! 呼び出し側は 1 つのロックの中で呼び出す。これにより「ルームの存在確認」と
//! 「参加者の追加」の間に他の接続の操作が割り込むことはない。
//!
//! 各メソッドは状態を書き換えた結果（誰に何を通知すべきか）を返すだけで、
//! メッセージ送信は行わない。

use super::{
    dedup::{Eviction, evict_stale},
    entity::{Participant, Room},
    error::RelayError,
    registry::{ConnectionRegistry, ConnectionState},
    room_store::RoomStore,
    value_object::{ClientId, ConnectionId, RoomId, Timestamp},
};

/// 退出処理の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub room_id: RoomId,
    pub connection: ConnectionId,
    pub client_id: ClientId,
    pub was_host: bool,
    /// 最後の参加者が抜けてルームが削除された
    pub room_closed: bool,
    /// 退出後（昇格後）の参加者のスナップショット
    pub remaining: Vec<Participant>,
    /// 昇格した新ホスト
    pub new_host: Option<ConnectionId>,
}

/// ルーム作成の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOutcome {
    pub room_id: RoomId,
    pub client_id: ClientId,
    pub members: Vec<Participant>,
}

/// ルーム参加の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// すでに同じルームに参加している（冪等な再参加）
    AlreadyJoined {
        room_id: RoomId,
        client_id: ClientId,
        is_host: bool,
        members: Vec<Participant>,
    },
    /// 新たに参加した
    Joined {
        room_id: RoomId,
        client_id: ClientId,
        is_host: bool,
        members: Vec<Participant>,
        /// 追い出した古い接続（トランスポートを閉じる必要がある）
        evicted: Option<Eviction>,
        /// 状態のスナップショットを要求する相手（参加者として入った場合の現ホスト）
        sync_host: Option<ConnectionId>,
    },
}

/// 別ルームからの暗黙の退出を伴う遷移の結果
///
/// 本体の操作が失敗しても、先に行われた退出は取り消されないため両方を返す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition<T> {
    pub previous: Option<LeaveOutcome>,
    pub result: Result<T, RelayError>,
}

impl<T> Transition<T> {
    fn failed(previous: Option<LeaveOutcome>, error: RelayError) -> Self {
        Self {
            previous,
            result: Err(error),
        }
    }
}

/// `sync_request` の転送先
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRoute {
    pub host: ConnectionId,
    pub from: ClientId,
}

#[derive(Debug, Default)]
pub struct RelayState {
    registry: ConnectionRegistry,
    rooms: RoomStore,
}

impl RelayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn rooms(&self) -> &RoomStore {
        &self.rooms
    }

    pub fn register(&mut self, connected_at: Timestamp) -> ConnectionId {
        self.registry.register(connected_at)
    }

    /// 追い出し済み・クローズ済みの接続からの識別は受け付けない
    fn identify_active(
        &mut self,
        connection: ConnectionId,
        claimed: Option<ClientId>,
    ) -> Result<ClientId, RelayError> {
        match self.registry.state_of(connection) {
            Some(ConnectionState::Active) => self.registry.identify(connection, claimed),
            _ => Err(RelayError::UnknownConnection(connection)),
        }
    }

    /// ルームを作成する
    ///
    /// 既に別のルームにいる場合は先に退出する。
    pub fn create_room(
        &mut self,
        connection: ConnectionId,
        room_id: RoomId,
        claimed: Option<ClientId>,
        now: Timestamp,
    ) -> Transition<CreateOutcome> {
        let client_id = match self.identify_active(connection, claimed) {
            Ok(id) => id,
            Err(e) => return Transition::failed(None, e),
        };

        let previous = self.leave_current_room(connection);

        let members = match self
            .rooms
            .create(room_id.clone(), connection, client_id.clone(), now)
        {
            Ok(room) => room.participants().to_vec(),
            Err(e) => return Transition::failed(previous, e),
        };
        self.registry.bind(connection, room_id.clone());

        Transition {
            previous,
            result: Ok(CreateOutcome {
                room_id,
                client_id,
                members,
            }),
        }
    }

    /// ルームに参加する
    pub fn join_room(
        &mut self,
        connection: ConnectionId,
        room_id: RoomId,
        claimed: Option<ClientId>,
        now: Timestamp,
    ) -> Transition<JoinOutcome> {
        let client_id = match self.identify_active(connection, claimed) {
            Ok(id) => id,
            Err(e) => return Transition::failed(None, e),
        };

        if self.registry.room_of(connection) == Some(&room_id)
            && let Some(room) = self.rooms.get(&room_id)
            && room.contains(connection)
        {
            return Transition {
                previous: None,
                result: Ok(JoinOutcome::AlreadyJoined {
                    room_id,
                    client_id,
                    is_host: room.is_host(connection),
                    members: room.participants().to_vec(),
                }),
            };
        }

        // 参加先がなければ今のルームには触れない
        if self.rooms.get(&room_id).is_none() {
            return Transition::failed(None, RelayError::RoomNotFound);
        }

        let previous = self.leave_current_room(connection);

        let Some(room) = self.rooms.get_mut(&room_id) else {
            return Transition::failed(previous, RelayError::RoomNotFound);
        };

        let evicted = evict_stale(room, &mut self.registry, &client_id, connection);
        let inherits_host = evicted.is_some_and(|e| e.was_host);
        room.add_participant(Participant::new(
            connection,
            client_id.clone(),
            inherits_host,
            now,
        ));
        let is_host = room.is_host(connection);
        let sync_host = if is_host {
            None
        } else {
            room.host_connection()
        };
        let members = room.participants().to_vec();
        self.registry.bind(connection, room_id.clone());

        Transition {
            previous,
            result: Ok(JoinOutcome::Joined {
                room_id,
                client_id,
                is_host,
                members,
                evicted,
                sync_host,
            }),
        }
    }

    /// 現在のルームから退出する（ルームにいなければ何もしない）
    ///
    /// ホストが抜けた場合は残りの先頭を昇格させ、空になったルームは削除する。
    pub fn leave_current_room(&mut self, connection: ConnectionId) -> Option<LeaveOutcome> {
        let room_id = self.registry.unbind(connection)?;
        let room = self.rooms.get_mut(&room_id)?;
        let departure = room.remove_participant(connection)?;
        let remaining = room.participants().to_vec();
        let room_closed = room.is_empty();
        if room_closed {
            self.rooms.remove(&room_id);
        }

        Some(LeaveOutcome {
            room_id,
            connection,
            client_id: departure.participant.client_id,
            was_host: departure.participant.is_host,
            room_closed,
            remaining,
            new_host: departure.new_host,
        })
    }

    /// トランスポートのクローズ時の後始末
    ///
    /// `Active` の接続だけが退出処理の対象になる。追い出し済み・クローズ済みの接続は
    /// 記録を消すだけなので、同じ切断が二重に処理されることはない。
    pub fn release(&mut self, connection: ConnectionId) -> Option<LeaveOutcome> {
        let outcome = match self.registry.state_of(connection)? {
            ConnectionState::Active => self.leave_current_room(connection),
            ConnectionState::Evicted | ConnectionState::Closed => None,
        };
        self.registry.release(connection);
        outcome
    }

    fn current_room(&self, connection: ConnectionId) -> Result<&Room, RelayError> {
        self.registry
            .room_of(connection)
            .and_then(|room_id| self.rooms.get(room_id))
            .ok_or(RelayError::NotInRoom)
    }

    /// `sync_request` の転送先（現ホスト）
    pub fn sync_request_route(&self, connection: ConnectionId) -> Result<SyncRoute, RelayError> {
        let room = self.current_room(connection)?;
        let host = room.host_connection().ok_or(RelayError::NotInRoom)?;
        if host == connection {
            return Err(RelayError::UnauthorizedHostAction);
        }
        let from = room
            .participant(connection)
            .map(|p| p.client_id.clone())
            .ok_or(RelayError::NotInRoom)?;
        Ok(SyncRoute { host, from })
    }

    /// `sync_response` の配信先（ホスト以外の全参加者）
    pub fn sync_broadcast_targets(
        &self,
        connection: ConnectionId,
    ) -> Result<Vec<ConnectionId>, RelayError> {
        let room = self.current_room(connection)?;
        if !room.is_host(connection) {
            return Err(RelayError::UnauthorizedHostAction);
        }
        Ok(room.other_connections(connection))
    }

    /// 不透明メッセージのファンアウト先（送信者以外の全参加者）
    pub fn fanout_targets(&self, connection: ConnectionId) -> Result<Vec<ConnectionId>, RelayError> {
        Ok(self.current_room(connection)?.other_connections(connection))
    }

    /// サーバー停止時に全接続をクローズ済みにし、ルームを破棄する
    pub fn close_all(&mut self) -> Vec<ConnectionId> {
        self.rooms.clear();
        self.registry.close_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(id: &str) -> Option<ClientId> {
        Some(ClientId::new(id.to_string()).unwrap())
    }

    fn room_id(id: &str) -> RoomId {
        RoomId::new(id.to_string()).unwrap()
    }

    fn now() -> Timestamp {
        Timestamp::new(1000)
    }

    fn assert_all_rooms_consistent(state: &RelayState) {
        for room in state.rooms().rooms() {
            assert!(!room.is_empty(), "empty room {} must be removed", room.id);
            assert!(room.has_consistent_host(), "room {} host mismatch", room.id);
        }
    }

    #[test]
    fn test_create_room_makes_creator_host() {
        // テスト項目: ルーム作成者がホストになり、Registry にも所属が記録される
        // given (前提条件):
        let mut state = RelayState::new();
        let a = state.register(now());

        // when (操作):
        let transition = state.create_room(a, room_id("ABC1234"), client("alice"), now());

        // then (期待する結果):
        let outcome = transition.result.unwrap();
        assert_eq!(outcome.members.len(), 1);
        assert!(outcome.members[0].is_host);
        assert_eq!(state.registry().room_of(a), Some(&room_id("ABC1234")));
        assert!(transition.previous.is_none());
    }

    #[test]
    fn test_create_existing_room_fails() {
        // テスト項目: 使用中のルームコードでの作成は RoomAlreadyExists になる
        // given (前提条件):
        let mut state = RelayState::new();
        let a = state.register(now());
        let b = state.register(now());
        state
            .create_room(a, room_id("ABC1234"), client("alice"), now())
            .result
            .unwrap();

        // when (操作):
        let transition = state.create_room(b, room_id("ABC1234"), client("bob"), now());

        // then (期待する結果):
        assert_eq!(transition.result, Err(RelayError::RoomAlreadyExists));
        assert_eq!(state.rooms().len(), 1);
        assert_eq!(state.registry().room_of(b), None);
    }

    #[test]
    fn test_join_missing_room_has_no_side_effects() {
        // テスト項目: 存在しないルームへの参加は RoomNotFound になり、どのルームも変化しない
        // given (前提条件):
        let mut state = RelayState::new();
        let a = state.register(now());
        let b = state.register(now());
        state
            .create_room(a, room_id("ABC1234"), client("alice"), now())
            .result
            .unwrap();

        // when (操作):
        let transition = state.join_room(b, room_id("MISSING"), client("bob"), now());

        // then (期待する結果):
        assert_eq!(transition.result, Err(RelayError::RoomNotFound));
        assert!(transition.previous.is_none());
        assert_eq!(state.rooms().len(), 1);
        let room = state.rooms().get(&room_id("ABC1234")).unwrap();
        assert_eq!(room.participant_count(), 1);
    }

    #[test]
    fn test_join_missing_room_keeps_current_membership() {
        // テスト項目: ルーム参加中に存在しないルームへ参加しても、元のルームから退出しない
        // given (前提条件):
        let mut state = RelayState::new();
        let a = state.register(now());
        let b = state.register(now());
        state.create_room(a, room_id("ABC1234"), client("alice"), now());
        state.join_room(b, room_id("ABC1234"), client("bob"), now());

        // when (操作):
        let transition = state.join_room(b, room_id("MISSING"), None, now());

        // then (期待する結果):
        assert_eq!(transition.result, Err(RelayError::RoomNotFound));
        assert!(transition.previous.is_none());
        assert_eq!(state.registry().room_of(b), Some(&room_id("ABC1234")));
        let room = state.rooms().get(&room_id("ABC1234")).unwrap();
        assert_eq!(room.participant_count(), 2);
        assert!(room.contains(b));
    }

    #[test]
    fn test_join_as_participant_requests_sync_from_host() {
        // テスト項目: 参加者として入ると現ホストが同期要求先として返される
        // given (前提条件):
        let mut state = RelayState::new();
        let a = state.register(now());
        let b = state.register(now());
        state
            .create_room(a, room_id("ABC1234"), client("alice"), now())
            .result
            .unwrap();

        // when (操作):
        let transition = state.join_room(b, room_id("ABC1234"), client("bob"), now());

        // then (期待する結果):
        match transition.result.unwrap() {
            JoinOutcome::Joined {
                is_host,
                members,
                evicted,
                sync_host,
                ..
            } => {
                assert!(!is_host);
                assert_eq!(members.len(), 2);
                assert_eq!(evicted, None);
                assert_eq!(sync_host, Some(a));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_rejoin_same_room_is_idempotent() {
        // テスト項目: 同じルームへの再参加は現在の状態を返すだけで参加者は増えない
        // given (前提条件):
        let mut state = RelayState::new();
        let a = state.register(now());
        let b = state.register(now());
        state.create_room(a, room_id("ABC1234"), client("alice"), now());
        state.join_room(b, room_id("ABC1234"), client("bob"), now());

        // when (操作):
        let transition = state.join_room(b, room_id("ABC1234"), client("bob"), now());

        // then (期待する結果):
        match transition.result.unwrap() {
            JoinOutcome::AlreadyJoined {
                is_host, members, ..
            } => {
                assert!(!is_host);
                assert_eq!(members.len(), 2);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_reconnect_evicts_stale_connection() {
        // テスト項目: 同じ client_id で再接続すると古い接続が追い出され、参加者数は増えない
        // given (前提条件):
        let mut state = RelayState::new();
        let a = state.register(now());
        let b_old = state.register(now());
        let b_new = state.register(now());
        state.create_room(a, room_id("ABC1234"), client("alice"), now());
        state.join_room(b_old, room_id("ABC1234"), client("bob"), now());

        // when (操作):
        let transition = state.join_room(b_new, room_id("ABC1234"), client("bob"), now());

        // then (期待する結果):
        match transition.result.unwrap() {
            JoinOutcome::Joined {
                members, evicted, ..
            } => {
                assert_eq!(members.len(), 2);
                assert_eq!(
                    evicted,
                    Some(Eviction {
                        connection: b_old,
                        was_host: false,
                    })
                );
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(
            state.registry().state_of(b_old),
            Some(ConnectionState::Evicted)
        );

        // 追い出された接続の切断処理では何も起きない
        assert_eq!(state.release(b_old), None);
        let room = state.rooms().get(&room_id("ABC1234")).unwrap();
        assert_eq!(room.participant_count(), 2);
        assert!(room.contains(b_new));
    }

    #[test]
    fn test_reconnecting_host_inherits_host_role() {
        // テスト項目: ホストが再接続すると新しい接続がホストを引き継ぎ、同期要求先はない
        // given (前提条件):
        let mut state = RelayState::new();
        let a_old = state.register(now());
        let b = state.register(now());
        let a_new = state.register(now());
        state.create_room(a_old, room_id("ABC1234"), client("alice"), now());
        state.join_room(b, room_id("ABC1234"), client("bob"), now());

        // when (操作):
        let transition = state.join_room(a_new, room_id("ABC1234"), client("alice"), now());

        // then (期待する結果):
        match transition.result.unwrap() {
            JoinOutcome::Joined {
                is_host, sync_host, ..
            } => {
                assert!(is_host);
                assert_eq!(sync_host, None);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        let room = state.rooms().get(&room_id("ABC1234")).unwrap();
        assert_eq!(room.host_connection(), Some(a_new));
        assert!(room.has_consistent_host());
    }

    #[test]
    fn test_host_departure_promotes_exactly_one() {
        // テスト項目: ホストが抜けると残りのうち参加順で先頭の 1 人だけがホストになる
        // given (前提条件):
        let mut state = RelayState::new();
        let a = state.register(now());
        let b = state.register(now());
        let c = state.register(now());
        state.create_room(a, room_id("ABC1234"), client("alice"), now());
        state.join_room(b, room_id("ABC1234"), client("bob"), now());
        state.join_room(c, room_id("ABC1234"), client("charlie"), now());

        // when (操作):
        let outcome = state.release(a).unwrap();

        // then (期待する結果):
        assert!(outcome.was_host);
        assert!(!outcome.room_closed);
        assert_eq!(outcome.new_host, Some(b));
        assert_eq!(outcome.remaining.iter().filter(|p| p.is_host).count(), 1);
        assert_all_rooms_consistent(&state);
    }

    #[test]
    fn test_last_leave_removes_room() {
        // テスト項目: 最後の参加者が抜けるとルームが削除され、以後の参加は RoomNotFound になる
        // given (前提条件):
        let mut state = RelayState::new();
        let a = state.register(now());
        let b = state.register(now());
        state.create_room(a, room_id("ABC1234"), client("alice"), now());

        // when (操作):
        let outcome = state.leave_current_room(a).unwrap();

        // then (期待する結果):
        assert!(outcome.room_closed);
        assert!(state.rooms().is_empty());
        let transition = state.join_room(b, room_id("ABC1234"), client("bob"), now());
        assert_eq!(transition.result, Err(RelayError::RoomNotFound));
    }

    #[test]
    fn test_join_other_room_leaves_current_room() {
        // テスト項目: 別のルームに参加すると元のルームから退出する
        // given (前提条件):
        let mut state = RelayState::new();
        let a = state.register(now());
        let b = state.register(now());
        let c = state.register(now());
        state.create_room(a, room_id("ROOM1"), client("alice"), now());
        state.create_room(b, room_id("ROOM2"), client("bob"), now());
        state.join_room(c, room_id("ROOM1"), client("charlie"), now());

        // when (操作):
        let transition = state.join_room(c, room_id("ROOM2"), None, now());

        // then (期待する結果):
        let previous = transition.previous.unwrap();
        assert_eq!(previous.room_id, room_id("ROOM1"));
        assert_eq!(previous.remaining.len(), 1);
        assert!(transition.result.is_ok());
        assert_eq!(state.registry().room_of(c), Some(&room_id("ROOM2")));
        assert_all_rooms_consistent(&state);
    }

    #[test]
    fn test_sync_routes() {
        // テスト項目: sync_request はホストへ、sync_response はホストからのみ配信される
        // given (前提条件):
        let mut state = RelayState::new();
        let a = state.register(now());
        let b = state.register(now());
        let lonely = state.register(now());
        state.create_room(a, room_id("ABC1234"), client("alice"), now());
        state.join_room(b, room_id("ABC1234"), client("bob"), now());

        // when (操作):
        let route = state.sync_request_route(b);
        let from_host = state.sync_broadcast_targets(a);
        let from_participant = state.sync_broadcast_targets(b);
        let not_in_room = state.fanout_targets(lonely);

        // then (期待する結果):
        assert_eq!(
            route,
            Ok(SyncRoute {
                host: a,
                from: ClientId::new("bob".to_string()).unwrap(),
            })
        );
        assert_eq!(from_host, Ok(vec![b]));
        assert_eq!(from_participant, Err(RelayError::UnauthorizedHostAction));
        assert_eq!(not_in_room, Err(RelayError::NotInRoom));
    }

    #[test]
    fn test_single_host_invariant_over_mixed_sequence() {
        // テスト項目: create / join / leave / 再接続を混ぜても、空でないルームのホストは常に 1 人
        // given (前提条件):
        let mut state = RelayState::new();
        let names = ["alice", "bob", "charlie", "dave", "erin"];
        let rooms = ["ROOM1", "ROOM2"];
        let mut live: Vec<ConnectionId> = Vec::new();

        // when (操作):
        for step in 0..200usize {
            let name = names[step * 7 % names.len()];
            let target = room_id(rooms[step * 3 % rooms.len()]);
            match step % 5 {
                0 | 1 => {
                    let connection = state.register(now());
                    live.push(connection);
                    let transition = state.join_room(connection, target.clone(), client(name), now());
                    if transition.result == Err(RelayError::RoomNotFound) {
                        state.create_room(connection, target, client(name), now());
                    }
                }
                2 => {
                    if let Some(connection) = live.get(step % live.len().max(1)).copied() {
                        state.leave_current_room(connection);
                    }
                }
                3 => {
                    if !live.is_empty() {
                        let connection = live.remove(step % live.len());
                        state.release(connection);
                    }
                }
                _ => {
                    if let Some(connection) = live.first().copied() {
                        state.join_room(connection, target, None, now());
                    }
                }
            }

            // then (期待する結果):
            assert_all_rooms_consistent(&state);
        }
    }
}
