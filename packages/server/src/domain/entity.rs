//! Entities
//!
//! ルーム (`Room`) と参加者 (`Participant`) のエンティティ。
//!
//! ## 不変条件
//!
//! - 参加者が 1 人以上いるルームには、ホストがちょうど 1 人存在する
//! - 同じ接続がルームに二重に登録されることはない
//!
//! ホストの交代は `remove_participant` の中で参加者の削除と同時に行われるため、
//! 空でないルームにホストがいない状態は外部から観測できない。

use super::value_object::{ClientId, ConnectionId, RoomId, Timestamp};

/// ルームの参加者
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// 参加している接続
    pub connection: ConnectionId,
    /// 接続が名乗ったクライアント ID
    pub client_id: ClientId,
    /// ホストかどうか
    pub is_host: bool,
    /// 参加時刻
    pub joined_at: Timestamp,
}

impl Participant {
    pub fn new(
        connection: ConnectionId,
        client_id: ClientId,
        is_host: bool,
        joined_at: Timestamp,
    ) -> Self {
        Self {
            connection,
            client_id,
            is_host,
            joined_at,
        }
    }
}

/// 参加者がルームを離れた結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    /// 離脱した参加者
    pub participant: Participant,
    /// 離脱によって昇格した新ホスト
    pub new_host: Option<ConnectionId>,
}

/// 同期セッション（ルーム）
///
/// 参加者は参加順に保持し、ホスト離脱時の後継はその先頭から選ぶ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    participants: Vec<Participant>,
    host: Option<ConnectionId>,
    pub created_at: Timestamp,
}

impl Room {
    /// 作成者をホストとしてルームを作成
    pub fn new(
        id: RoomId,
        host_connection: ConnectionId,
        host_client_id: ClientId,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            participants: vec![Participant::new(
                host_connection,
                host_client_id,
                true,
                created_at,
            )],
            host: Some(host_connection),
            created_at,
        }
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn contains(&self, connection: ConnectionId) -> bool {
        self.participants
            .iter()
            .any(|p| p.connection == connection)
    }

    pub fn participant(&self, connection: ConnectionId) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.connection == connection)
    }

    pub fn host_connection(&self) -> Option<ConnectionId> {
        self.host
    }

    pub fn host(&self) -> Option<&Participant> {
        self.host.and_then(|connection| self.participant(connection))
    }

    pub fn is_host(&self, connection: ConnectionId) -> bool {
        self.host == Some(connection)
    }

    /// 全参加者の接続
    pub fn connections(&self) -> Vec<ConnectionId> {
        self.participants.iter().map(|p| p.connection).collect()
    }

    /// 指定した接続以外の参加者の接続（ファンアウト先）
    pub fn other_connections(&self, exclude: ConnectionId) -> Vec<ConnectionId> {
        self.participants
            .iter()
            .map(|p| p.connection)
            .filter(|connection| *connection != exclude)
            .collect()
    }

    /// 同じクライアント ID を持つ別の接続を探す
    pub fn find_stale(&self, client_id: &ClientId, incoming: ConnectionId) -> Option<ConnectionId> {
        self.participants
            .iter()
            .find(|p| &p.client_id == client_id && p.connection != incoming)
            .map(|p| p.connection)
    }

    /// 参加者を追加
    ///
    /// `is_host` が立っている場合は既存のホストを降格させ、この参加者をホストにする。
    /// ホスト不在のルームに追加された参加者は常にホストになる。
    /// すでに参加している接続の場合は何もせず `false` を返す。
    pub fn add_participant(&mut self, mut participant: Participant) -> bool {
        if self.contains(participant.connection) {
            return false;
        }
        if self.host.is_none() {
            participant.is_host = true;
        }
        if participant.is_host {
            for existing in &mut self.participants {
                existing.is_host = false;
            }
            self.host = Some(participant.connection);
        }
        self.participants.push(participant);
        true
    }

    /// 参加者を削除し、ホストだった場合は残りの先頭を昇格させる
    pub fn remove_participant(&mut self, connection: ConnectionId) -> Option<Departure> {
        let participant = self.detach(connection)?;
        let new_host = if participant.is_host {
            self.promote_next_host()
        } else {
            None
        };
        Some(Departure {
            participant,
            new_host,
        })
    }

    /// 参加者を昇格なしで取り外す
    ///
    /// 重複排除で使う。呼び出し側は同じクリティカルセクション内で
    /// 後継の参加者を追加しなければならない。
    pub(crate) fn detach(&mut self, connection: ConnectionId) -> Option<Participant> {
        let index = self
            .participants
            .iter()
            .position(|p| p.connection == connection)?;
        let participant = self.participants.remove(index);
        if self.host == Some(connection) {
            self.host = None;
        }
        Some(participant)
    }

    fn promote_next_host(&mut self) -> Option<ConnectionId> {
        let next = self.participants.first_mut()?;
        next.is_host = true;
        self.host = Some(next.connection);
        self.host
    }

    /// ホストがちょうど 1 人であること（空のルームはホスト 0 人）
    pub fn has_consistent_host(&self) -> bool {
        let marked: Vec<ConnectionId> = self
            .participants
            .iter()
            .filter(|p| p.is_host)
            .map(|p| p.connection)
            .collect();
        if self.participants.is_empty() {
            return marked.is_empty() && self.host.is_none();
        }
        marked.len() == 1 && self.host == Some(marked[0])
    }
}
