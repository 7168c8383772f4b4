//! Session Deduplicator
//!
//! ページ遷移や拡張機能の再読み込みで、古い接続が開いたまま同じクライアント ID の
//! 新しい接続が参加してくることがある。新しい接続をルームに追加する直前に、
//! 古い接続をルームと Registry から取り除く。

use super::{
    entity::Room,
    registry::ConnectionRegistry,
    value_object::{ClientId, ConnectionId},
};

/// 追い出した古い接続
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eviction {
    pub connection: ConnectionId,
    pub was_host: bool,
}

/// 同じクライアント ID を持つ古い接続をルームから追い出す
///
/// 古い接続は `Evicted` としてマークされるので、後でその接続の切断処理が走っても
/// 退出処理は二重に行われない。トランスポートのクローズは呼び出し側が行う。
/// ホストを追い出した場合、ルームは一時的にホスト不在になるため、呼び出し側は
/// 同じロックの中で新しい接続をホストとして追加すること。
pub fn evict_stale(
    room: &mut Room,
    registry: &mut ConnectionRegistry,
    client_id: &ClientId,
    incoming: ConnectionId,
) -> Option<Eviction> {
    let stale = room.find_stale(client_id, incoming)?;
    let participant = room.detach(stale)?;
    registry.mark_evicted(stale);
    tracing::info!(
        "Evicted stale connection {} of client '{}' from room {} (host: {})",
        stale,
        client_id,
        room.id,
        participant.is_host
    );
    Some(Eviction {
        connection: stale,
        was_host: participant.is_host,
    })
}
