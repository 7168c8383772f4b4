//! Domain layer
//!
//! - Value Objects: `ConnectionId`, `ClientId`, `RoomId`, `Timestamp`
//! - Entities: `Room`, `Participant`
//! - Connection Registry / Room Store / Session Deduplicator
//! - `RelayState`: メンバーシップ遷移をまとめた集約
//! - Traits: `RelayRepository`, `MessagePusher`

pub mod dedup;
pub mod entity;
pub mod error;
pub mod message_pusher;
pub mod registry;
pub mod relay;
pub mod repository;
pub mod room_store;
pub mod value_object;

pub use dedup::{Eviction, evict_stale};
pub use entity::{Departure, Participant, Room};
pub use error::RelayError;
pub use message_pusher::{MessagePushError, MessagePusher, PusherChannel};
#[cfg(test)]
pub use message_pusher::MockMessagePusher;
pub use registry::{ConnectionRecord, ConnectionRegistry, ConnectionState};
pub use relay::{CreateOutcome, JoinOutcome, LeaveOutcome, RelayState, SyncRoute, Transition};
pub use repository::RelayRepository;
pub use room_store::RoomStore;
pub use value_object::{
    ClientId, ClientIdFactory, ConnectionId, RoomId, Timestamp, ValueObjectError,
};
