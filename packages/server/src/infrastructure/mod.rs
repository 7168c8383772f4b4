//! Infrastructure layer
//!
//! - `repository`: データストアの実装（インメモリ）
//! - `message_pusher`: クライアントへの送信の実装（WebSocket）
//! - `dto`: ワイヤーフォーマット（WebSocket / HTTP）

pub mod dto;
pub mod message_pusher;
pub mod repository;
