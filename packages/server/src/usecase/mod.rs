//! UseCase layer
//!
//! 接続の受け入れ・メンバーシップ・メッセージの振り分け・停止処理を扱う。

pub mod connect_participant;
pub mod disconnect_participant;
pub mod error;
pub mod get_rooms;
pub mod membership;
pub mod notifier;
pub mod route_message;
pub mod shutdown;

pub use connect_participant::ConnectParticipantUseCase;
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::GetRoomDetailError;
pub use get_rooms::{GetRoomDetailUseCase, GetRoomsUseCase};
pub use membership::MembershipUseCase;
pub use notifier::Notifier;
pub use route_message::RouteMessageUseCase;
pub use shutdown::ShutdownUseCase;
