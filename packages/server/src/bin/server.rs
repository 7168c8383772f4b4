//! Syncroom relay server.
//!
//! Clients create or join a room by code over WebSocket; the host's playback
//! state is relayed to every other member of the room.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin syncroom-server
//! cargo run --bin syncroom-server -- --host 127.0.0.1 --port 3001
//! PORT=4000 LOG_LEVEL=debug cargo run --bin syncroom-server
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use syncroom_server::{
    domain::RelayState,
    infrastructure::{message_pusher::WebSocketMessagePusher, repository::InMemoryRelayRepository},
    ui::Server,
    usecase::{
        ConnectParticipantUseCase, DisconnectParticipantUseCase, GetRoomDetailUseCase,
        GetRoomsUseCase, MembershipUseCase, Notifier, RouteMessageUseCase, ShutdownUseCase,
    },
};
use syncroom_shared::{logger::setup_logger, time::SystemClock};
use tokio::sync::Mutex;

#[derive(Parser, Debug)]
#[command(name = "syncroom-server")]
#[command(about = "Watch-together relay server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PORT", default_value = "3001")]
    port: u16,

    /// Seconds to wait for connections to close on shutdown before forcing exit
    #[arg(long, env = "SHUTDOWN_TIMEOUT_SECS", default_value = "5")]
    shutdown_timeout_secs: u64,

    /// Default log level when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    // Initialize dependencies in order:
    // 1. Repository
    // 2. MessagePusher
    // 3. UseCases
    // 4. Server

    // 1. Create Repository (in-memory relay state)
    let repository = Arc::new(InMemoryRelayRepository::new(Arc::new(Mutex::new(
        RelayState::new(),
    ))));

    // 2. Create MessagePusher (WebSocket implementation)
    let message_pusher = Arc::new(WebSocketMessagePusher::default());
    let notifier = Notifier::new(message_pusher.clone());
    let clock = Arc::new(SystemClock);

    // 3. Create UseCases
    let connect_participant_usecase = Arc::new(ConnectParticipantUseCase::new(
        repository.clone(),
        message_pusher.clone(),
        clock.clone(),
    ));
    let disconnect_participant_usecase = Arc::new(DisconnectParticipantUseCase::new(
        repository.clone(),
        notifier.clone(),
    ));
    let membership_usecase = Arc::new(MembershipUseCase::new(
        repository.clone(),
        notifier.clone(),
        clock,
    ));
    let route_message_usecase = Arc::new(RouteMessageUseCase::new(
        repository.clone(),
        membership_usecase,
        notifier.clone(),
    ));
    let shutdown_usecase = Arc::new(ShutdownUseCase::new(repository.clone(), notifier));
    let get_rooms_usecase = Arc::new(GetRoomsUseCase::new(repository.clone()));
    let get_room_detail_usecase = Arc::new(GetRoomDetailUseCase::new(repository));

    // 4. Create and run the server
    let server = Server::new(
        connect_participant_usecase,
        disconnect_participant_usecase,
        route_message_usecase,
        shutdown_usecase,
        get_rooms_usecase,
        get_room_detail_usecase,
        Duration::from_secs(args.shutdown_timeout_secs),
    );
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_definition_is_valid() {
        // テスト項目: clap の引数定義に矛盾がない
        // given (前提条件):
        use clap::CommandFactory;

        // when (操作):
        let command = Args::command();

        // then (期待する結果):
        command.debug_assert();
    }

    #[test]
    fn test_args_flags_override() {
        // テスト項目: コマンドライン引数が既定値・環境変数より優先される
        // given (前提条件):
        let argv = [
            "syncroom-server",
            "--host",
            "127.0.0.1",
            "--port",
            "4000",
            "--shutdown-timeout-secs",
            "10",
            "--log-level",
            "debug",
        ];

        // when (操作):
        let args = Args::try_parse_from(argv).unwrap();

        // then (期待する結果):
        assert_eq!(args.host, "127.0.0.1");
        assert_eq!(args.port, 4000);
        assert_eq!(args.shutdown_timeout_secs, 10);
        assert_eq!(args.log_level, "debug");
    }

    #[test]
    fn test_args_short_flags() {
        // テスト項目: -H / -p の短いフラグが使える
        // given (前提条件):
        let argv = ["syncroom-server", "-H", "localhost", "-p", "8080"];

        // when (操作):
        let args = Args::try_parse_from(argv).unwrap();

        // then (期待する結果):
        assert_eq!(args.host, "localhost");
        assert_eq!(args.port, 8080);
    }

    #[test]
    fn test_args_rejects_invalid_port() {
        // テスト項目: 数値でないポートはエラーになる
        // given (前提条件):
        let argv = ["syncroom-server", "--port", "not-a-port"];

        // when (操作):
        let result = Args::try_parse_from(argv);

        // then (期待する結果):
        assert!(result.is_err());
    }
}
