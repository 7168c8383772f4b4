//! Server execution logic.

use std::{
    future::{Future, IntoFuture},
    sync::Arc,
    time::Duration,
};

use axum::{Router, routing::get};
use tokio::{net::TcpListener, sync::watch};
use tower_http::trace::TraceLayer;

use crate::usecase::{
    ConnectParticipantUseCase, DisconnectParticipantUseCase, GetRoomDetailUseCase,
    GetRoomsUseCase, RouteMessageUseCase, ShutdownUseCase,
};

use super::{
    handler::{get_room_detail, get_rooms, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Watch-together relay server
///
/// This struct encapsulates the server configuration and provides methods to run the server.
///
/// # Example
///
/// ```ignore
/// let server = Server::new(
///     connect_participant_usecase,
///     disconnect_participant_usecase,
///     route_message_usecase,
///     shutdown_usecase,
///     get_rooms_usecase,
///     get_room_detail_usecase,
///     Duration::from_secs(5),
/// );
/// server.run("0.0.0.0".to_string(), 3001).await?;
/// ```
pub struct Server {
    /// ConnectParticipantUseCase（接続受け入れのユースケース）
    connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    /// DisconnectParticipantUseCase（接続クローズのユースケース）
    disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    /// RouteMessageUseCase（受信メッセージ振り分けのユースケース）
    route_message_usecase: Arc<RouteMessageUseCase>,
    /// ShutdownUseCase（停止処理のユースケース）
    shutdown_usecase: Arc<ShutdownUseCase>,
    /// GetRoomsUseCase（ルーム一覧取得のユースケース）
    get_rooms_usecase: Arc<GetRoomsUseCase>,
    /// GetRoomDetailUseCase（ルーム詳細取得のユースケース）
    get_room_detail_usecase: Arc<GetRoomDetailUseCase>,
    /// Upper bound for graceful shutdown before forcing exit
    shutdown_timeout: Duration,
}

impl Server {
    /// Create a new Server instance
    pub fn new(
        connect_participant_usecase: Arc<ConnectParticipantUseCase>,
        disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
        route_message_usecase: Arc<RouteMessageUseCase>,
        shutdown_usecase: Arc<ShutdownUseCase>,
        get_rooms_usecase: Arc<GetRoomsUseCase>,
        get_room_detail_usecase: Arc<GetRoomDetailUseCase>,
        shutdown_timeout: Duration,
    ) -> Self {
        Self {
            connect_participant_usecase,
            disconnect_participant_usecase,
            route_message_usecase,
            shutdown_usecase,
            get_rooms_usecase,
            get_room_detail_usecase,
            shutdown_timeout,
        }
    }

    fn router(&self, fault_tx: watch::Sender<bool>) -> Router {
        let app_state = Arc::new(AppState {
            connect_participant_usecase: self.connect_participant_usecase.clone(),
            disconnect_participant_usecase: self.disconnect_participant_usecase.clone(),
            route_message_usecase: self.route_message_usecase.clone(),
            get_rooms_usecase: self.get_rooms_usecase.clone(),
            get_room_detail_usecase: self.get_room_detail_usecase.clone(),
            fault_tx,
        });

        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/", get(health_check))
            .route("/health", get(health_check))
            .route("/api/rooms", get(get_rooms))
            .route("/api/rooms/{room_id}", get(get_room_detail))
            .layer(TraceLayer::new_for_http())
            .with_state(app_state)
    }

    /// Run the relay server until Ctrl+C or SIGTERM
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "0.0.0.0")
    /// * `port` - The port number to bind to (e.g., 3001)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(
        self,
        host: String,
        port: u16,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // Bind the server to the host and port
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Relay server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `signal` resolves
    ///
    /// A panicking connection task also starts the shutdown. On shutdown every
    /// open connection receives `server_shutdown` and its transport is closed.
    /// If the server has not finished within `shutdown_timeout` after that,
    /// it gives up and returns.
    pub async fn serve<F>(
        self,
        listener: TcpListener,
        signal: F,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (fault_tx, mut fault_rx) = watch::channel(false);
        let app = self.router(fault_tx);
        let shutdown_usecase = self.shutdown_usecase.clone();
        let (triggered_tx, mut triggered_rx) = watch::channel(false);

        let fault = async move {
            let faulted = fault_rx.wait_for(|faulted| *faulted).await.is_ok();
            if !faulted {
                std::future::pending::<()>().await;
            }
        };

        // Notify and close every connection, then let axum stop accepting
        let graceful = async move {
            tokio::select! {
                _ = signal => {}
                _ = fault => {
                    tracing::error!("A connection task panicked, shutting down");
                }
            }
            let notified = shutdown_usecase.execute().await;
            tracing::info!("Shutdown started, {} connection(s) notified", notified);
            let _ = triggered_tx.send(true);
        };

        let timeout = self.shutdown_timeout;
        let deadline = async move {
            let triggered = triggered_rx.wait_for(|triggered| *triggered).await.is_ok();
            if !triggered {
                // The server ended before any shutdown signal
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(timeout).await;
        };

        let server = axum::serve(listener, app)
            .with_graceful_shutdown(graceful)
            .into_future();

        tokio::select! {
            result = server => result?,
            _ = deadline => {
                tracing::warn!(
                    "Graceful shutdown did not finish within {:?}, forcing exit",
                    timeout
                );
                return Ok(());
            }
        }

        // Connection tasks may still be running their cleanup
        if tokio::time::timeout(timeout, self.shutdown_usecase.wait_until_drained())
            .await
            .is_err()
        {
            tracing::warn!(
                "Connections did not close within {:?}, forcing exit",
                timeout
            );
        }

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
