//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use tokio::{
    sync::{mpsc, watch},
    task::JoinError,
};

use crate::{domain::ConnectionId, ui::state::AppState};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Spawns a task that forwards queued messages to the WebSocket sink.
///
/// When every sender of `rx` has been dropped (eviction, shutdown, or
/// disconnect cleanup) the task sends a close frame and ends.
///
/// # Returns
///
/// A `JoinHandle` for the spawned task
fn pusher_loop(
    connection: ConnectionId,
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = sender.send(Message::Text(msg.into())).await {
                tracing::debug!("Write to {} failed: {}", connection, e);
                return;
            }
        }
        tracing::debug!("Outbound channel of {} closed, sending close frame", connection);
        let _ = sender.send(Message::Close(None)).await;
    })
}

/// Logs how a connection task ended.
///
/// A panic may have left the relay state half-updated, so it also raises the
/// fault flag and the server begins a graceful shutdown.
fn report_task_end(
    connection: ConnectionId,
    task: &str,
    result: Result<(), JoinError>,
    fault_tx: &watch::Sender<bool>,
) {
    match result {
        Ok(()) => tracing::debug!("{} task of {} finished", task, connection),
        Err(e) if e.is_panic() => {
            tracing::error!("{} task of {} panicked: {}", task, connection, e);
            fault_tx.send_replace(true);
        }
        Err(_) => {}
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sender, mut receiver) = socket.split();

    // Create a channel for this connection to receive messages
    let (tx, rx) = mpsc::unbounded_channel();
    let connection = state.connect_participant_usecase.execute(tx).await;

    let state_clone = state.clone();

    // Spawn a task to receive messages from this connection
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error on {}: {}", connection, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    tracing::debug!("Received from {}: {}", connection, text.as_str());
                    state_clone
                        .route_message_usecase
                        .execute(connection, text.as_str())
                        .await;
                }
                Message::Binary(bytes) => {
                    // Not part of the protocol; decoding fails and the sender gets an error reply
                    let text = String::from_utf8_lossy(&bytes);
                    state_clone
                        .route_message_usecase
                        .execute(connection, &text)
                        .await;
                }
                Message::Close(_) => {
                    tracing::info!("{} requested close", connection);
                    break;
                }
                // Ping/pong is handled automatically by the WebSocket protocol
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
    });

    // Spawn a task to push queued messages to this connection
    let mut send_task = pusher_loop(connection, rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        result = &mut recv_task => {
            send_task.abort();
            report_task_end(connection, "Receive", result, &state.fault_tx);
        }
        result = &mut send_task => {
            recv_task.abort();
            report_task_end(connection, "Send", result, &state.fault_tx);
        }
    };

    state
        .disconnect_participant_usecase
        .execute(connection)
        .await;
}
