//! axum server, WebSocket/HTTP handlers and shutdown signal.

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::Server;
pub use signal::shutdown_signal;
