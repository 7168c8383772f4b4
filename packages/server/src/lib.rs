//! Syncroom relay server library.
//!
//! Rendezvous and relay for watch-together sessions: clients join a room by
//! code, one of them is the host, and playback events are fanned out to the
//! rest of the room over WebSocket.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
