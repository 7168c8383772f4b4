//! Utilities shared across Syncroom packages.

pub mod logger;
pub mod time;
