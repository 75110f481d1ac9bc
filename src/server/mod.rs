//! HTTP surface
//!
//! Serves the hub over warp: snapshot and long-poll reads, SSE and
//! WebSocket push, simulator start and stats.

pub mod config;
pub mod listener;
pub mod push;
pub mod query;
pub mod routes;

pub use config::{ServerConfig, DEFAULT_PORT};
pub use listener::ScoreServer;
pub use routes::AppState;
