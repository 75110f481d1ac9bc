//! Broadcast hub
//!
//! Composes the snapshot store, the long-poll waiter manager and the two
//! push registries behind one `publish` call.
//!
//! ```text
//!   update source ──► store.replace ──► hub.publish
//!                                          │
//!                        ┌─────────────────┼──────────────────┐
//!                        ▼                 ▼                  ▼
//!               waiters.resolve_all  sse.broadcast     websocket.broadcast
//! ```

pub mod broadcast;
pub mod config;
pub mod queue;

pub use broadcast::{BroadcastHub, PublishReport};
pub use config::{HubConfig, DEFAULT_LONG_POLL_TIMEOUT};
pub use queue::PublishQueue;
