//! Push subscriber registries
//!
//! A registry tracks, per match, the live push connections of one transport
//! (server-sent events or WebSocket) and fans published frames out to them.
//!
//! # Architecture
//!
//! ```text
//!                         SubscriberRegistry
//!                    ┌──────────────────────────┐
//!                    │ members: HashMap<Match,  │
//!                    │   Vec<SubscriberEntry {  │
//!                    │     sink,                │
//!                    │     delivered_version,   │
//!                    │   }>                     │
//!                    │ >                        │
//!                    └────────────┬─────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         ▼                       ▼                       ▼
//!     [sink.push]             [sink.push]             [sink.push]
//!         │                       │                       │
//!      mpsc ──► SSE writer     mpsc ──► WS writer      mpsc ──► ...
//! ```
//!
//! # Zero-Copy Design
//!
//! Each publish is encoded once into an `UpdateFrame`. Its body is a
//! `bytes::Bytes`, so every subscriber's copy shares one allocation.

pub mod config;
pub mod entry;
pub mod error;
pub mod frame;
pub mod sink;
pub mod store;

pub use config::RegistryConfig;
pub use entry::{SubscriberEntry, SubscriberId};
pub use error::{PushError, RegistryError};
pub use frame::{Transport, UpdateFrame};
pub use sink::PushSink;
pub use store::{BroadcastReport, SubscriberRegistry};
