//! # scorecast
//!
//! Live score fan-out. Each match has one current, versioned snapshot;
//! every new version is delivered to clients over four transports:
//!
//! - **Snapshot**: `GET /api/score` returns the current version immediately
//! - **Long-poll**: `GET /api/score/long?since=N` parks until a version newer
//!   than `N` exists or the deadline passes
//! - **Server-sent events**: `GET /api/score/sse` streams every update
//! - **WebSocket**: `GET /ws` streams every update and echoes text messages
//!
//! Push subscribers get the current snapshot on connect. Long-poll callers
//! never miss an update published between their read and their wait.
//!
//! ## Example
//!
//! ```no_run
//! use scorecast::{ScoreServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = ScoreServer::new(ServerConfig::default());
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! The hub can also be driven directly:
//!
//! ```
//! use scorecast::{BroadcastHub, MatchId, ScoreCard};
//!
//! let hub = BroadcastHub::new();
//! let id = MatchId::default();
//! assert_eq!(hub.snapshot(&id).version, 1);
//!
//! hub.commit(&id, |_| ScoreCard::default());
//! assert_eq!(hub.snapshot(&id).version, 2);
//! ```

pub mod error;
pub mod hub;
pub mod registry;
pub mod server;
pub mod simulator;
pub mod state;
pub mod stats;
pub mod waiter;

pub use error::{Error, Result};
pub use hub::{BroadcastHub, HubConfig, PublishQueue, PublishReport};
pub use registry::{PushError, PushSink, RegistryConfig, Transport, UpdateFrame};
pub use server::{ScoreServer, ServerConfig};
pub use simulator::{MatchSimulator, SimulatorConfig};
pub use state::{MatchId, Score, ScoreCard, StateStore, VersionedUpdate, DEFAULT_MATCH_ID};
pub use stats::HubStatsSnapshot;
pub use waiter::{LongPollResponse, Resolution, UnsatisfiedWaiterPolicy};
