//! Versioned match state
//!
//! The store is the single owner of every match's latest snapshot. Other
//! components hold only a `MatchId` and read through the store.

pub mod scorecard;
pub mod store;
pub mod update;

pub use scorecard::{Score, ScoreCard};
pub use store::StateStore;
pub use update::{now_millis, MatchId, VersionedUpdate, DEFAULT_MATCH_ID};
