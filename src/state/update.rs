//! Match keys and versioned snapshots
//!
//! A `VersionedUpdate` is immutable once built. The store swaps whole
//! snapshots behind an `Arc`, so readers never observe a half-written one.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::scorecard::ScoreCard;

/// Match key used when a request doesn't name one
pub const DEFAULT_MATCH_ID: &str = "INDvAUS";

/// Identifier of one independent stream of versioned updates
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(String);

impl MatchId {
    /// Create a new match id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MatchId {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_ID)
    }
}

impl From<&str> for MatchId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for MatchId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for MatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable snapshot of a match at one version
///
/// Serializes as `{ matchId, version, timestamp, score, commentary }`; the
/// payload fields sit next to the version metadata on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedUpdate {
    /// Match this snapshot belongs to
    pub match_id: MatchId,
    /// Strictly increasing per match, starting at 1
    pub version: u64,
    /// Wall-clock time the snapshot was taken (epoch milliseconds)
    pub timestamp: u64,
    /// Domain data
    #[serde(flatten)]
    pub payload: ScoreCard,
}

impl VersionedUpdate {
    /// First snapshot of a match
    pub fn initial(match_id: MatchId) -> Self {
        Self {
            match_id,
            version: 1,
            timestamp: now_millis(),
            payload: ScoreCard::default(),
        }
    }

    /// Build the snapshot that follows this one
    pub fn next(&self, payload: ScoreCard) -> Self {
        Self {
            match_id: self.match_id.clone(),
            version: self.version + 1,
            timestamp: now_millis().max(self.timestamp),
            payload,
        }
    }
}

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
