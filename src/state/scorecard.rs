//! Cricket score payload
//!
//! The broadcast machinery treats this as opaque; only the simulator
//! looks inside it.

use serde::{Deserialize, Serialize};

/// Batting side's score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    /// Batting team code
    pub batting: String,
    /// Total runs
    pub runs: u32,
    /// Wickets fallen (0..=10)
    pub wickets: u32,
    /// Overs in cricket notation (`4.3` = four overs and three balls)
    pub overs: f64,
    /// Legal deliveries in the current over
    pub balls_delivered: u32,
}

impl Default for Score {
    fn default() -> Self {
        Self {
            batting: "IND".into(),
            runs: 0,
            wickets: 0,
            overs: 0.0,
            balls_delivered: 0,
        }
    }
}

impl Score {
    /// Whether the innings is finished
    pub fn all_out(&self) -> bool {
        self.wickets >= 10
    }
}

/// Payload carried by every `VersionedUpdate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    /// Current score
    pub score: Score,
    /// Human-readable line describing the last delivery
    pub commentary: String,
}

impl Default for ScoreCard {
    fn default() -> Self {
        Self {
            score: Score::default(),
            commentary: "Match started".into(),
        }
    }
}
