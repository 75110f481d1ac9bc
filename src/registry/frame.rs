//! Push frames
//!
//! An update is serialized once per publish into an `UpdateFrame`; every
//! push subscriber then gets a clone that shares the same `Bytes` buffer.

use bytes::Bytes;

use crate::state::{MatchId, VersionedUpdate};

/// Which push transport a registry serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    /// Server-sent events
    EventStream,
    /// Bidirectional WebSocket
    Socket,
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::EventStream => f.write_str("sse"),
            Transport::Socket => f.write_str("websocket"),
        }
    }
}

/// A versioned update encoded for push delivery
///
/// Cheap to clone: the JSON body is reference counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateFrame {
    /// Match the update belongs to
    pub match_id: MatchId,
    /// Version of the encoded update
    pub version: u64,
    /// JSON body
    pub data: Bytes,
}

impl UpdateFrame {
    /// Encode an update as JSON
    pub fn encode(update: &VersionedUpdate) -> Result<Self, serde_json::Error> {
        let data = serde_json::to_vec(update)?;
        Ok(Self {
            match_id: update.match_id.clone(),
            version: update.version,
            data: Bytes::from(data),
        })
    }

    /// JSON body as text
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}
