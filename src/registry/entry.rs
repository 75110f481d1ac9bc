//! Subscriber entry
//!
//! Per-connection state stored in the registry.

use super::error::PushError;
use super::frame::UpdateFrame;
use super::sink::PushSink;

/// Registry-unique subscriber id
pub type SubscriberId = u64;

/// Result of offering one frame to one subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Delivery {
    /// Frame handed to the connection
    Sent,
    /// Subscriber already has this version (from its catch-up)
    AlreadyHas,
    /// Buffer full; frame skipped for this subscriber
    Lagged,
    /// Subscriber must be removed
    Evict(PushError),
}

/// Entry for a single push connection
pub struct SubscriberEntry {
    /// Subscriber id
    pub id: SubscriberId,

    /// Send capability
    sink: Box<dyn PushSink>,

    /// Highest version handed to this subscriber
    pub delivered_version: u64,

    /// Frames skipped in a row because the buffer was full
    pub consecutive_lags: u32,
}

impl SubscriberEntry {
    pub(super) fn new(id: SubscriberId, sink: Box<dyn PushSink>, delivered_version: u64) -> Self {
        Self {
            id,
            sink,
            delivered_version,
            consecutive_lags: 0,
        }
    }

    /// Offer a frame, updating the watermark and lag counter
    pub(super) fn deliver(&mut self, frame: &UpdateFrame, max_lags: u32) -> Delivery {
        if frame.version <= self.delivered_version {
            return Delivery::AlreadyHas;
        }

        match self.sink.push(frame) {
            Ok(()) => {
                self.delivered_version = frame.version;
                self.consecutive_lags = 0;
                Delivery::Sent
            }
            Err(PushError::Full) => {
                self.consecutive_lags += 1;
                if self.consecutive_lags >= max_lags {
                    Delivery::Evict(PushError::Full)
                } else {
                    Delivery::Lagged
                }
            }
            Err(PushError::Closed) => Delivery::Evict(PushError::Closed),
        }
    }
}

impl std::fmt::Debug for SubscriberEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberEntry")
            .field("id", &self.id)
            .field("delivered_version", &self.delivered_version)
            .field("consecutive_lags", &self.consecutive_lags)
            .finish()
    }
}
