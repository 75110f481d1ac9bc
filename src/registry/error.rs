//! Registry error types
//!
//! Push failures stay local to the subscriber they happened on; these types
//! never reach the publisher.

/// Failure to hand a frame to one subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushError {
    /// Connection is gone; the subscriber will never accept another frame
    Closed,
    /// Subscriber's outbound buffer is full; this frame is skipped
    Full,
}

impl std::fmt::Display for PushError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PushError::Closed => write!(f, "Subscriber closed"),
            PushError::Full => write!(f, "Subscriber buffer full"),
        }
    }
}

impl std::error::Error for PushError {}

/// Error type for registry operations
#[derive(Debug)]
pub enum RegistryError {
    /// The catch-up frame could not be delivered, so the subscriber was not added
    CatchUpFailed(PushError),
    /// The current snapshot could not be encoded
    Encode(serde_json::Error),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::CatchUpFailed(e) => write!(f, "Catch-up delivery failed: {}", e),
            RegistryError::Encode(e) => write!(f, "Failed to encode snapshot: {}", e),
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<serde_json::Error> for RegistryError {
    fn from(e: serde_json::Error) -> Self {
        RegistryError::Encode(e)
    }
}
