//! Error types
//!
//! The broadcast core has no failure paths of its own; these errors come
//! from the outer surface (binding the HTTP listener, encoding payloads)
//! and from talking to a dispatcher that has already shut down.

use std::fmt;

/// Result type alias for scorecast operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(std::io::Error),
    /// HTTP listener could not be bound
    Bind(warp::Error),
    /// Payload could not be encoded
    Json(serde_json::Error),
    /// The publish queue's dispatcher task is gone
    QueueClosed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Bind(e) => write!(f, "Failed to bind listener: {}", e),
            Error::Json(e) => write!(f, "JSON encoding error: {}", e),
            Error::QueueClosed => write!(f, "Publish queue closed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Bind(e) => Some(e),
            Error::Json(e) => Some(e),
            Error::QueueClosed => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<warp::Error> for Error {
    fn from(e: warp::Error) -> Self {
        Error::Bind(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}
