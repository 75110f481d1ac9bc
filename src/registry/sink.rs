//! Push send capability
//!
//! Transports hand the registry something it can push frames into. The
//! registry never blocks on a subscriber: a sink either accepts the frame
//! now or reports why it can't.

use tokio::sync::mpsc;

use super::error::PushError;
use super::frame::UpdateFrame;

/// Opaque, non-blocking send capability of one push connection
pub trait PushSink: Send + Sync + 'static {
    /// Hand a frame to the connection
    fn push(&self, frame: &UpdateFrame) -> Result<(), PushError>;
}

impl PushSink for mpsc::Sender<UpdateFrame> {
    fn push(&self, frame: &UpdateFrame) -> Result<(), PushError> {
        self.try_send(frame.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => PushError::Full,
            mpsc::error::TrySendError::Closed(_) => PushError::Closed,
        })
    }
}
