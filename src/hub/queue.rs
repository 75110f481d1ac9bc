//! Publish queue
//!
//! Decouples update sources from fan-out. Sources store the new snapshot
//! themselves, then enqueue it; a single dispatcher task publishes updates
//! in the order they were enqueued, which keeps per-match delivery order.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::state::VersionedUpdate;

use super::broadcast::BroadcastHub;

/// Sending side of the dispatcher's queue
#[derive(Debug, Clone)]
pub struct PublishQueue {
    tx: mpsc::Sender<Arc<VersionedUpdate>>,
}

impl PublishQueue {
    /// Enqueue an already-stored update for fan-out
    ///
    /// Waits for room if the queue is full.
    pub async fn publish(&self, update: Arc<VersionedUpdate>) -> Result<()> {
        self.tx.send(update).await.map_err(|_| Error::QueueClosed)
    }

    /// Whether the dispatcher has stopped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub(super) fn spawn_dispatcher(
    hub: Arc<BroadcastHub>,
    capacity: usize,
) -> (PublishQueue, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<Arc<VersionedUpdate>>(capacity);

    let handle = tokio::spawn(async move {
        tracing::debug!(capacity = capacity, "Publish dispatcher started");
        while let Some(update) = rx.recv().await {
            hub.publish(&update);
        }
        tracing::debug!("Publish dispatcher stopped");
    });

    (PublishQueue { tx }, handle)
}
