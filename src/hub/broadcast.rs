//! Broadcast hub implementation
//!
//! Single entry point for new versions. `publish` first wakes long-poll
//! waiters, then pushes to both transport registries. The snapshot must
//! already be in the store when `publish` runs, so a snapshot read racing
//! the publish sees the same version the push subscribers get.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::registry::{
    BroadcastReport, PushSink, RegistryError, SubscriberId, SubscriberRegistry, Transport,
    UpdateFrame,
};
use crate::state::{MatchId, ScoreCard, StateStore, VersionedUpdate};
use crate::stats::{HubStats, HubStatsSnapshot};
use crate::waiter::{LongPollResponse, ResolveReport, WaiterManager};

use super::config::HubConfig;
use super::queue::{self, PublishQueue};

/// What one publish reached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Long-poll waiters
    pub waiters: ResolveReport,
    /// Server-sent event connections
    pub event_streams: BroadcastReport,
    /// WebSocket connections
    pub sockets: BroadcastReport,
}

/// Fans versioned updates out to long-poll waiters and push subscribers
///
/// Construct once and share behind an `Arc`.
pub struct BroadcastHub {
    /// Latest snapshot per match
    store: Arc<StateStore>,

    /// Outstanding long-polls
    waiters: WaiterManager,

    /// Server-sent event connections
    event_streams: SubscriberRegistry,

    /// WebSocket connections
    sockets: SubscriberRegistry,

    /// Counters
    stats: HubStats,

    /// Configuration
    config: HubConfig,
}

impl BroadcastHub {
    /// Create a hub with default configuration
    pub fn new() -> Self {
        Self::with_config(HubConfig::default())
    }

    /// Create a hub with its own store
    pub fn with_config(config: HubConfig) -> Self {
        Self::with_store(Arc::new(StateStore::new()), config)
    }

    /// Create a hub over an existing store
    pub fn with_store(store: Arc<StateStore>, config: HubConfig) -> Self {
        let waiters = WaiterManager::with_policy(Arc::clone(&store), config.unsatisfied_waiters);
        let event_streams = SubscriberRegistry::with_config(
            Transport::EventStream,
            Arc::clone(&store),
            config.registry.clone(),
        );
        let sockets = SubscriberRegistry::with_config(
            Transport::Socket,
            Arc::clone(&store),
            config.registry.clone(),
        );

        Self {
            store,
            waiters,
            event_streams,
            sockets,
            stats: HubStats::new(),
            config,
        }
    }

    /// Get the hub configuration
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Get the snapshot store
    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Get the long-poll waiter manager
    pub fn waiters(&self) -> &WaiterManager {
        &self.waiters
    }

    /// Get the registry for a push transport
    pub fn registry(&self, transport: Transport) -> &SubscriberRegistry {
        match transport {
            Transport::EventStream => &self.event_streams,
            Transport::Socket => &self.sockets,
        }
    }

    /// Current snapshot of a match; never blocks
    pub fn snapshot(&self, match_id: &MatchId) -> Arc<VersionedUpdate> {
        self.stats.record_snapshot_read();
        self.store.get_or_init(match_id)
    }

    /// Long-poll with the configured deadline
    pub async fn long_poll(&self, match_id: &MatchId, since_version: u64) -> LongPollResponse {
        self.long_poll_with_timeout(match_id, since_version, self.config.long_poll_timeout)
            .await
    }

    /// Long-poll with an explicit deadline
    pub async fn long_poll_with_timeout(
        &self,
        match_id: &MatchId,
        since_version: u64,
        timeout: Duration,
    ) -> LongPollResponse {
        let response = self.waiters.register(match_id, since_version, timeout).await;
        self.stats.record_long_poll(response.resolution);
        response
    }

    /// Register a push connection; it receives the current snapshot first
    pub fn subscribe<S: PushSink>(
        &self,
        transport: Transport,
        match_id: &MatchId,
        sink: S,
    ) -> Result<SubscriberId, RegistryError> {
        self.registry(transport).add(match_id, sink)
    }

    /// Remove a push connection
    pub fn unsubscribe(&self, transport: Transport, match_id: &MatchId, id: SubscriberId) -> bool {
        self.registry(transport).remove(match_id, id)
    }

    /// Disconnect every push subscriber of both transports
    ///
    /// Returns how many were closed. Their streams end once the frames
    /// already queued for them are drained.
    pub fn close_all(&self) -> usize {
        let closed = self.event_streams.close_all() + self.sockets.close_all();
        tracing::info!(closed = closed, "Push subscribers closed");
        closed
    }

    /// Deliver a stored update to everyone watching its match
    ///
    /// Never fails: delivery problems stay with the subscriber they hit.
    pub fn publish(&self, update: &Arc<VersionedUpdate>) -> PublishReport {
        let match_id = &update.match_id;

        let mut report = PublishReport {
            waiters: self.waiters.resolve_all(match_id, update),
            ..Default::default()
        };

        match UpdateFrame::encode(update) {
            Ok(frame) => {
                report.event_streams = self.event_streams.broadcast(match_id, &frame);
                report.sockets = self.sockets.broadcast(match_id, &frame);
            }
            Err(e) => {
                tracing::error!(
                    match_id = %match_id,
                    version = update.version,
                    error = %e,
                    "Failed to encode update, push delivery skipped"
                );
            }
        }

        self.stats
            .record_publish(&report.waiters, &[report.event_streams, report.sockets]);

        tracing::debug!(
            match_id = %match_id,
            version = update.version,
            waiters = report.waiters.resolved,
            sse = report.event_streams.delivered,
            websocket = report.sockets.delivered,
            "Update published"
        );

        report
    }

    /// Store the next version of a match and publish it
    pub fn commit<F>(&self, match_id: &MatchId, f: F) -> Arc<VersionedUpdate>
    where
        F: FnOnce(&VersionedUpdate) -> ScoreCard,
    {
        let update = self.store.replace_with(match_id, f);
        self.publish(&update);
        update
    }

    /// Spawn the dispatcher task that publishes queued updates
    ///
    /// Returns the queue's sending side and the task handle. The task ends
    /// once every `PublishQueue` clone is dropped.
    pub fn spawn_dispatcher(self: &Arc<Self>) -> (PublishQueue, JoinHandle<()>) {
        queue::spawn_dispatcher(Arc::clone(self), self.config.publish_queue_capacity)
    }

    /// Current counters and gauges
    pub fn stats(&self) -> HubStatsSnapshot {
        self.stats.snapshot(
            self.waiters.total_pending(),
            self.event_streams.total_subscribers() + self.sockets.total_subscribers(),
        )
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}
