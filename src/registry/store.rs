//! Subscriber registry implementation
//!
//! Per-match membership of live push connections for one transport.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::state::{MatchId, StateStore};

use super::config::RegistryConfig;
use super::entry::{Delivery, SubscriberEntry, SubscriberId};
use super::error::{PushError, RegistryError};
use super::frame::{Transport, UpdateFrame};
use super::sink::PushSink;

type MemberSet = Arc<Mutex<Vec<SubscriberEntry>>>;

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Subscribers the frame was handed to
    pub delivered: usize,
    /// Subscribers that already had this version from their catch-up
    pub already_current: usize,
    /// Subscribers that skipped the frame because their buffer was full
    pub lagged: usize,
    /// Subscribers removed (closed, or lagging too long)
    pub removed: usize,
}

/// Registry of push connections for one transport
///
/// Each match has its own member lock. Catch-up on `add` and every
/// `broadcast` run under that lock, so a subscriber sees versions in publish
/// order and never gets the same version twice.
pub struct SubscriberRegistry {
    /// Transport served by this registry
    transport: Transport,

    /// Source of catch-up snapshots
    store: Arc<StateStore>,

    /// Map of match id to its push connections
    members: RwLock<HashMap<MatchId, MemberSet>>,

    /// Next subscriber id
    next_id: AtomicU64,

    /// Configuration
    config: RegistryConfig,
}

impl SubscriberRegistry {
    /// Create a registry for `transport` with default configuration
    pub fn new(transport: Transport, store: Arc<StateStore>) -> Self {
        Self::with_config(transport, store, RegistryConfig::default())
    }

    /// Create a registry with custom configuration
    pub fn with_config(transport: Transport, store: Arc<StateStore>, config: RegistryConfig) -> Self {
        Self {
            transport,
            store,
            members: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    fn member_set(&self, match_id: &MatchId) -> MemberSet {
        if let Some(set) = self.members.read().get(match_id) {
            return Arc::clone(set);
        }

        let mut members = self.members.write();
        Arc::clone(members.entry(match_id.clone()).or_default())
    }

    /// Add a push connection and send it the current snapshot
    ///
    /// The catch-up frame is pushed before the subscriber becomes visible to
    /// `broadcast`. If the connection can't take it, the subscriber is not added.
    pub fn add<S: PushSink>(
        &self,
        match_id: &MatchId,
        sink: S,
    ) -> Result<SubscriberId, RegistryError> {
        let set = self.member_set(match_id);
        let mut members = set.lock();

        let current = self.store.get_or_init(match_id);
        let catch_up = UpdateFrame::encode(&current)?;
        sink.push(&catch_up).map_err(RegistryError::CatchUpFailed)?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        members.push(SubscriberEntry::new(id, Box::new(sink), current.version));

        tracing::info!(
            transport = %self.transport,
            match_id = %match_id,
            subscriber_id = id,
            version = current.version,
            subscribers = members.len(),
            "Subscriber added"
        );

        Ok(id)
    }

    /// Remove a push connection, returning whether it was registered
    pub fn remove(&self, match_id: &MatchId, id: SubscriberId) -> bool {
        let Some(set) = self.members.read().get(match_id).cloned() else {
            return false;
        };

        let mut members = set.lock();
        let before = members.len();
        members.retain(|m| m.id != id);
        let removed = members.len() != before;

        if removed {
            tracing::debug!(
                transport = %self.transport,
                match_id = %match_id,
                subscriber_id = id,
                subscribers = members.len(),
                "Subscriber removed"
            );
        }

        removed
    }

    /// Push a frame to every current member of the match
    ///
    /// A failing member never stops delivery to the others. Closed members
    /// are removed at once; members whose buffer stays full for
    /// `max_consecutive_lags` frames in a row are removed too.
    pub fn broadcast(&self, match_id: &MatchId, frame: &UpdateFrame) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        let Some(set) = self.members.read().get(match_id).cloned() else {
            return report;
        };

        let max_lags = self.config.max_consecutive_lags;
        let transport = self.transport;

        let mut members = set.lock();
        members.retain_mut(|member| match member.deliver(frame, max_lags) {
            Delivery::Sent => {
                report.delivered += 1;
                true
            }
            Delivery::AlreadyHas => {
                report.already_current += 1;
                true
            }
            Delivery::Lagged => {
                report.lagged += 1;
                tracing::debug!(
                    transport = %transport,
                    match_id = %match_id,
                    subscriber_id = member.id,
                    version = frame.version,
                    lags = member.consecutive_lags,
                    "Subscriber lagging, frame skipped"
                );
                true
            }
            Delivery::Evict(reason) => {
                report.removed += 1;
                match reason {
                    PushError::Closed => tracing::debug!(
                        transport = %transport,
                        match_id = %match_id,
                        subscriber_id = member.id,
                        "Subscriber closed, removing"
                    ),
                    PushError::Full => tracing::warn!(
                        transport = %transport,
                        match_id = %match_id,
                        subscriber_id = member.id,
                        lags = member.consecutive_lags,
                        "Subscriber too slow, removing"
                    ),
                }
                false
            }
        });

        report
    }

    /// Number of push connections for a match
    pub fn subscriber_count(&self, match_id: &MatchId) -> usize {
        self.members
            .read()
            .get(match_id)
            .map(|set| set.lock().len())
            .unwrap_or(0)
    }

    /// Number of push connections across all matches
    pub fn total_subscribers(&self) -> usize {
        self.members.read().values().map(|set| set.lock().len()).sum()
    }

    /// Remove every member of every match, returning how many were removed
    ///
    /// Dropping a member drops its sink, so the connection's frame stream
    /// ends and the transport finishes the response.
    pub fn close_all(&self) -> usize {
        let sets: Vec<MemberSet> = self.members.write().drain().map(|(_, set)| set).collect();

        let mut closed = 0;
        for set in sets {
            let mut members = set.lock();
            closed += members.len();
            members.clear();
        }

        if closed > 0 {
            tracing::debug!(transport = %self.transport, closed = closed, "Subscribers closed");
        }

        closed
    }
}
