//! Long-poll waiter manager
//!
//! Turns "wait for the next version of this match" into a time-bounded
//! future. Waiters for one match live in a per-match set; `resolve_all`
//! drains that set on publish, and each waiter's own deadline removes it
//! again if nothing newer arrives in time.
//!
//! `register` reads the store while holding the match's waiter lock, and the
//! hub only calls `resolve_all` after the new snapshot is stored. A publish
//! therefore either lands before the version check (fast path) or finds the
//! waiter in the set; it can never slip in between.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;

use crate::state::{MatchId, StateStore, VersionedUpdate};

use super::entry::{ResolutionClaim, Waiter, WaiterState};

/// What happens to waiters a publish did not satisfy
///
/// A publish only satisfies waiters whose `since_version` is below the new
/// version. Versions never go backwards for a match, so this only matters
/// for callers that claim to be ahead of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnsatisfiedWaiterPolicy {
    /// Keep them registered for a later publish
    #[default]
    Retain,
    /// Remove them; their callers are answered at their deadline
    Drop,
}

/// How a long-poll was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Store already had a newer version, no waiter was created
    Immediate,
    /// A publish delivered a newer version
    Update,
    /// Deadline elapsed; the current snapshot was returned
    Timeout,
}

/// Answer to a long-poll request
#[derive(Debug, Clone)]
pub struct LongPollResponse {
    /// Snapshot handed to the caller
    pub update: Arc<VersionedUpdate>,
    /// Which path produced it
    pub resolution: Resolution,
}

impl LongPollResponse {
    fn new(update: Arc<VersionedUpdate>, resolution: Resolution) -> Self {
        Self { update, resolution }
    }

    /// Whether the caller got something newer than `since_version`
    pub fn is_fresh(&self, since_version: u64) -> bool {
        self.update.version > since_version
    }
}

/// Outcome of one `resolve_all` pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// Waiters resolved with the published update
    pub resolved: usize,
    /// Unsatisfied waiters kept for a later publish
    pub retained: usize,
    /// Unsatisfied waiters removed
    pub dropped: usize,
}

type WaiterSet = Arc<Mutex<Vec<Waiter>>>;

/// Per-match sets of outstanding long-poll requests
pub struct WaiterManager {
    /// Source of the current snapshot for the fast path and for timeouts
    store: Arc<StateStore>,

    /// Map of match id to its waiters
    waiters: RwLock<HashMap<MatchId, WaiterSet>>,

    /// Next waiter id
    next_waiter_id: AtomicU64,

    /// Handling of waiters a publish didn't satisfy
    policy: UnsatisfiedWaiterPolicy,
}

impl WaiterManager {
    /// Create a manager reading snapshots from `store`
    pub fn new(store: Arc<StateStore>) -> Self {
        Self::with_policy(store, UnsatisfiedWaiterPolicy::default())
    }

    /// Create a manager with an explicit unsatisfied-waiter policy
    pub fn with_policy(store: Arc<StateStore>, policy: UnsatisfiedWaiterPolicy) -> Self {
        Self {
            store,
            waiters: RwLock::new(HashMap::new()),
            next_waiter_id: AtomicU64::new(1),
            policy,
        }
    }

    fn waiter_set(&self, match_id: &MatchId) -> WaiterSet {
        if let Some(set) = self.waiters.read().get(match_id) {
            return Arc::clone(set);
        }

        let mut waiters = self.waiters.write();
        Arc::clone(waiters.entry(match_id.clone()).or_default())
    }

    /// Wait until the match has a version newer than `since_version`
    ///
    /// Resolves immediately if the store is already ahead. Otherwise resolves
    /// with the first published update that is newer, or with the current
    /// snapshot once `timeout` elapses. Dropping the returned future removes
    /// the waiter.
    pub async fn register(
        &self,
        match_id: &MatchId,
        since_version: u64,
        timeout: Duration,
    ) -> LongPollResponse {
        let set = self.waiter_set(match_id);

        let (id, claim, mut rx) = {
            let mut waiters = set.lock();

            let current = self.store.get_or_init(match_id);
            if current.version > since_version {
                return LongPollResponse::new(current, Resolution::Immediate);
            }

            let id = self.next_waiter_id.fetch_add(1, Ordering::Relaxed);
            let (waiter, claim, rx) = Waiter::new(id, since_version);
            waiters.push(waiter);

            tracing::trace!(
                match_id = %match_id,
                waiter_id = id,
                since_version = since_version,
                pending = waiters.len(),
                "Waiter registered"
            );

            (id, claim, rx)
        };

        let _abandon = AbandonGuard {
            manager: self,
            match_id,
            id,
            claim: Arc::clone(&claim),
        };

        let deadline = Instant::now() + timeout;

        match tokio::time::timeout_at(deadline, &mut rx).await {
            Ok(Ok(update)) => return LongPollResponse::new(update, Resolution::Update),
            // Removed unresolved by a publish; still owed an answer at the deadline
            Ok(Err(_)) => tokio::time::sleep_until(deadline).await,
            Err(_) => {}
        }

        if claim.try_claim(WaiterState::ResolvedByTimeout) {
            self.remove(match_id, id);

            let current = self.store.get_or_init(match_id);
            tracing::debug!(
                match_id = %match_id,
                waiter_id = id,
                version = current.version,
                "Long-poll timed out, returning current snapshot"
            );
            return LongPollResponse::new(current, Resolution::Timeout);
        }

        // A publish claimed the waiter just as the deadline fired; its send
        // follows the claim immediately.
        match rx.await {
            Ok(update) => LongPollResponse::new(update, Resolution::Update),
            Err(_) => LongPollResponse::new(self.store.get_or_init(match_id), Resolution::Timeout),
        }
    }

    /// Resolve every waiter of the match that `update` is newer for
    ///
    /// The set is drained; unsatisfied waiters are kept or dropped according
    /// to the manager's policy.
    pub fn resolve_all(&self, match_id: &MatchId, update: &Arc<VersionedUpdate>) -> ResolveReport {
        let mut report = ResolveReport::default();

        let Some(set) = self.waiters.read().get(match_id).cloned() else {
            return report;
        };

        let mut waiters = set.lock();
        for waiter in std::mem::take(&mut *waiters) {
            if waiter.is_satisfied_by(update) {
                if waiter.resolve(Arc::clone(update)) {
                    report.resolved += 1;
                }
            } else if waiter.claim.is_pending() {
                match self.policy {
                    UnsatisfiedWaiterPolicy::Retain => {
                        waiters.push(waiter);
                        report.retained += 1;
                    }
                    UnsatisfiedWaiterPolicy::Drop => report.dropped += 1,
                }
            }
        }

        if report.dropped > 0 {
            tracing::warn!(
                match_id = %match_id,
                version = update.version,
                dropped = report.dropped,
                "Dropped waiters ahead of published version"
            );
        }

        report
    }

    /// Remove a waiter by id, returning whether it was still registered
    fn remove(&self, match_id: &MatchId, id: u64) -> bool {
        let Some(set) = self.waiters.read().get(match_id).cloned() else {
            return false;
        };

        let mut waiters = set.lock();
        let before = waiters.len();
        waiters.retain(|w| w.id != id);
        waiters.len() != before
    }

    /// Number of outstanding waiters for a match
    pub fn pending_count(&self, match_id: &MatchId) -> usize {
        self.waiters
            .read()
            .get(match_id)
            .map(|set| set.lock().len())
            .unwrap_or(0)
    }

    /// Number of outstanding waiters across all matches
    pub fn total_pending(&self) -> usize {
        self.waiters.read().values().map(|set| set.lock().len()).sum()
    }
}

/// Removes the waiter if its long-poll future is dropped while still pending
struct AbandonGuard<'a> {
    manager: &'a WaiterManager,
    match_id: &'a MatchId,
    id: u64,
    claim: Arc<ResolutionClaim>,
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if self.claim.try_claim(WaiterState::Abandoned) {
            self.manager.remove(self.match_id, self.id);
            tracing::trace!(match_id = %self.match_id, waiter_id = self.id, "Waiter abandoned");
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_pending, task};

    use super::*;
    use crate::state::ScoreCard;

    fn setup(policy: UnsatisfiedWaiterPolicy) -> (Arc<StateStore>, Arc<WaiterManager>, MatchId) {
        let store = Arc::new(StateStore::new());
        let manager = Arc::new(WaiterManager::with_policy(Arc::clone(&store), policy));
        (store, manager, MatchId::new("M"))
    }

    fn bump(store: &StateStore, id: &MatchId) -> Arc<VersionedUpdate> {
        store.replace_with(id, |cur| cur.payload.clone())
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_path_when_store_is_ahead() {
        let (_store, manager, id) = setup(UnsatisfiedWaiterPolicy::Retain);
        let start = Instant::now();

        // Version starts at 1, so a fresh poller (since 0) never waits
        let response = manager.register(&id, 0, Duration::from_secs(25)).await;

        assert_eq!(response.resolution, Resolution::Immediate);
        assert_eq!(response.update.version, 1);
        assert!(response.is_fresh(0));
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(manager.pending_count(&id), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_returns_current_snapshot() {
        let (_store, manager, id) = setup(UnsatisfiedWaiterPolicy::Retain);
        let start = Instant::now();

        let response = manager.register(&id, 1, Duration::from_millis(100)).await;

        assert_eq!(response.resolution, Resolution::Timeout);
        assert_eq!(response.update.version, 1);
        assert!(!response.is_fresh(1));
        assert_eq!(start.elapsed(), Duration::from_millis(100));
        assert_eq!(manager.pending_count(&id), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_resolves_before_deadline() {
        let (store, manager, id) = setup(UnsatisfiedWaiterPolicy::Retain);
        let start = Instant::now();

        let poll = {
            let manager = Arc::clone(&manager);
            let id = id.clone();
            tokio::spawn(async move {
                let response = manager.register(&id, 1, Duration::from_secs(1)).await;
                (response, start.elapsed())
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(manager.pending_count(&id), 1);

        let update = bump(&store, &id);
        let report = manager.resolve_all(&id, &update);
        assert_eq!(report.resolved, 1);

        let (response, elapsed) = poll.await.unwrap();
        assert_eq!(response.resolution, Resolution::Update);
        assert_eq!(response.update.version, 2);
        assert_eq!(elapsed, Duration::from_millis(50));

        // Nothing left behind to fire later
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(manager.pending_count(&id), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_many_waiters_resolve_with_same_update() {
        let (store, manager, id) = setup(UnsatisfiedWaiterPolicy::Retain);

        let polls: Vec<_> = (0..10)
            .map(|_| {
                let manager = Arc::clone(&manager);
                let id = id.clone();
                tokio::spawn(async move { manager.register(&id, 1, Duration::from_secs(25)).await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(manager.pending_count(&id), 10);

        let update = bump(&store, &id);
        let report = manager.resolve_all(&id, &update);
        assert_eq!(report.resolved, 10);
        assert_eq!(manager.pending_count(&id), 0);

        for poll in polls {
            let response = poll.await.unwrap();
            assert_eq!(response.resolution, Resolution::Update);
            assert!(Arc::ptr_eq(&response.update, &update));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsatisfied_waiter_is_retained() {
        let (store, manager, id) = setup(UnsatisfiedWaiterPolicy::Retain);

        let poll = {
            let manager = Arc::clone(&manager);
            let id = id.clone();
            tokio::spawn(async move { manager.register(&id, 3, Duration::from_secs(25)).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        // v2 and v3 don't exceed what the caller has
        for _ in 0..2 {
            let update = bump(&store, &id);
            let report = manager.resolve_all(&id, &update);
            assert_eq!(report.resolved, 0);
            assert_eq!(report.retained, 1);
        }
        assert_eq!(manager.pending_count(&id), 1);

        let update = bump(&store, &id);
        assert_eq!(manager.resolve_all(&id, &update).resolved, 1);

        let response = poll.await.unwrap();
        assert_eq!(response.resolution, Resolution::Update);
        assert_eq!(response.update.version, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsatisfied_waiter_dropped_still_answered_at_deadline() {
        let (store, manager, id) = setup(UnsatisfiedWaiterPolicy::Drop);
        let start = Instant::now();

        let poll = {
            let manager = Arc::clone(&manager);
            let id = id.clone();
            tokio::spawn(async move { manager.register(&id, 5, Duration::from_millis(200)).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let update = bump(&store, &id);
        let report = manager.resolve_all(&id, &update);
        assert_eq!(report.dropped, 1);
        assert_eq!(manager.pending_count(&id), 0);

        let response = poll.await.unwrap();
        assert_eq!(response.resolution, Resolution::Timeout);
        assert_eq!(response.update.version, 2);
        assert_eq!(start.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_future_removes_waiter() {
        let (_store, manager, id) = setup(UnsatisfiedWaiterPolicy::Retain);

        let mut poll = task::spawn(manager.register(&id, 1, Duration::from_secs(25)));
        assert_pending!(poll.poll());
        assert_eq!(manager.pending_count(&id), 1);

        drop(poll);
        assert_eq!(manager.pending_count(&id), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_after_timeout_is_noop() {
        let (store, manager, id) = setup(UnsatisfiedWaiterPolicy::Retain);

        let response = manager.register(&id, 1, Duration::from_millis(10)).await;
        assert_eq!(response.resolution, Resolution::Timeout);

        let update = store.replace(&id, ScoreCard::default());
        assert_eq!(manager.resolve_all(&id, &update), ResolveReport::default());
    }

    #[tokio::test]
    async fn test_resolve_all_unknown_match() {
        let (store, manager, _id) = setup(UnsatisfiedWaiterPolicy::Retain);
        let other = MatchId::new("unknown");
        let update = store.replace(&other, ScoreCard::default());

        assert_eq!(manager.resolve_all(&other, &update), ResolveReport::default());
        assert_eq!(manager.total_pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_publish_then_timeout() {
        let (store, manager, id) = setup(UnsatisfiedWaiterPolicy::Retain);
        let start = Instant::now();

        let first = {
            let manager = Arc::clone(&manager);
            let id = id.clone();
            tokio::spawn(async move {
                let r = manager.register(&id, 1, Duration::from_millis(1000)).await;
                (r, start.elapsed())
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        let update = bump(&store, &id);
        manager.resolve_all(&id, &update);

        let (response, elapsed) = first.await.unwrap();
        assert_eq!(response.update.version, 2);
        assert_eq!(elapsed, Duration::from_millis(50));

        let second_start = Instant::now();
        let response = manager.register(&id, 2, Duration::from_millis(100)).await;
        assert_eq!(response.update.version, 2);
        assert_eq!(response.resolution, Resolution::Timeout);
        assert_eq!(second_start.elapsed(), Duration::from_millis(100));
    }
}
