//! Waiter bookkeeping
//!
//! A waiter is one outstanding long-poll. Two paths can finish it: a publish
//! carrying a newer version, or its deadline. Both go through the same
//! `ResolutionClaim`, and only the first transition out of `Pending` wins.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::state::VersionedUpdate;

/// Lifecycle of a waiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaiterState {
    /// Registered, not yet resolved
    Pending,
    /// Resolved by a publish with a newer version
    ResolvedByUpdate,
    /// Resolved by its deadline with the then-current snapshot
    ResolvedByTimeout,
    /// Caller stopped waiting before either path fired
    Abandoned,
}

impl WaiterState {
    const PENDING: u8 = 0;
    const BY_UPDATE: u8 = 1;
    const BY_TIMEOUT: u8 = 2;
    const ABANDONED: u8 = 3;

    fn as_u8(self) -> u8 {
        match self {
            WaiterState::Pending => Self::PENDING,
            WaiterState::ResolvedByUpdate => Self::BY_UPDATE,
            WaiterState::ResolvedByTimeout => Self::BY_TIMEOUT,
            WaiterState::Abandoned => Self::ABANDONED,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            Self::BY_UPDATE => WaiterState::ResolvedByUpdate,
            Self::BY_TIMEOUT => WaiterState::ResolvedByTimeout,
            Self::ABANDONED => WaiterState::Abandoned,
            _ => WaiterState::Pending,
        }
    }
}

/// Single-resolution guard shared by a waiter and the future awaiting it
#[derive(Debug)]
pub struct ResolutionClaim {
    state: AtomicU8,
}

impl ResolutionClaim {
    /// Create a pending claim
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(WaiterState::PENDING),
        }
    }

    /// Try to move from `Pending` to `to`
    ///
    /// Returns `true` for exactly one caller. Every later attempt, from
    /// either path, observes the terminal state and returns `false`.
    pub fn try_claim(&self, to: WaiterState) -> bool {
        debug_assert!(to != WaiterState::Pending);
        self.state
            .compare_exchange(
                WaiterState::PENDING,
                to.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Current state
    pub fn state(&self) -> WaiterState {
        WaiterState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether nobody has claimed the waiter yet
    pub fn is_pending(&self) -> bool {
        self.state() == WaiterState::Pending
    }
}

impl Default for ResolutionClaim {
    fn default() -> Self {
        Self::new()
    }
}

/// One outstanding long-poll request, owned by the waiter set
pub(super) struct Waiter {
    /// Manager-unique id, used by the deadline path to find its own entry
    pub id: u64,
    /// Version the caller already has
    pub since_version: u64,
    /// Shared with the awaiting future
    pub claim: Arc<ResolutionClaim>,
    /// Completion handle
    tx: oneshot::Sender<Arc<VersionedUpdate>>,
}

impl Waiter {
    /// Create a waiter and the receiving end of its completion handle
    pub fn new(
        id: u64,
        since_version: u64,
    ) -> (Self, Arc<ResolutionClaim>, oneshot::Receiver<Arc<VersionedUpdate>>) {
        let (tx, rx) = oneshot::channel();
        let claim = Arc::new(ResolutionClaim::new());

        let waiter = Self {
            id,
            since_version,
            claim: Arc::clone(&claim),
            tx,
        };

        (waiter, claim, rx)
    }

    /// Whether `update` is newer than what the caller already has
    pub fn is_satisfied_by(&self, update: &VersionedUpdate) -> bool {
        update.version > self.since_version
    }

    /// Resolve with `update` if the deadline hasn't claimed this waiter first
    ///
    /// Returns `true` if this call delivered the update.
    pub fn resolve(self, update: Arc<VersionedUpdate>) -> bool {
        if !self.claim.try_claim(WaiterState::ResolvedByUpdate) {
            return false;
        }
        // Receiver gone means the caller was dropped mid-claim; nothing to do
        let _ = self.tx.send(update);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MatchId;

    #[test]
    fn test_claim_is_exclusive() {
        let claim = ResolutionClaim::new();
        assert!(claim.is_pending());

        assert!(claim.try_claim(WaiterState::ResolvedByTimeout));
        assert!(!claim.try_claim(WaiterState::ResolvedByUpdate));
        assert!(!claim.try_claim(WaiterState::Abandoned));
        assert_eq!(claim.state(), WaiterState::ResolvedByTimeout);
    }

    #[test]
    fn test_claim_race_has_one_winner() {
        let claim = Arc::new(ResolutionClaim::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let claim = Arc::clone(&claim);
                std::thread::spawn(move || {
                    let to = if i % 2 == 0 {
                        WaiterState::ResolvedByUpdate
                    } else {
                        WaiterState::ResolvedByTimeout
                    };
                    claim.try_claim(to)
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert!(!claim.is_pending());
    }

    #[test]
    fn test_resolve_delivers_once() {
        let update = Arc::new(VersionedUpdate::initial(MatchId::new("M")).next(Default::default()));
        let (waiter, claim, mut rx) = Waiter::new(1, 1);

        assert!(waiter.is_satisfied_by(&update));
        assert!(waiter.resolve(Arc::clone(&update)));
        assert_eq!(claim.state(), WaiterState::ResolvedByUpdate);
        assert_eq!(rx.try_recv().unwrap().version, 2);
    }

    #[test]
    fn test_resolve_after_timeout_is_noop() {
        let update = Arc::new(VersionedUpdate::initial(MatchId::new("M")).next(Default::default()));
        let (waiter, claim, mut rx) = Waiter::new(1, 1);

        assert!(claim.try_claim(WaiterState::ResolvedByTimeout));
        assert!(!waiter.resolve(update));
        assert!(rx.try_recv().is_err());
    }
}
