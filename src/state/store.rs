//! Latest-snapshot store
//!
//! Holds exactly one `VersionedUpdate` per match. Each match sits behind its
//! own lock so a `replace` on one match never contends with reads of another,
//! and the read-modify-write of the version counter is atomic per match.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::scorecard::ScoreCard;
use super::update::{MatchId, VersionedUpdate};

type Slot = Arc<Mutex<Arc<VersionedUpdate>>>;

/// Store of the latest snapshot per match
#[derive(Default)]
pub struct StateStore {
    /// Map of match id to its current snapshot
    matches: RwLock<HashMap<MatchId, Slot>>,
}

impl StateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, match_id: &MatchId) -> Slot {
        if let Some(slot) = self.matches.read().get(match_id) {
            return Arc::clone(slot);
        }

        let mut matches = self.matches.write();
        let slot = matches.entry(match_id.clone()).or_insert_with(|| {
            tracing::debug!(match_id = %match_id, "Match initialized");
            Arc::new(Mutex::new(Arc::new(VersionedUpdate::initial(
                match_id.clone(),
            ))))
        });
        Arc::clone(slot)
    }

    /// Get the current snapshot, creating version 1 for an unseen match
    pub fn get_or_init(&self, match_id: &MatchId) -> Arc<VersionedUpdate> {
        let slot = self.slot(match_id);
        let current = Arc::clone(&slot.lock());
        current
    }

    /// Get the current snapshot without initializing the match
    pub fn snapshot(&self, match_id: &MatchId) -> Option<Arc<VersionedUpdate>> {
        let slot = self.matches.read().get(match_id).cloned()?;
        let current = Arc::clone(&slot.lock());
        Some(current)
    }

    /// Store `payload` as the next version of the match
    pub fn replace(&self, match_id: &MatchId, payload: ScoreCard) -> Arc<VersionedUpdate> {
        self.replace_with(match_id, |_| payload)
    }

    /// Derive the next payload from the current snapshot and store it
    ///
    /// The closure runs under the match's lock, so two concurrent callers
    /// always produce consecutive versions.
    pub fn replace_with<F>(&self, match_id: &MatchId, f: F) -> Arc<VersionedUpdate>
    where
        F: FnOnce(&VersionedUpdate) -> ScoreCard,
    {
        let slot = self.slot(match_id);
        let mut current = slot.lock();

        let next = Arc::new(current.next(f(&**current)));
        *current = Arc::clone(&next);

        tracing::trace!(match_id = %match_id, version = next.version, "Snapshot replaced");
        next
    }

    /// Number of matches seen so far
    pub fn match_count(&self) -> usize {
        self.matches.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_init_creates_version_one() {
        let store = StateStore::new();
        let id = MatchId::new("M");

        assert!(store.snapshot(&id).is_none());

        let first = store.get_or_init(&id);
        assert_eq!(first.version, 1);
        assert_eq!(first.payload, ScoreCard::default());

        // Second call doesn't reinitialize
        let again = store.get_or_init(&id);
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(store.match_count(), 1);
    }

    #[test]
    fn test_replace_increments_version() {
        let store = StateStore::new();
        let id = MatchId::new("M");
        store.get_or_init(&id);

        let mut card = ScoreCard::default();
        card.score.runs = 4;
        card.commentary = "Scored 4!".into();

        let next = store.replace(&id, card.clone());
        assert_eq!(next.version, 2);
        assert_eq!(next.payload, card);
        assert_eq!(store.get_or_init(&id).version, 2);

        let next = store.replace(&id, ScoreCard::default());
        assert_eq!(next.version, 3);
    }

    #[test]
    fn test_matches_are_independent() {
        let store = StateStore::new();
        let a = MatchId::new("A");
        let b = MatchId::new("B");

        store.replace(&a, ScoreCard::default());
        store.replace(&a, ScoreCard::default());

        assert_eq!(store.get_or_init(&a).version, 3);
        assert_eq!(store.get_or_init(&b).version, 1);
    }

    #[test]
    fn test_concurrent_replace_is_serialized() {
        let store = Arc::new(StateStore::new());
        let id = MatchId::new("M");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let id = id.clone();
                std::thread::spawn(move || {
                    let mut seen = Vec::new();
                    for _ in 0..100 {
                        let next = store.replace_with(&id, |cur| {
                            let mut card = cur.payload.clone();
                            card.score.runs += 1;
                            card
                        });
                        seen.push(next.version);
                    }
                    seen
                })
            })
            .collect();

        let mut versions: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        versions.sort_unstable();
        versions.dedup();

        // Every replace got its own version, no lost updates
        assert_eq!(versions.len(), 800);
        let last = store.get_or_init(&id);
        assert_eq!(last.version, 801);
        assert_eq!(last.payload.score.runs, 800);
    }
}
