//! Match simulator
//!
//! Plays an innings one delivery at a time on a randomized cadence. Each
//! delivery is stored in the hub's store and then queued for fan-out, so the
//! simulator is the single writer for the matches it runs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;

use crate::hub::{BroadcastHub, PublishQueue};
use crate::state::MatchId;

use super::delivery::next_delivery;

/// Simulator timing
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Minimum gap between deliveries
    pub base_delay: Duration,

    /// Random extra gap, uniform in `[0, jitter)`
    pub jitter: Duration,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(3000),
            jitter: Duration::from_millis(4000),
        }
    }
}

impl SimulatorConfig {
    /// Set the minimum gap between deliveries
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the random extra gap
    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    fn next_gap<R: Rng>(&self, rng: &mut R) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let extra = if jitter_ms > 0 {
            rng.gen_range(0..jitter_ms)
        } else {
            0
        };
        self.base_delay + Duration::from_millis(extra)
    }
}

/// Runs one simulated innings per match
pub struct MatchSimulator {
    hub: Arc<BroadcastHub>,
    queue: PublishQueue,
    config: SimulatorConfig,
    running: Mutex<HashMap<MatchId, JoinHandle<()>>>,
}

impl MatchSimulator {
    /// Create a simulator publishing through `queue`
    pub fn new(hub: Arc<BroadcastHub>, queue: PublishQueue, config: SimulatorConfig) -> Self {
        Self {
            hub,
            queue,
            config,
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Start simulating a match
    ///
    /// Idempotent: returns `false` without doing anything if the match is
    /// already being simulated or its innings is over.
    pub fn start(&self, match_id: &MatchId) -> bool {
        let mut running = self.running.lock();

        if running.get(match_id).is_some_and(|h| !h.is_finished()) {
            tracing::debug!(match_id = %match_id, "Simulator already running");
            return false;
        }

        let current = self.hub.store().get_or_init(match_id);
        if current.payload.score.all_out() {
            tracing::debug!(match_id = %match_id, "Innings already over, not restarting");
            return false;
        }

        let handle = tokio::spawn(run_innings(
            Arc::clone(&self.hub),
            self.queue.clone(),
            match_id.clone(),
            self.config.clone(),
        ));
        running.insert(match_id.clone(), handle);

        tracing::info!(match_id = %match_id, version = current.version, "Simulator started");
        true
    }

    /// Whether a simulation for the match is in progress
    pub fn is_running(&self, match_id: &MatchId) -> bool {
        self.running
            .lock()
            .get(match_id)
            .is_some_and(|h| !h.is_finished())
    }

    /// Abort every running simulation
    pub fn stop_all(&self) {
        for (match_id, handle) in self.running.lock().drain() {
            if !handle.is_finished() {
                tracing::debug!(match_id = %match_id, "Simulator stopped");
            }
            handle.abort();
        }
    }
}

impl Drop for MatchSimulator {
    fn drop(&mut self) {
        self.stop_all();
    }
}

async fn run_innings(
    hub: Arc<BroadcastHub>,
    queue: PublishQueue,
    match_id: MatchId,
    config: SimulatorConfig,
) {
    let mut rng = StdRng::from_entropy();

    loop {
        tokio::time::sleep(config.next_gap(&mut rng)).await;

        let update = hub
            .store()
            .replace_with(&match_id, |cur| next_delivery(&cur.payload, &mut rng));
        let all_out = update.payload.score.all_out();

        tracing::debug!(
            match_id = %match_id,
            version = update.version,
            runs = update.payload.score.runs,
            wickets = update.payload.score.wickets,
            "Score updated"
        );

        if queue.publish(update).await.is_err() {
            tracing::warn!(match_id = %match_id, "Publish queue closed, simulator stopping");
            return;
        }

        if all_out {
            tracing::info!(match_id = %match_id, "Innings over, simulator finished");
            return;
        }
    }
}
