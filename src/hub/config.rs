//! Hub configuration

use std::time::Duration;

use crate::registry::RegistryConfig;
use crate::state::MatchId;
use crate::waiter::UnsatisfiedWaiterPolicy;

/// Default long-poll deadline
pub const DEFAULT_LONG_POLL_TIMEOUT: Duration = Duration::from_millis(25_000);

/// Broadcast hub configuration
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// How long a long-poll may wait before getting the current snapshot
    pub long_poll_timeout: Duration,

    /// Match used when a request doesn't name one
    pub default_match_id: MatchId,

    /// Handling of waiters a publish didn't satisfy
    pub unsatisfied_waiters: UnsatisfiedWaiterPolicy,

    /// Capacity of the queue between update sources and the dispatcher
    pub publish_queue_capacity: usize,

    /// Push registry settings (shared by both transports)
    pub registry: RegistryConfig,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            long_poll_timeout: DEFAULT_LONG_POLL_TIMEOUT,
            default_match_id: MatchId::default(),
            unsatisfied_waiters: UnsatisfiedWaiterPolicy::Retain,
            publish_queue_capacity: 256,
            registry: RegistryConfig::default(),
        }
    }
}

impl HubConfig {
    /// Set the long-poll deadline
    pub fn long_poll_timeout(mut self, timeout: Duration) -> Self {
        self.long_poll_timeout = timeout;
        self
    }

    /// Set the default match
    pub fn default_match_id(mut self, match_id: impl Into<MatchId>) -> Self {
        self.default_match_id = match_id.into();
        self
    }

    /// Set the unsatisfied-waiter policy
    pub fn unsatisfied_waiters(mut self, policy: UnsatisfiedWaiterPolicy) -> Self {
        self.unsatisfied_waiters = policy;
        self
    }

    /// Set the publish queue capacity
    pub fn publish_queue_capacity(mut self, capacity: usize) -> Self {
        self.publish_queue_capacity = capacity.max(1);
        self
    }

    /// Set the push registry configuration
    pub fn registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = registry;
        self
    }
}
