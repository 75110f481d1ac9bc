//! Statistics for the broadcast hub

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::registry::BroadcastReport;
use crate::waiter::{Resolution, ResolveReport};

/// Live counters, updated lock-free from the publish and request paths
#[derive(Debug)]
pub struct HubStats {
    started_at: Instant,
    publishes: AtomicU64,
    snapshot_reads: AtomicU64,
    long_polls_immediate: AtomicU64,
    long_polls_updated: AtomicU64,
    long_polls_timed_out: AtomicU64,
    waiters_dropped: AtomicU64,
    frames_delivered: AtomicU64,
    frames_lagged: AtomicU64,
    subscribers_evicted: AtomicU64,
}

/// Point-in-time copy of `HubStats`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubStatsSnapshot {
    /// Time since the hub was created
    #[serde(with = "duration_secs")]
    pub uptime: Duration,
    /// Updates published
    pub publishes: u64,
    /// Immediate snapshot reads
    pub snapshot_reads: u64,
    /// Long-polls answered without waiting
    pub long_polls_immediate: u64,
    /// Long-polls answered by a publish
    pub long_polls_updated: u64,
    /// Long-polls answered at their deadline
    pub long_polls_timed_out: u64,
    /// Waiters dropped unresolved by a publish
    pub waiters_dropped: u64,
    /// Push frames handed to subscribers (excluding catch-up)
    pub frames_delivered: u64,
    /// Push frames skipped for a full subscriber buffer
    pub frames_lagged: u64,
    /// Push subscribers removed by a failed send
    pub subscribers_evicted: u64,
    /// Long-polls currently waiting
    pub pending_waiters: u64,
    /// Push connections currently registered
    pub push_subscribers: u64,
}

impl HubStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            publishes: AtomicU64::new(0),
            snapshot_reads: AtomicU64::new(0),
            long_polls_immediate: AtomicU64::new(0),
            long_polls_updated: AtomicU64::new(0),
            long_polls_timed_out: AtomicU64::new(0),
            waiters_dropped: AtomicU64::new(0),
            frames_delivered: AtomicU64::new(0),
            frames_lagged: AtomicU64::new(0),
            subscribers_evicted: AtomicU64::new(0),
        }
    }

    /// Count one immediate snapshot read
    pub fn record_snapshot_read(&self) {
        self.snapshot_reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one answered long-poll
    pub fn record_long_poll(&self, resolution: Resolution) {
        let counter = match resolution {
            Resolution::Immediate => &self.long_polls_immediate,
            Resolution::Update => &self.long_polls_updated,
            Resolution::Timeout => &self.long_polls_timed_out,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one publish and what it did
    pub fn record_publish(&self, waiters: &ResolveReport, pushes: &[BroadcastReport]) {
        self.publishes.fetch_add(1, Ordering::Relaxed);
        self.waiters_dropped
            .fetch_add(waiters.dropped as u64, Ordering::Relaxed);

        for report in pushes {
            self.frames_delivered
                .fetch_add(report.delivered as u64, Ordering::Relaxed);
            self.frames_lagged
                .fetch_add(report.lagged as u64, Ordering::Relaxed);
            self.subscribers_evicted
                .fetch_add(report.removed as u64, Ordering::Relaxed);
        }
    }

    /// Copy the counters; gauges are supplied by the caller
    pub fn snapshot(&self, pending_waiters: usize, push_subscribers: usize) -> HubStatsSnapshot {
        HubStatsSnapshot {
            uptime: self.started_at.elapsed(),
            publishes: self.publishes.load(Ordering::Relaxed),
            snapshot_reads: self.snapshot_reads.load(Ordering::Relaxed),
            long_polls_immediate: self.long_polls_immediate.load(Ordering::Relaxed),
            long_polls_updated: self.long_polls_updated.load(Ordering::Relaxed),
            long_polls_timed_out: self.long_polls_timed_out.load(Ordering::Relaxed),
            waiters_dropped: self.waiters_dropped.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            frames_lagged: self.frames_lagged.load(Ordering::Relaxed),
            subscribers_evicted: self.subscribers_evicted.load(Ordering::Relaxed),
            pending_waiters: pending_waiters as u64,
            push_subscribers: push_subscribers as u64,
        }
    }
}

impl Default for HubStats {
    fn default() -> Self {
        Self::new()
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let stats = HubStats::new();
        let snap = stats.snapshot(0, 0);

        assert_eq!(snap.publishes, 0);
        assert_eq!(snap.long_polls_updated, 0);
        assert_eq!(snap.frames_delivered, 0);
    }

    #[test]
    fn test_record_long_poll_by_resolution() {
        let stats = HubStats::new();
        stats.record_long_poll(Resolution::Immediate);
        stats.record_long_poll(Resolution::Update);
        stats.record_long_poll(Resolution::Update);
        stats.record_long_poll(Resolution::Timeout);

        let snap = stats.snapshot(0, 0);
        assert_eq!(snap.long_polls_immediate, 1);
        assert_eq!(snap.long_polls_updated, 2);
        assert_eq!(snap.long_polls_timed_out, 1);
    }

    #[test]
    fn test_record_publish_sums_reports() {
        let stats = HubStats::new();
        let waiters = ResolveReport {
            resolved: 3,
            retained: 0,
            dropped: 1,
        };
        let pushes = [
            BroadcastReport {
                delivered: 2,
                already_current: 0,
                lagged: 1,
                removed: 0,
            },
            BroadcastReport {
                delivered: 1,
                already_current: 1,
                lagged: 0,
                removed: 1,
            },
        ];

        stats.record_publish(&waiters, &pushes);

        let snap = stats.snapshot(4, 5);
        assert_eq!(snap.publishes, 1);
        assert_eq!(snap.waiters_dropped, 1);
        assert_eq!(snap.frames_delivered, 3);
        assert_eq!(snap.frames_lagged, 1);
        assert_eq!(snap.subscribers_evicted, 1);
        assert_eq!(snap.pending_waiters, 4);
        assert_eq!(snap.push_subscribers, 5);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let snap = HubStats::new().snapshot(0, 0);
        let json = serde_json::to_value(&snap).unwrap();

        assert!(json["uptime"].is_u64());
        assert!(json.get("longPollsTimedOut").is_some());
        assert!(json.get("pushSubscribers").is_some());
    }
}
