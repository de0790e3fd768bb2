//! Bridge counters, served by `/admin/bridge`.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics for the request/reply bridge
#[derive(Debug, Default)]
pub struct BridgeStats {
    /// Calls entered
    pub calls: AtomicU64,
    /// Calls that returned a reply body
    pub replies: AtomicU64,
    /// Calls that hit their deadline
    pub timeouts: AtomicU64,
    /// Replies that failed to decode
    pub malformed_replies: AtomicU64,
    /// Send or receive failures
    pub transport_failures: AtomicU64,
    /// Reply channel creation failures
    pub channel_failures: AtomicU64,
    /// Reply channels created
    pub channels_acquired: AtomicU64,
    /// Reply channels whose release ran (successful or not)
    pub channels_released: AtomicU64,
    /// Deletes that failed and were swallowed
    pub release_failures: AtomicU64,
}

impl BridgeStats {
    /// Reply channels acquired and not yet released.
    pub fn in_flight(&self) -> u64 {
        self.channels_acquired
            .load(Ordering::Relaxed)
            .saturating_sub(self.channels_released.load(Ordering::Relaxed))
    }

    pub fn snapshot(&self) -> BridgeStatsSnapshot {
        BridgeStatsSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            replies: self.replies.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            malformed_replies: self.malformed_replies.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            channel_failures: self.channel_failures.load(Ordering::Relaxed),
            release_failures: self.release_failures.load(Ordering::Relaxed),
            in_flight: self.in_flight(),
        }
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`BridgeStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BridgeStatsSnapshot {
    pub calls: u64,
    pub replies: u64,
    pub timeouts: u64,
    pub malformed_replies: u64,
    pub transport_failures: u64,
    pub channel_failures: u64,
    pub release_failures: u64,
    pub in_flight: u64,
}
