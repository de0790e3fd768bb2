//! Reply latency observation.
//!
//! Services stamp the `current-queue-header` of their reply with a send time.
//! The bridge turns that stamp plus its own receive time into a
//! [`LatencySample`] and hands it to a [`LatencySink`].

use chrono::{DateTime, Utc};
use shared_envelope::{fields, CorrelationId, Envelope};
use std::time::Duration;
use tracing::{debug, info};

/// Time between a reply's send stamp and its arrival at the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencySample {
    pub correlation_id: CorrelationId,
    /// Queue named by the reply's `current-queue-header`
    pub queue: String,
    pub sent_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
    /// Zero when the sender's clock runs ahead of ours
    pub elapsed: Duration,
}

impl LatencySample {
    /// Build a sample from a decoded reply.
    ///
    /// `None` when the reply lacks a parseable GUID, a current-queue name, or a
    /// parseable timestamp.
    pub fn from_reply(reply: &Envelope, received_at: DateTime<Utc>) -> Option<Self> {
        let correlation_id = reply.correlation_id()?;
        let current = reply.current_queue()?;
        let queue = current.field(fields::NAME)?.to_string();
        let sent_at = current.timestamp()?;
        let elapsed = (received_at - sent_at).to_std().unwrap_or(Duration::ZERO);

        Some(Self {
            correlation_id,
            queue,
            sent_at,
            received_at,
            elapsed,
        })
    }
}

/// Destination for latency samples.
pub trait LatencySink: Send + Sync {
    fn record(&self, sample: LatencySample);
}

/// Default sink: one structured log event per sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLatencySink;

impl LatencySink for TracingLatencySink {
    fn record(&self, sample: LatencySample) {
        info!(
            target: "rasputin::latency",
            correlation_id = %sample.correlation_id,
            queue = %sample.queue,
            sent_at = %sample.sent_at,
            received_at = %sample.received_at,
            elapsed_ms = sample.elapsed.as_millis() as u64,
            "Reply latency"
        );
    }
}

/// Derive a sample from `reply` and record it, or skip it with a debug log.
pub(crate) fn observe(sink: &dyn LatencySink, reply: &Envelope, received_at: DateTime<Utc>) {
    match LatencySample::from_reply(reply, received_at) {
        Some(sample) => sink.record(sample),
        None => debug!(
            guid = reply.guid().unwrap_or("-"),
            "Reply carries no usable send stamp, latency not recorded"
        ),
    }
}
