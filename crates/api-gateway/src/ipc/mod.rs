//! Broker-side plumbing: reply channels, the request/reply bridge, latency
//! observation and counters.

pub mod bridge;
pub mod latency;
pub mod reply_channel;
pub mod stats;

#[cfg(test)]
pub(crate) mod testing;

pub use bridge::{BridgeConfig, RequestReplyBridge};
pub use latency::{LatencySample, LatencySink, TracingLatencySink};
pub use reply_channel::{ReplyChannel, ReplyChannelManager};
pub use stats::{BridgeStats, BridgeStatsSnapshot};
