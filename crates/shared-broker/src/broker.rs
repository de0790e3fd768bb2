//! # Broker Port
//!
//! The subset of broker administration and messaging used by the gateway.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::time::Instant;

/// Errors raised by a broker implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// The named channel does not exist.
    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    /// The broker could not be reached or refused the operation.
    #[error("broker unavailable: {0}")]
    Unavailable(String),

    /// The channel was deleted while a receive was pending.
    #[error("channel closed: {0}")]
    Closed(String),
}

/// Named-channel message broker.
///
/// Implementations must be safe to share across tasks; the gateway holds one
/// instance behind an `Arc<dyn Broker>` for its whole lifetime.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Create `channel` unless it already exists.
    async fn create_channel_if_absent(&self, channel: &str) -> Result<(), BrokerError>;

    /// Delete `channel` if it exists. Deleting a missing channel succeeds.
    async fn delete_channel_if_present(&self, channel: &str) -> Result<(), BrokerError>;

    /// Deliver one payload to `channel`.
    async fn send(&self, channel: &str, payload: Bytes) -> Result<(), BrokerError>;

    /// Wait for the next payload on `channel` until `deadline`.
    ///
    /// Returns `Ok(None)` when the deadline passes with nothing delivered.
    async fn receive(&self, channel: &str, deadline: Instant)
        -> Result<Option<Bytes>, BrokerError>;
}
