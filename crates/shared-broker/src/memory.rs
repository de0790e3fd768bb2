//! # In-Memory Broker
//!
//! Single-process [`Broker`] backed by one unbounded `mpsc` queue per channel.
//! Used by the standalone gateway binary and by every test that needs a broker.
//!
//! Each payload is delivered to exactly one receiver, like a queue. Deleting a
//! channel closes it: a receive already waiting on it drains whatever was
//! buffered and then fails with [`BrokerError::Closed`].

use crate::broker::{Broker, BrokerError};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, trace};

/// One named queue.
struct Channel {
    /// `None` once the channel has been deleted.
    sender: Mutex<Option<mpsc::UnboundedSender<Bytes>>>,
    receiver: tokio::sync::Mutex<mpsc::UnboundedReceiver<Bytes>>,
}

impl Channel {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            sender: Mutex::new(Some(tx)),
            receiver: tokio::sync::Mutex::new(rx),
        }
    }

    fn close(&self) {
        self.sender.lock().take();
    }
}

/// Statistics for the in-memory broker
#[derive(Debug, Default)]
pub struct BrokerStats {
    /// Channels created (idempotent re-creates not counted)
    pub channels_created: AtomicU64,
    /// Channels deleted (deletes of missing channels not counted)
    pub channels_deleted: AtomicU64,
    /// Payloads accepted by `send`
    pub messages_sent: AtomicU64,
    /// Payloads handed out by `receive`
    pub messages_received: AtomicU64,
    /// Receives that hit their deadline
    pub receive_timeouts: AtomicU64,
}

/// In-process broker.
#[derive(Default)]
pub struct InMemoryBroker {
    channels: DashMap<String, Arc<Channel>>,
    stats: Arc<BrokerStats>,
}

impl InMemoryBroker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a broker with `channels` already declared.
    #[must_use]
    pub fn with_channels<I, S>(channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let broker = Self::new();
        for name in channels {
            broker.channels.insert(name.into(), Arc::new(Channel::new()));
        }
        broker
    }

    /// Whether `channel` currently exists.
    #[must_use]
    pub fn channel_exists(&self, channel: &str) -> bool {
        self.channels.contains_key(channel)
    }

    /// Number of existing channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Names of existing channels starting with `prefix`.
    #[must_use]
    pub fn channels_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.channels
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect()
    }

    #[must_use]
    pub fn stats(&self) -> &BrokerStats {
        &self.stats
    }

    fn lookup(&self, channel: &str) -> Result<Arc<Channel>, BrokerError> {
        self.channels
            .get(channel)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| BrokerError::ChannelNotFound(channel.to_string()))
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn create_channel_if_absent(&self, channel: &str) -> Result<(), BrokerError> {
        let mut created = false;
        self.channels.entry(channel.to_string()).or_insert_with(|| {
            created = true;
            Arc::new(Channel::new())
        });

        if created {
            self.stats.channels_created.fetch_add(1, Ordering::Relaxed);
            debug!(channel = channel, "Channel created");
        }
        Ok(())
    }

    async fn delete_channel_if_present(&self, channel: &str) -> Result<(), BrokerError> {
        if let Some((_, removed)) = self.channels.remove(channel) {
            removed.close();
            self.stats.channels_deleted.fetch_add(1, Ordering::Relaxed);
            debug!(channel = channel, "Channel deleted");
        }
        Ok(())
    }

    async fn send(&self, channel: &str, payload: Bytes) -> Result<(), BrokerError> {
        let target = self.lookup(channel)?;
        let len = payload.len();

        let delivered = match target.sender.lock().as_ref() {
            Some(tx) => tx.send(payload).is_ok(),
            None => false,
        };
        if !delivered {
            return Err(BrokerError::ChannelNotFound(channel.to_string()));
        }

        self.stats.messages_sent.fetch_add(1, Ordering::Relaxed);
        trace!(channel = channel, bytes = len, "Payload sent");
        Ok(())
    }

    async fn receive(
        &self,
        channel: &str,
        deadline: Instant,
    ) -> Result<Option<Bytes>, BrokerError> {
        let source = self.lookup(channel)?;
        let mut receiver = source.receiver.lock().await;

        match tokio::time::timeout_at(deadline, receiver.recv()).await {
            Ok(Some(payload)) => {
                self.stats.messages_received.fetch_add(1, Ordering::Relaxed);
                trace!(channel = channel, bytes = payload.len(), "Payload received");
                Ok(Some(payload))
            }
            Ok(None) => Err(BrokerError::Closed(channel.to_string())),
            Err(_) => {
                self.stats.receive_timeouts.fetch_add(1, Ordering::Relaxed);
                debug!(channel = channel, "Receive deadline reached");
                Ok(None)
            }
        }
    }
}
