//! Reply Channel Manager.
//!
//! Every bridged call owns one broker channel named `<prefix><uuid>` for the
//! lifetime of the call. The [`ReplyChannel`] handle is the only way to reach
//! that name, and its release runs exactly once on every exit path:
//!
//! ```text
//! acquire() ──→ ReplyChannel ──┬── release().await      (normal paths)
//!                              └── Drop → spawn(delete)  (owning future cancelled)
//! ```
//!
//! Deletion failures are logged and counted, never returned.

use crate::ipc::stats::BridgeStats;
use shared_broker::{Broker, BrokerError};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Creates and deletes per-call reply channels.
pub struct ReplyChannelManager {
    broker: Arc<dyn Broker>,
    prefix: String,
    stats: Arc<BridgeStats>,
}

impl ReplyChannelManager {
    pub fn new(broker: Arc<dyn Broker>, prefix: impl Into<String>) -> Self {
        Self::with_stats(broker, prefix, Arc::new(BridgeStats::default()))
    }

    pub(crate) fn with_stats(
        broker: Arc<dyn Broker>,
        prefix: impl Into<String>,
        stats: Arc<BridgeStats>,
    ) -> Self {
        Self {
            broker,
            prefix: prefix.into(),
            stats,
        }
    }

    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    /// Create a fresh, uniquely named reply channel.
    ///
    /// A channel that already exists under the generated name counts as
    /// success. On error nothing needs releasing.
    pub async fn acquire(&self) -> Result<ReplyChannel, BrokerError> {
        let name = format!("{}{}", self.prefix, Uuid::new_v4());

        if let Err(e) = self.broker.create_channel_if_absent(&name).await {
            BridgeStats::bump(&self.stats.channel_failures);
            warn!(reply_channel = %name, error = %e, "Failed to create reply channel");
            return Err(e);
        }

        BridgeStats::bump(&self.stats.channels_acquired);
        debug!(reply_channel = %name, "Reply channel acquired");

        Ok(ReplyChannel {
            name,
            broker: Arc::clone(&self.broker),
            stats: Arc::clone(&self.stats),
            released: false,
        })
    }

    /// Delete the handle's channel. Equivalent to [`ReplyChannel::release`].
    pub async fn release(&self, channel: ReplyChannel) {
        channel.release().await;
    }
}

/// Owned handle to one reply channel.
#[must_use = "a reply channel must be released"]
pub struct ReplyChannel {
    name: String,
    broker: Arc<dyn Broker>,
    stats: Arc<BridgeStats>,
    released: bool,
}

impl ReplyChannel {
    /// Broker-side channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Delete the channel if present.
    ///
    /// Marked released only after the delete completed, so a release that is
    /// itself cancelled falls back to the drop path.
    pub async fn release(mut self) {
        delete_channel(self.broker.as_ref(), &self.name, &self.stats).await;
        self.released = true;
    }
}

impl std::fmt::Debug for ReplyChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyChannel")
            .field("name", &self.name)
            .field("released", &self.released)
            .finish()
    }
}

impl Drop for ReplyChannel {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let name = std::mem::take(&mut self.name);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                debug!(reply_channel = %name, "Reply channel dropped unreleased, releasing in background");
                let broker = Arc::clone(&self.broker);
                let stats = Arc::clone(&self.stats);
                runtime.spawn(async move {
                    delete_channel(broker.as_ref(), &name, &stats).await;
                });
            }
            Err(_) => {
                BridgeStats::bump(&self.stats.release_failures);
                BridgeStats::bump(&self.stats.channels_released);
                warn!(reply_channel = %name, "No runtime to release reply channel; it is leaked");
            }
        }
    }
}

async fn delete_channel(broker: &dyn Broker, name: &str, stats: &BridgeStats) {
    match broker.delete_channel_if_present(name).await {
        Ok(()) => debug!(reply_channel = name, "Reply channel released"),
        Err(e) => {
            BridgeStats::bump(&stats.release_failures);
            warn!(reply_channel = name, error = %e, "Failed to delete reply channel");
        }
    }
    BridgeStats::bump(&stats.channels_released);
}
