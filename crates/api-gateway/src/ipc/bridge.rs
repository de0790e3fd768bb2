//! Request/Reply Bridge.
//!
//! Turns one asynchronous broker exchange into one awaited result:
//!
//! ```text
//!   caller                 bridge                          broker
//!     │  call(req, ingress,   │                               │
//!     │       deadline)       │── create tmp-reply-<uuid> ───→│
//!     │                       │── send(ingress, req) ────────→│──→ router ──→ service
//!     │                       │── receive(tmp-reply, deadline)│←── reply ─────────┘
//!     │                       │── delete tmp-reply-<uuid> ───→│
//!     │←── body | BridgeError │                               │
//! ```
//!
//! One send, one receive, no retries. The reply channel is released on every
//! path, including cancellation of the caller's future.

use crate::domain::config::GatewayConfig;
use crate::domain::error::BridgeError;
use crate::ipc::latency::{self, LatencySink, TracingLatencySink};
use crate::ipc::reply_channel::{ReplyChannel, ReplyChannelManager};
use crate::ipc::stats::BridgeStats;
use crate::ports::outbound::{Clock, SystemClock};
use bytes::Bytes;
use shared_broker::{Broker, DEFAULT_INGRESS_CHANNEL, REPLY_CHANNEL_PREFIX};
use shared_envelope::{codec, CorrelationId, Envelope, Header};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Stand-in deadline when the default one does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Connection-independent bridge settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Channel requests are sent to
    pub ingress_channel: String,
    /// Prefix of reply channel names
    pub reply_prefix: String,
    /// Reply wait used by [`RequestReplyBridge::request`]
    pub default_deadline: Duration,
    /// Stamp the `current-queue-header` with the send time
    pub stamp_send_time: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            ingress_channel: DEFAULT_INGRESS_CHANNEL.to_string(),
            reply_prefix: REPLY_CHANNEL_PREFIX.to_string(),
            default_deadline: Duration::from_secs(20),
            stamp_send_time: true,
        }
    }
}

impl From<&GatewayConfig> for BridgeConfig {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            ingress_channel: config.broker.ingress_channel.clone(),
            reply_prefix: config.broker.reply_prefix.clone(),
            default_deadline: config.timeouts.reply,
            stamp_send_time: config.broker.stamp_send_time,
        }
    }
}

/// Deadline-bound request/reply over a [`Broker`].
pub struct RequestReplyBridge {
    broker: Arc<dyn Broker>,
    channels: ReplyChannelManager,
    config: BridgeConfig,
    clock: Arc<dyn Clock>,
    latency: Arc<dyn LatencySink>,
    stats: Arc<BridgeStats>,
}

impl RequestReplyBridge {
    pub fn new(config: BridgeConfig, broker: Arc<dyn Broker>) -> Self {
        let stats = Arc::new(BridgeStats::default());
        let channels = ReplyChannelManager::with_stats(
            Arc::clone(&broker),
            config.reply_prefix.clone(),
            Arc::clone(&stats),
        );

        Self {
            broker,
            channels,
            config,
            clock: Arc::new(SystemClock),
            latency: Arc::new(TracingLatencySink),
            stats,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_latency_sink(mut self, sink: Arc<dyn LatencySink>) -> Self {
        self.latency = sink;
        self
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    /// Send `body` to `destination` through the configured ingress channel and
    /// wait up to the default deadline for the reply body.
    pub async fn request(
        &self,
        destination: &str,
        body: impl Into<Bytes>,
    ) -> Result<Bytes, BridgeError> {
        let now = Instant::now();
        let deadline = now
            .checked_add(self.config.default_deadline)
            .unwrap_or_else(|| now + FAR_FUTURE);
        self.request_until(destination, body, deadline).await
    }

    /// [`request`](Self::request) with an explicit deadline.
    pub async fn request_until(
        &self,
        destination: &str,
        body: impl Into<Bytes>,
        deadline: Instant,
    ) -> Result<Bytes, BridgeError> {
        // The reply hop is added by `call` once the channel exists.
        let envelope = Envelope::builder()
            .header(Header::id(CorrelationId::new()))
            .header(Header::route(destination, true))
            .header(Header::current_queue(&self.config.ingress_channel, None))
            .body(body)
            .build();

        self.call(envelope, &self.config.ingress_channel, deadline)
            .await
    }

    /// Run one exchange: acquire a reply channel, point the request's final
    /// hop at it, send to `ingress`, wait for one reply until `deadline`,
    /// release the channel, return the reply body.
    pub async fn call(
        &self,
        request: Envelope,
        ingress: &str,
        deadline: Instant,
    ) -> Result<Bytes, BridgeError> {
        BridgeStats::bump(&self.stats.calls);
        let started = Instant::now();
        let guid = request.guid().unwrap_or("-").to_string();

        let channel = self
            .channels
            .acquire()
            .await
            .map_err(BridgeError::ChannelManagement)?;
        let reply_channel = channel.name().to_string();

        let outcome = self
            .exchange(request, ingress, &channel, deadline, started)
            .await;
        channel.release().await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(body) => {
                BridgeStats::bump(&self.stats.replies);
                debug!(
                    correlation_id = %guid,
                    reply_channel = %reply_channel,
                    bytes = body.len(),
                    elapsed_ms,
                    "Reply received"
                );
            }
            Err(e) => {
                match e {
                    BridgeError::Timeout { .. } => BridgeStats::bump(&self.stats.timeouts),
                    BridgeError::MalformedEnvelope(_) | BridgeError::MalformedBody(_) => {
                        BridgeStats::bump(&self.stats.malformed_replies)
                    }
                    BridgeError::Transport(_) => BridgeStats::bump(&self.stats.transport_failures),
                    BridgeError::ChannelManagement(_) | BridgeError::Encode(_) => {}
                }
                warn!(
                    correlation_id = %guid,
                    reply_channel = %reply_channel,
                    ingress = ingress,
                    elapsed_ms,
                    error = %e,
                    "Bridged call failed"
                );
            }
        }

        outcome
    }

    async fn exchange(
        &self,
        request: Envelope,
        ingress: &str,
        channel: &ReplyChannel,
        deadline: Instant,
        started: Instant,
    ) -> Result<Bytes, BridgeError> {
        let request = request.with_reply_channel(channel.name());
        let request = if self.config.stamp_send_time {
            request.with_send_stamp(ingress, self.clock.now())
        } else {
            request.with_current_queue(ingress)
        };

        let payload = codec::encode(&request).map_err(BridgeError::Encode)?;
        self.broker
            .send(ingress, payload)
            .await
            .map_err(BridgeError::Transport)?;
        debug!(
            correlation_id = request.guid().unwrap_or("-"),
            reply_channel = channel.name(),
            ingress = ingress,
            "Request sent"
        );

        let raw = self
            .broker
            .receive(channel.name(), deadline)
            .await
            .map_err(BridgeError::Transport)?
            .ok_or_else(|| BridgeError::Timeout {
                waited: started.elapsed(),
            })?;
        let received_at = self.clock.now();

        let reply = codec::decode(&raw)?;
        if reply.guid() != request.guid() {
            warn!(
                expected = request.guid().unwrap_or("-"),
                got = reply.guid().unwrap_or("-"),
                reply_channel = channel.name(),
                "Reply GUID does not match request"
            );
        }
        latency::observe(self.latency.as_ref(), &reply, received_at);

        Ok(reply.into_body())
    }
}
