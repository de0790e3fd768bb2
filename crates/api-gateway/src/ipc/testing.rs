//! Test doubles shared by the `ipc`, `handlers` and `service` tests.

use crate::ipc::latency::{LatencySample, LatencySink};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use shared_broker::{Broker, BrokerError, InMemoryBroker};
use shared_envelope::{codec, Envelope};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};

/// In-memory broker with switchable failures and call counters.
#[derive(Default)]
pub struct ScriptedBroker {
    inner: InMemoryBroker,
    fail_create: AtomicBool,
    fail_delete: AtomicBool,
    fail_send: AtomicBool,
    sends: AtomicU64,
    deletes: AtomicU64,
}

impl ScriptedBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channels(channels: &[&str]) -> Self {
        Self {
            inner: InMemoryBroker::with_channels(channels.iter().copied()),
            ..Self::default()
        }
    }

    pub fn inner(&self) -> &InMemoryBroker {
        &self.inner
    }

    pub fn fail_create(&self, on: bool) {
        self.fail_create.store(on, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, on: bool) {
        self.fail_delete.store(on, Ordering::SeqCst);
    }

    pub fn fail_send(&self, on: bool) {
        self.fail_send.store(on, Ordering::SeqCst);
    }

    pub fn sends(&self) -> u64 {
        self.sends.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> u64 {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Broker for ScriptedBroker {
    async fn create_channel_if_absent(&self, channel: &str) -> Result<(), BrokerError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(BrokerError::Unavailable("create refused".into()));
        }
        self.inner.create_channel_if_absent(channel).await
    }

    async fn delete_channel_if_present(&self, channel: &str) -> Result<(), BrokerError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(BrokerError::Unavailable("delete refused".into()));
        }
        self.inner.delete_channel_if_present(channel).await
    }

    async fn send(&self, channel: &str, payload: Bytes) -> Result<(), BrokerError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(BrokerError::Unavailable("send refused".into()));
        }
        self.inner.send(channel, payload).await
    }

    async fn receive(
        &self,
        channel: &str,
        deadline: Instant,
    ) -> Result<Option<Bytes>, BrokerError> {
        self.inner.receive(channel, deadline).await
    }
}

/// Latency sink that keeps every sample.
#[derive(Default)]
pub struct CollectingSink(Mutex<Vec<LatencySample>>);

impl CollectingSink {
    pub fn samples(&self) -> Vec<LatencySample> {
        self.0.lock().clone()
    }
}

impl LatencySink for CollectingSink {
    fn record(&self, sample: LatencySample) {
        self.0.lock().push(sample);
    }
}

/// Stand-in for router plus service: answer one request from `ingress`.
///
/// `reply` maps the decoded request to the raw bytes put on the reply channel.
pub fn respond_once<B, F>(broker: Arc<B>, ingress: &str, reply: F) -> JoinHandle<Envelope>
where
    B: Broker + 'static,
    F: FnOnce(&Envelope) -> Bytes + Send + 'static,
{
    let ingress = ingress.to_string();
    tokio::spawn(async move {
        let raw = broker
            .receive(&ingress, Instant::now() + Duration::from_secs(3600))
            .await
            .expect("ingress receive")
            .expect("request before deadline");
        let request = codec::decode(&raw).expect("request decodes");
        let reply_channel = request
            .reply_destination()
            .expect("request names a reply channel")
            .to_string();
        broker
            .send(&reply_channel, reply(&request))
            .await
            .expect("reply send");
        request
    })
}

/// Encoded reply carrying `body`, stamped by `queue` at `sent_at`.
pub fn encoded_reply(
    request: &Envelope,
    queue: &str,
    sent_at: Option<chrono::DateTime<chrono::Utc>>,
    body: &str,
) -> Bytes {
    codec::encode(&request.reply(queue, sent_at, body.to_string())).expect("reply encodes")
}
