//! # Bridge Flows
//!
//! The request/reply bridge against the in-memory broker and a simulated
//! router, covering correlation, deadlines, malformed replies, isolation of
//! concurrent calls and reply-channel cleanup on every path.

#[cfg(test)]
mod tests {
    use super::super::router::{ServiceReply, SimulatedRouter};
    use api_gateway::{
        BridgeConfig, BridgeError, LatencySample, LatencySink, RequestReplyBridge,
    };
    use bytes::Bytes;
    use parking_lot::Mutex;
    use shared_broker::{Broker, InMemoryBroker, DEFAULT_INGRESS_CHANNEL, REPLY_CHANNEL_PREFIX};
    use shared_envelope::codec;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    #[derive(Default)]
    struct Samples(Mutex<Vec<LatencySample>>);

    impl LatencySink for Samples {
        fn record(&self, sample: LatencySample) {
            self.0.lock().push(sample);
        }
    }

    fn broker() -> Arc<InMemoryBroker> {
        Arc::new(InMemoryBroker::with_channels([DEFAULT_INGRESS_CHANNEL]))
    }

    fn bridge(broker: &Arc<InMemoryBroker>) -> RequestReplyBridge {
        RequestReplyBridge::new(BridgeConfig::default(), Arc::clone(broker) as Arc<dyn Broker>)
    }

    fn router(broker: &Arc<InMemoryBroker>) -> SimulatedRouter {
        SimulatedRouter::new(Arc::clone(broker) as Arc<dyn Broker>, DEFAULT_INGRESS_CHANNEL)
    }

    fn reply_channels(broker: &InMemoryBroker) -> Vec<String> {
        broker.channels_with_prefix(REPLY_CHANNEL_PREFIX)
    }

    async fn settle(broker: &InMemoryBroker) {
        for _ in 0..50 {
            if reply_channels(broker).is_empty() {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    // =============================================================================
    // SCENARIOS
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_reply_within_deadline_returns_body() {
        let broker = broker();
        let _router = router(&broker)
            .service("svc-books", |_| {
                ServiceReply::Delayed(Duration::from_secs(2), r#"{"isbn":"123"}"#.into())
            })
            .spawn();
        let bridge = bridge(&broker);

        let started = Instant::now();
        let body = bridge
            .request_until("svc-books", r#"{"command":"list"}"#, started + Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(body.as_ref(), br#"{"isbn":"123"}"#);
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(reply_channels(&broker).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_reply_times_out_at_deadline() {
        let broker = broker();
        let _router = router(&broker)
            .service("svc-books", |_| ServiceReply::Silent)
            .spawn();
        let bridge = bridge(&broker);

        let started = Instant::now();
        let err = bridge
            .request_until("svc-books", "{}", started + Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::Timeout { .. }), "{err:?}");
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(1));
        assert!(elapsed < Duration::from_millis(1100));
        assert!(reply_channels(&broker).is_empty());
    }

    #[tokio::test]
    async fn test_empty_reply_is_malformed_body() {
        let broker = broker();
        let _router = router(&broker)
            .service("svc-books", |_| ServiceReply::Raw(Bytes::new()))
            .spawn();

        let err = bridge(&broker).request("svc-books", "{}").await.unwrap_err();
        assert!(matches!(err, BridgeError::MalformedBody(_)), "{err:?}");
        assert!(reply_channels(&broker).is_empty());
    }

    #[tokio::test]
    async fn test_truncated_reply_is_malformed_envelope() {
        let broker = broker();
        let _router = router(&broker)
            .service("svc-books", |request| {
                let full = codec::encode(&request.reply("svc-books", None, "[1,2,3]")).unwrap();
                ServiceReply::Raw(full.slice(..full.len() / 2))
            })
            .spawn();

        let err = bridge(&broker).request("svc-books", "{}").await.unwrap_err();
        assert!(matches!(err, BridgeError::MalformedEnvelope(_)), "{err:?}");
        assert!(!err.is_retryable());
        assert!(reply_channels(&broker).is_empty());
    }

    #[tokio::test]
    async fn test_reply_without_body_is_malformed_body() {
        let broker = broker();
        let _router = router(&broker)
            .service("svc-users", |_| {
                ServiceReply::Raw(Bytes::from_static(br#"{"headers":[],"body":null}"#))
            })
            .spawn();

        let err = bridge(&broker).request("svc-users", "{}").await.unwrap_err();
        assert!(matches!(err, BridgeError::MalformedBody(_)), "{err:?}");
    }

    // =============================================================================
    // PROPERTIES
    // =============================================================================

    #[tokio::test]
    async fn test_reply_guid_equals_request_guid() {
        let broker = broker();
        let router = router(&broker)
            .service("svc-loans", |_| ServiceReply::Body("{}".into()))
            .spawn();
        let samples = Arc::new(Samples::default());
        let bridge = bridge(&broker).with_latency_sink(samples.clone());

        bridge.request("svc-loans", "{}").await.unwrap();

        let seen = router.seen();
        assert_eq!(seen.len(), 1);
        let recorded = samples.0.lock().clone();
        assert_eq!(recorded.len(), 1);
        assert_eq!(Some(recorded[0].correlation_id), seen[0].correlation_id());
        assert_eq!(recorded[0].queue, "svc-loans");
    }

    #[tokio::test]
    async fn test_each_request_uses_a_fresh_reply_channel() {
        let broker = broker();
        let router = router(&broker)
            .service("svc-books", |_| ServiceReply::Body("[]".into()))
            .spawn();
        let bridge = bridge(&broker);

        for _ in 0..3 {
            bridge.request("svc-books", "{}").await.unwrap();
        }

        let hops: Vec<String> = router
            .seen()
            .iter()
            .map(|request| request.reply_destination().unwrap().to_string())
            .collect();
        assert_eq!(hops.len(), 3);
        assert_ne!(hops[0], hops[1]);
        assert_ne!(hops[1], hops[2]);
        assert!(hops.iter().all(|hop| !broker.channel_exists(hop)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_calls_never_see_each_others_reply() {
        let broker = broker();
        // Earlier requests answer later, so replies come back in reverse order.
        let _router = router(&broker)
            .service("svc-echo", |request| {
                let body = String::from_utf8(request.body().to_vec()).unwrap();
                let index: u64 = body.parse().unwrap();
                ServiceReply::Delayed(Duration::from_millis(1_000 - index * 10), body)
            })
            .spawn();
        let bridge = Arc::new(bridge(&broker));

        let calls = (0..32u64).map(|i| {
            let bridge = Arc::clone(&bridge);
            async move { (i, bridge.request("svc-echo", i.to_string()).await) }
        });
        let results = futures::future::join_all(calls).await;

        for (i, result) in results {
            assert_eq!(result.unwrap(), Bytes::from(i.to_string()));
        }
        assert!(reply_channels(&broker).is_empty());
        assert_eq!(bridge.stats().snapshot().replies, 32);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_reply_finds_no_channel() {
        let broker = broker();
        let router = router(&broker)
            .service("svc-books", |_| {
                ServiceReply::Delayed(Duration::from_secs(3), "too late".into())
            })
            .spawn();
        let bridge = bridge(&broker);

        let err = bridge
            .request_until("svc-books", "{}", Instant::now() + Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Timeout { .. }));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(router.undelivered(), 1);
        assert!(reply_channels(&broker).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_call_still_releases_channel() {
        let broker = broker();
        let _router = router(&broker)
            .service("svc-books", |_| ServiceReply::Silent)
            .spawn();
        let bridge = bridge(&broker);

        let outcome = tokio::time::timeout(
            Duration::from_millis(200),
            bridge.request_until("svc-books", "{}", Instant::now() + Duration::from_secs(10)),
        )
        .await;
        assert!(outcome.is_err(), "outer timeout should cancel the call");

        settle(&broker).await;
        assert!(reply_channels(&broker).is_empty());
        assert_eq!(bridge.stats().in_flight(), 0);
    }

    #[tokio::test]
    async fn test_no_router_channel_fails_without_orphans() {
        let broker = Arc::new(InMemoryBroker::new());
        let err = bridge(&broker).request("svc-books", "{}").await.unwrap_err();

        assert!(matches!(err, BridgeError::Transport(_)), "{err:?}");
        assert!(err.is_retryable());
        assert!(reply_channels(&broker).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_created_channel_is_deleted() {
        let broker = broker();
        let _router = router(&broker)
            .service("svc-ok", |_| ServiceReply::Body("{}".into()))
            .service("svc-silent", |_| ServiceReply::Silent)
            .service("svc-broken", |_| ServiceReply::Raw(Bytes::from_static(b"nope")))
            .spawn();
        let bridge = bridge(&broker);
        let deadline = || Instant::now() + Duration::from_millis(500);

        assert!(bridge.request_until("svc-ok", "{}", deadline()).await.is_ok());
        assert!(bridge.request_until("svc-silent", "{}", deadline()).await.is_err());
        assert!(bridge.request_until("svc-broken", "{}", deadline()).await.is_err());

        let stats = broker.stats();
        assert_eq!(stats.channels_created.load(Ordering::Relaxed), 3);
        assert_eq!(stats.channels_deleted.load(Ordering::Relaxed), 3);

        let bridge_stats = bridge.stats().snapshot();
        assert_eq!(bridge_stats.calls, 3);
        assert_eq!(bridge_stats.replies, 1);
        assert_eq!(bridge_stats.timeouts, 1);
        assert_eq!(bridge_stats.malformed_replies, 1);
        assert_eq!(bridge_stats.in_flight, 0);
    }
}
