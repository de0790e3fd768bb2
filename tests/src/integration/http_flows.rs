//! # HTTP Flows
//!
//! HTTP request → gateway router → broker → simulated service → broker →
//! HTTP response, with the service answering from the command it received.

#[cfg(test)]
mod tests {
    use super::super::router::{ServiceReply, SimulatedRouter};
    use api_gateway::{ApiGatewayService, GatewayConfig};
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use shared_broker::{Broker, InMemoryBroker, DEFAULT_INGRESS_CHANNEL, REPLY_CHANNEL_PREFIX};
    use shared_envelope::Envelope;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn command(request: &Envelope) -> Value {
        serde_json::from_slice(request.body()).unwrap()
    }

    /// Library services that answer from the command they were sent.
    fn library(broker: &Arc<InMemoryBroker>) -> SimulatedRouter {
        SimulatedRouter::new(Arc::clone(broker) as Arc<dyn Broker>, DEFAULT_INGRESS_CHANNEL)
            .service("ms-books", |request| {
                let cmd = command(request);
                let reply = match cmd["command"].as_str() {
                    Some("list") => json!([{ "isbn": cmd["book"]["isbn"], "title": "Dune" }]),
                    Some("create") => json!({ "created": cmd["book"]["isbn"] }),
                    _ => json!({ "error": "unknown command" }),
                };
                ServiceReply::Body(reply.to_string())
            })
            .service("ms-users", |request| {
                let cmd = command(request);
                ServiceReply::Body(json!({ "ids": cmd["parameter"] }).to_string())
            })
            .service("ms-loans", |request| ServiceReply::Body(command(request).to_string()))
    }

    fn gateway(broker: &Arc<InMemoryBroker>, config: GatewayConfig) -> Router {
        ApiGatewayService::new(config, Arc::clone(broker) as Arc<dyn Broker>)
            .unwrap()
            .router()
    }

    async fn send(router: &Router, method: Method, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    // =============================================================================
    // ROUND TRIPS
    // =============================================================================

    #[tokio::test]
    async fn test_books_round_trip() {
        let broker = Arc::new(InMemoryBroker::with_channels([DEFAULT_INGRESS_CHANNEL]));
        let router = library(&broker).spawn();
        let app = gateway(&broker, GatewayConfig::default());

        let (status, body) = send(&app, Method::GET, "/api/books?isbns=978-0", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([{ "isbn": "978-0", "title": "Dune" }]));

        let (status, body) = send(&app, Method::POST, "/api/books", r#"{"isbn":"42"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "created": "42" }));

        assert_eq!(router.seen().len(), 2);
        assert!(broker.channels_with_prefix(REPLY_CHANNEL_PREFIX).is_empty());
    }

    #[tokio::test]
    async fn test_users_round_trip() {
        let broker = Arc::new(InMemoryBroker::with_channels([DEFAULT_INGRESS_CHANNEL]));
        let _router = library(&broker).spawn();
        let app = gateway(&broker, GatewayConfig::default());

        let (status, body) = send(&app, Method::GET, "/api/users?ids=1,2", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ids": "1,2" }));
    }

    #[tokio::test]
    async fn test_loan_lifecycle() {
        let broker = Arc::new(InMemoryBroker::with_channels([DEFAULT_INGRESS_CHANNEL]));
        let _router = library(&broker).spawn();
        let app = gateway(&broker, GatewayConfig::default());

        let (status, lent) =
            send(&app, Method::POST, "/api/loans", r#"{"isbn":"7","userId":3}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(lent["command"], "loan");
        assert_eq!(lent["loan"]["active"], true);
        assert!(lent["loan"]["loanTimestamp"].as_str().unwrap().ends_with('Z'));

        let (_, returned) =
            send(&app, Method::PUT, "/api/loans", &lent["loan"].to_string()).await;
        assert_eq!(returned["command"], "return");
        assert_eq!(returned["loan"]["active"], false);
        assert_eq!(returned["loan"]["loanTimestamp"], lent["loan"]["loanTimestamp"]);

        let (_, history) = send(&app, Method::GET, "/api/loans?isbn=7&ids=3", "").await;
        assert_eq!(
            history,
            json!({ "command": "list_loan_history_by_isbn", "parameter": "7" })
        );

        let (_, active) = send(&app, Method::GET, "/api/loans?ids=3", "").await;
        assert_eq!(active["command"], "list_active_books_user");
    }

    #[tokio::test]
    async fn test_requests_carry_router_headers() {
        let broker = Arc::new(InMemoryBroker::with_channels([DEFAULT_INGRESS_CHANNEL]));
        let router = library(&broker).spawn();
        let app = gateway(&broker, GatewayConfig::default());

        send(&app, Method::GET, "/api/users", "").await;

        let seen = router.seen();
        let request = &seen[0];
        let hops: Vec<&str> = request.routes().filter_map(|hop| hop.destination()).collect();
        assert_eq!(hops.len(), 2);
        assert_eq!(hops[0], "ms-users");
        assert!(hops[1].starts_with(REPLY_CHANNEL_PREFIX));
        assert!(request.correlation_id().is_some());
        assert!(request.current_queue().unwrap().timestamp().is_some());
    }

    // =============================================================================
    // FAILURES
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_request_is_504() {
        let broker = Arc::new(InMemoryBroker::with_channels([DEFAULT_INGRESS_CHANNEL]));
        let _router = SimulatedRouter::new(
            Arc::clone(&broker) as Arc<dyn Broker>,
            DEFAULT_INGRESS_CHANNEL,
        )
        .service("ms-books", |_| ServiceReply::Silent)
        .spawn();

        let mut config = GatewayConfig::default();
        config.timeouts.reply = Duration::from_secs(2);
        let app = gateway(&broker, config);

        let (status, body) = send(&app, Method::GET, "/api/books", "").await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["error"]["code"], "reply_timeout");
        assert!(broker.channels_with_prefix(REPLY_CHANNEL_PREFIX).is_empty());
    }

    #[tokio::test]
    async fn test_missing_ingress_is_503() {
        let broker = Arc::new(InMemoryBroker::new());
        let app = gateway(&broker, GatewayConfig::default());

        let (status, body) = send(&app, Method::GET, "/api/users?ids=1", "").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "broker_unavailable");
        assert_eq!(broker.channel_count(), 0);
    }

    #[tokio::test]
    async fn test_admin_reports_bridge_counters() {
        let broker = Arc::new(InMemoryBroker::with_channels([DEFAULT_INGRESS_CHANNEL]));
        let _router = library(&broker).spawn();
        let app = gateway(&broker, GatewayConfig::default());

        send(&app, Method::GET, "/api/books", "").await;
        send(&app, Method::GET, "/api/users", "").await;

        let (status, stats) = send(&app, Method::GET, "/admin/bridge", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["calls"], 2);
        assert_eq!(stats["replies"], 2);
        assert_eq!(stats["in_flight"], 0);
    }
}
