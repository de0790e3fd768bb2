//! API Gateway service: router assembly and HTTP server lifecycle.

use crate::domain::config::GatewayConfig;
use crate::domain::error::GatewayError;
use crate::handlers::{books, loans, users, AppState};
use crate::ipc::{BridgeConfig, BridgeStatsSnapshot, RequestReplyBridge};
use crate::middleware::{TimeoutLayer, TracingLayer};
use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use shared_broker::Broker;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};

/// API Gateway service state
pub struct ApiGatewayService {
    config: GatewayConfig,
    bridge: Arc<RequestReplyBridge>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<std::io::Result<()>>>,
}

impl ApiGatewayService {
    /// Create a new API Gateway service
    pub fn new(config: GatewayConfig, broker: Arc<dyn Broker>) -> Result<Self, GatewayError> {
        let bridge = RequestReplyBridge::new(BridgeConfig::from(&config), broker);
        Self::with_bridge(config, Arc::new(bridge))
    }

    /// Create the service around an already configured bridge.
    pub fn with_bridge(
        config: GatewayConfig,
        bridge: Arc<RequestReplyBridge>,
    ) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        Ok(Self {
            config,
            bridge,
            shutdown_tx: None,
            server: None,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn bridge(&self) -> Arc<RequestReplyBridge> {
        Arc::clone(&self.bridge)
    }

    pub fn is_running(&self) -> bool {
        self.server.is_some()
    }

    /// Build the HTTP router
    pub fn router(&self) -> Router {
        let state = AppState::new(Arc::clone(&self.bridge), self.config.services.clone());

        Router::new()
            .route("/api/books", get(books::list_books).post(books::create_book))
            .route("/api/users", get(users::list_users).post(users::create_user))
            .route(
                "/api/loans",
                get(loans::list_loans)
                    .post(loans::lend_book)
                    .put(loans::return_book),
            )
            .route("/health", get(health_check))
            .route("/admin/bridge", get(bridge_stats))
            .layer(TimeoutLayer::new(&self.config.timeouts))
            .layer(RequestBodyLimitLayer::new(self.config.limits.max_request_size))
            .layer(TracingLayer::new())
            .with_state(state)
    }

    /// Bind the HTTP listener and serve in the background.
    ///
    /// Returns the bound address, which differs from the configured one when
    /// the configured port is 0.
    pub async fn start(&mut self) -> Result<SocketAddr, GatewayError> {
        if self.server.is_some() {
            return Err(GatewayError::AlreadyRunning);
        }
        if !self.config.http.enabled {
            return Err(GatewayError::Config("HTTP server is disabled".into()));
        }

        let addr = self.config.http_addr();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{addr}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| GatewayError::Bind(e.to_string()))?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let router = self.router();
        let server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        self.shutdown_tx = Some(shutdown_tx);
        self.server = Some(server);
        info!(
            addr = %local_addr,
            ingress = %self.config.broker.ingress_channel,
            "API Gateway started"
        );
        Ok(local_addr)
    }

    /// Trigger graceful shutdown and wait for in-flight requests to finish.
    pub async fn shutdown(&mut self) -> Result<(), GatewayError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        let Some(server) = self.server.take() else {
            return Ok(());
        };

        let result = match server.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(GatewayError::Serve(e.to_string())),
            Err(e) => Err(GatewayError::Serve(e.to_string())),
        };
        match &result {
            Ok(()) => info!(
                in_flight = self.bridge.stats().in_flight(),
                "API Gateway stopped"
            ),
            Err(e) => error!(error = %e, "API Gateway stopped with error"),
        }
        result
    }
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": crate::VERSION,
    }))
}

async fn bridge_stats(State(state): State<AppState>) -> Json<BridgeStatsSnapshot> {
    Json(state.bridge.stats().snapshot())
}
