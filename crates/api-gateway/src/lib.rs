#![allow(missing_docs)]

//! Rasputin API Gateway - synchronous HTTP in front of queue-connected services.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        API GATEWAY                                │
//! ├──────────────────────────────────────────────────────────────────┤
//! │   /api/books      /api/users      /api/loans      /admin/bridge   │
//! │        │               │               │                          │
//! │  ┌─────┴───────────────┴───────────────┴─────┐                    │
//! │  │   Middleware: Tracing → BodyLimit → Timeout│                    │
//! │  └─────────────────────┬─────────────────────┘                    │
//! │                        │  command body + destination               │
//! │  ┌─────────────────────┴─────────────────────┐                    │
//! │  │           Request/Reply Bridge             │                    │
//! │  │  acquire tmp-reply-<uuid> → send → receive │                    │
//! │  │  (deadline) → decode → release             │                    │
//! │  └─────────────────────┬─────────────────────┘                    │
//! └────────────────────────┼─────────────────────────────────────────┘
//!                          │  envelope on `api-router`
//!                       Broker ──→ router ──→ ms-books / ms-users / ms-loans
//!                          ↑                              │
//!                          └──── reply on tmp-reply-<uuid>┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use api_gateway::{ApiGatewayService, GatewayConfig};
//! use shared_broker::InMemoryBroker;
//!
//! let broker = Arc::new(InMemoryBroker::with_channels(["api-router"]));
//! let mut service = ApiGatewayService::new(GatewayConfig::default(), broker)?;
//! let addr = service.start().await?;
//! ```
//!
//! # Errors
//!
//! | Bridge outcome                 | HTTP |
//! |--------------------------------|------|
//! | reply body                     | 200  |
//! | invalid caller input           | 400  |
//! | malformed reply                | 502  |
//! | reply channel / broker failure | 503  |
//! | no reply before the deadline   | 504  |

#![warn(clippy::all)]
#![deny(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod domain;
pub mod handlers;
pub mod ipc;
pub mod middleware;
pub mod ports;
pub mod service;

pub use domain::{
    ApiError, ApiResult, BridgeError, BrokerConfig, ConfigError, GatewayConfig, GatewayError,
    HttpConfig, LimitsConfig, ServicesConfig, TimeoutConfig,
};
pub use ipc::{
    BridgeConfig, BridgeStats, BridgeStatsSnapshot, LatencySample, LatencySink, ReplyChannel,
    ReplyChannelManager, RequestReplyBridge, TracingLatencySink,
};
pub use ports::outbound::{Clock, SystemClock};
pub use service::ApiGatewayService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
