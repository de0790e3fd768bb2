//! # Shared Broker - Channel Seam Between the Gateway and the Services
//!
//! The gateway never talks to a service directly. It drops an envelope on the
//! router's ingress channel and listens on a channel of its own for the reply.
//!
//! ```text
//! ┌──────────────┐  send(api-router)   ┌──────────────┐   send(ms-*)   ┌──────────┐
//! │ API Gateway  │ ──────────────────→ │    Router    │ ─────────────→ │ Service  │
//! │              │                     └──────────────┘                └──────────┘
//! │              │  receive(tmp-reply-*)                                    │
//! │              │ ←────────────────────────────────────────────────────────┘
//! └──────────────┘
//! ```
//!
//! Only the operations the bridge needs are part of the [`Broker`] trait:
//! idempotent channel create/delete, send, and a single receive bounded by a
//! deadline. Connection management stays inside each implementation.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod broker;
pub mod memory;

pub use broker::{Broker, BrokerError};
pub use memory::{BrokerStats, InMemoryBroker};

/// Channel the router consumes from.
pub const DEFAULT_INGRESS_CHANNEL: &str = "api-router";

/// Prefix of per-request reply channels.
pub const REPLY_CHANNEL_PREFIX: &str = "tmp-reply-";
