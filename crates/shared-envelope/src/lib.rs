//! # Shared Envelope
//!
//! The envelope is the only thing the gateway and the Rasputin microservices
//! agree on: an ordered list of headers plus an opaque body.
//!
//! ## Wire Contract (router-facing)
//!
//! ```text
//! {
//!   "headers": [
//!     { "name": "id-header",            "fields": { "GUID": "…" } },
//!     { "name": "route-header",         "fields": { "Destination": "ms-books", "Active": "true" } },
//!     { "name": "route-header",         "fields": { "Destination": "tmp-reply-…", "Active": "true" } },
//!     { "name": "current-queue-header", "fields": { "Name": "api-router", "Timestamp": "…Z" } }
//!   ],
//!   "body": "<opaque string>"
//! }
//! ```
//!
//! - Header sequence order is significant and preserved exactly.
//! - Field order inside a header is irrelevant.
//! - The body is never interpreted here.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod codec;
pub mod correlation;
pub mod envelope;
pub mod errors;
pub mod header;

pub use codec::{decode, encode};
pub use correlation::CorrelationId;
pub use envelope::{Envelope, EnvelopeBuilder};
pub use errors::EnvelopeError;
pub use header::{format_timestamp, parse_timestamp, Header, HeaderKind};

/// Header carrying the correlation GUID.
pub const ID_HEADER: &str = "id-header";

/// Header naming one hop of the route.
pub const ROUTE_HEADER: &str = "route-header";

/// Header naming the channel that most recently handled the envelope.
pub const CURRENT_QUEUE_HEADER: &str = "current-queue-header";

/// Field keys used inside headers.
pub mod fields {
    pub const GUID: &str = "GUID";
    pub const DESTINATION: &str = "Destination";
    pub const ACTIVE: &str = "Active";
    pub const NAME: &str = "Name";
    pub const TIMESTAMP: &str = "Timestamp";
}

/// `chrono` format for `Timestamp` (`yyyy-MM-ddTHH:mm:ss.fffZ`).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";
