//! Middleware stack for the gateway.
//!
//! Layer order: Request → Tracing → BodyLimit → Timeout → Handler

pub mod timeout;
pub mod tracing;

pub use self::timeout::TimeoutLayer;
pub use self::tracing::TracingLayer;
