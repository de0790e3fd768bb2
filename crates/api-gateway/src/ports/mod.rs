//! Ports the gateway depends on besides the broker.

pub mod outbound;

pub use outbound::{Clock, SystemClock};
