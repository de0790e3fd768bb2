//! # Error Types
//!
//! Codec failures. Kept separate so the bridge can tell a broken envelope from
//! an envelope that arrived without a usable body.

use thiserror::Error;

/// Errors raised while encoding or decoding an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// The bytes are not a valid envelope encoding (truncated, wrong shape).
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// No body could be extracted (empty payload, missing or null body).
    #[error("malformed body: {0}")]
    MalformedBody(String),

    /// The body cannot travel as a JSON string.
    #[error("body is not valid UTF-8 (offset {valid_up_to})")]
    BodyNotUtf8 { valid_up_to: usize },
}
