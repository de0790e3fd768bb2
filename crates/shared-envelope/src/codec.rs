//! # Wire Codec
//!
//! UTF-8 JSON with camelCase members, the body travelling as a JSON string.
//! Classification of decode failures:
//!
//! | Payload                                  | Error               |
//! |------------------------------------------|---------------------|
//! | empty / whitespace only / not UTF-8      | `MalformedBody`     |
//! | JSON syntax error, truncated, wrong shape| `MalformedEnvelope` |
//! | valid envelope, `body` missing or null   | `MalformedBody`     |

use crate::envelope::Envelope;
use crate::errors::EnvelopeError;
use crate::header::Header;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvelopeRef<'a> {
    headers: &'a [Header],
    body: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvelope {
    headers: Vec<Header>,
    #[serde(default)]
    body: Option<String>,
}

/// Encode an envelope for the broker.
///
/// Fails only when the body is not UTF-8 and so cannot be carried as a JSON string.
pub fn encode(envelope: &Envelope) -> Result<Bytes, EnvelopeError> {
    let body = std::str::from_utf8(envelope.body()).map_err(|e| EnvelopeError::BodyNotUtf8 {
        valid_up_to: e.valid_up_to(),
    })?;

    let wire = WireEnvelopeRef {
        headers: envelope.headers(),
        body,
    };

    serde_json::to_vec(&wire)
        .map(Bytes::from)
        .map_err(|e| EnvelopeError::MalformedEnvelope(e.to_string()))
}

/// Decode bytes received from the broker.
pub fn decode(bytes: &[u8]) -> Result<Envelope, EnvelopeError> {
    let text = std::str::from_utf8(bytes).map_err(|e| {
        EnvelopeError::MalformedBody(format!("payload is not UTF-8 (offset {})", e.valid_up_to()))
    })?;

    if text.trim().is_empty() {
        return Err(EnvelopeError::MalformedBody("empty payload".into()));
    }

    let wire: WireEnvelope =
        serde_json::from_str(text).map_err(|e| EnvelopeError::MalformedEnvelope(e.to_string()))?;

    let body = wire
        .body
        .ok_or_else(|| EnvelopeError::MalformedBody("envelope carries no body".into()))?;

    Ok(Envelope::new(wire.headers, body))
}
