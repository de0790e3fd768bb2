//! Envelope headers.
//!
//! A header is a name plus a string map. Kinds are recognised by name only;
//! unknown headers are carried through untouched.

use crate::correlation::CorrelationId;
use crate::{fields, CURRENT_QUEUE_HEADER, ID_HEADER, ROUTE_HEADER, TIMESTAMP_FORMAT};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parse format for `Timestamp`; accepts any fractional precision.
const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Recognised header kinds (by convention, not by type).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    Id,
    Route,
    CurrentQueue,
    Other,
}

/// One envelope header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Header name, e.g. `route-header`.
    pub name: String,
    /// Field map. Keys are unique; order is irrelevant.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl Header {
    /// Create a header from a name and field pairs.
    pub fn new<I, K, V>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// `id-header` carrying the correlation GUID.
    pub fn id(correlation_id: CorrelationId) -> Self {
        Self::new(ID_HEADER, [(fields::GUID, correlation_id.to_string())])
    }

    /// `route-header` for one hop.
    pub fn route(destination: impl Into<String>, active: bool) -> Self {
        let destination: String = destination.into();
        Self::new(
            ROUTE_HEADER,
            [
                (fields::DESTINATION, destination),
                (fields::ACTIVE, active.to_string()),
            ],
        )
    }

    /// `current-queue-header`, optionally stamped with a send time.
    pub fn current_queue(name: impl Into<String>, sent_at: Option<DateTime<Utc>>) -> Self {
        let name: String = name.into();
        let mut header = Self::new(CURRENT_QUEUE_HEADER, [(fields::NAME, name)]);
        if let Some(ts) = sent_at {
            header
                .fields
                .insert(fields::TIMESTAMP.to_string(), format_timestamp(ts));
        }
        header
    }

    pub fn kind(&self) -> HeaderKind {
        match self.name.as_str() {
            ID_HEADER => HeaderKind::Id,
            ROUTE_HEADER => HeaderKind::Route,
            CURRENT_QUEUE_HEADER => HeaderKind::CurrentQueue,
            _ => HeaderKind::Other,
        }
    }

    /// Look up a field value.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// `Destination` of a route header.
    pub fn destination(&self) -> Option<&str> {
        self.field(fields::DESTINATION)
    }

    /// `Active` flag of a route header. Anything but `"true"` (case-insensitive) is inactive.
    pub fn is_active(&self) -> bool {
        self.field(fields::ACTIVE)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// `Timestamp` of a current-queue header, if present and parseable.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.field(fields::TIMESTAMP)
            .and_then(|raw| parse_timestamp(raw).ok())
    }
}

/// Render a timestamp as `yyyy-MM-ddTHH:mm:ss.fffZ`.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a `Timestamp` field value.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_PARSE_FORMAT).map(|naive| naive.and_utc())
}
