//! # Envelope
//!
//! One envelope per request/reply leg. Built once, never mutated: the
//! `with_*` methods consume the envelope and hand back a new one.

use crate::correlation::CorrelationId;
use crate::header::{Header, HeaderKind};
use crate::fields;
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Ordered headers plus an opaque body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    headers: Vec<Header>,
    body: Bytes,
}

impl Envelope {
    pub fn new(headers: Vec<Header>, body: impl Into<Bytes>) -> Self {
        Self {
            headers,
            body: body.into(),
        }
    }

    pub fn builder() -> EnvelopeBuilder {
        EnvelopeBuilder::default()
    }

    /// Build a request in the router's header shape:
    /// `id-header`, service `route-header`, reply `route-header`, `current-queue-header`.
    pub fn request(
        correlation_id: CorrelationId,
        destination: &str,
        reply_channel: &str,
        current_queue: &str,
        sent_at: Option<DateTime<Utc>>,
        body: impl Into<Bytes>,
    ) -> Self {
        Self::builder()
            .header(Header::id(correlation_id))
            .header(Header::route(destination, true))
            .header(Header::route(reply_channel, true))
            .header(Header::current_queue(current_queue, sent_at))
            .body(body)
            .build()
    }

    /// Build the reply leg for this envelope: same `id-header`, new body.
    ///
    /// Used by services (and test doubles of them) answering a request.
    pub fn reply(
        &self,
        current_queue: &str,
        sent_at: Option<DateTime<Utc>>,
        body: impl Into<Bytes>,
    ) -> Self {
        let mut builder = Self::builder();
        if let Some(id) = self.find(HeaderKind::Id) {
            builder = builder.header(id.clone());
        }
        builder
            .header(Header::current_queue(current_queue, sent_at))
            .body(body)
            .build()
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Raw `GUID` of the first `id-header`.
    pub fn guid(&self) -> Option<&str> {
        self.find(HeaderKind::Id).and_then(|h| h.field(fields::GUID))
    }

    /// Parsed correlation ID, if the `GUID` is a valid UUID.
    pub fn correlation_id(&self) -> Option<CorrelationId> {
        self.guid().and_then(|g| CorrelationId::parse(g).ok())
    }

    /// Route headers in traversal order.
    pub fn routes(&self) -> impl Iterator<Item = &Header> {
        self.headers
            .iter()
            .filter(|h| h.kind() == HeaderKind::Route)
    }

    /// Destination of the last route hop (the reply channel on requests).
    pub fn reply_destination(&self) -> Option<&str> {
        self.routes().last().and_then(Header::destination)
    }

    pub fn current_queue(&self) -> Option<&Header> {
        self.find(HeaderKind::CurrentQueue)
    }

    /// Point the final reply hop at `channel`.
    ///
    /// With two or more route headers the last one is rewritten in place and
    /// marked active; otherwise a new active hop is appended after the existing routes.
    pub fn with_reply_channel(mut self, channel: &str) -> Self {
        let route_positions: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| h.kind() == HeaderKind::Route)
            .map(|(i, _)| i)
            .collect();

        match route_positions.as_slice() {
            [.., _, last] => {
                let hop = &mut self.headers[*last].fields;
                hop.insert(fields::DESTINATION.to_string(), channel.to_string());
                hop.insert(fields::ACTIVE.to_string(), "true".to_string());
            }
            [only] => self.headers.insert(only + 1, Header::route(channel, true)),
            [] => {
                let at = self
                    .headers
                    .iter()
                    .position(|h| h.kind() == HeaderKind::CurrentQueue)
                    .unwrap_or(self.headers.len());
                self.headers.insert(at, Header::route(channel, true));
            }
        }
        self
    }

    /// Name `queue` in the `current-queue-header`, appending one when absent.
    pub fn with_current_queue(mut self, queue: &str) -> Self {
        self.current_queue_mut(queue);
        self
    }

    /// Name `queue` in the `current-queue-header` and stamp it with the send
    /// time, appending the header when absent.
    pub fn with_send_stamp(mut self, queue: &str, sent_at: DateTime<Utc>) -> Self {
        self.current_queue_mut(queue).fields.insert(
            fields::TIMESTAMP.to_string(),
            crate::header::format_timestamp(sent_at),
        );
        self
    }

    fn current_queue_mut(&mut self, queue: &str) -> &mut Header {
        let at = match self
            .headers
            .iter()
            .position(|h| h.kind() == HeaderKind::CurrentQueue)
        {
            Some(at) => at,
            None => {
                self.headers.push(Header::current_queue(queue, None));
                self.headers.len() - 1
            }
        };
        let header = &mut self.headers[at];
        header
            .fields
            .insert(fields::NAME.to_string(), queue.to_string());
        header
    }

    fn find(&self, kind: HeaderKind) -> Option<&Header> {
        self.headers.iter().find(|h| h.kind() == kind)
    }
}

/// Builder for [`Envelope`].
#[derive(Debug, Default)]
pub struct EnvelopeBuilder {
    headers: Vec<Header>,
    body: Bytes,
}

impl EnvelopeBuilder {
    pub fn header(mut self, header: Header) -> Self {
        self.headers.push(header);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Envelope {
        Envelope {
            headers: self.headers,
            body: self.body,
        }
    }
}
