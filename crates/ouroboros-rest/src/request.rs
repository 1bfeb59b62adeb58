//! Request description and decode destinations

use crate::error::HttpError;
use crate::params::{Credentials, QueryParams};
use crate::payload::Payload;
use crate::transport::Transport;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Somewhere a JSON response body can be decoded into
///
/// Implemented for every `DeserializeOwned + Send` type, so a `&mut T` can be
/// handed to a request as its result or error slot.
pub trait Destination: Send {
    fn decode_json(&mut self, body: &[u8]) -> serde_json::Result<()>;
}

impl<T: DeserializeOwned + Send> Destination for T {
    fn decode_json(&mut self, body: &[u8]) -> serde_json::Result<()> {
        *self = serde_json::from_slice(body)?;
        Ok(())
    }
}

/// Borrowed decode slot
pub type Slot<'a> = &'a mut dyn Destination;

/// Everything needed to send one request
///
/// Consumed by [`Session::send`](crate::Session::send), which returns a
/// [`Response`](crate::Response). The result and error slots stay borrowed
/// until then.
pub struct Request<'a> {
    pub url: String,
    /// Upper-cased before sending
    pub method: String,
    /// Overrides session defaults and the URL's own query
    pub params: Option<QueryParams>,
    pub payload: Option<Payload>,
    /// Filled from the body when status <= 200
    pub result: Option<Slot<'a>>,
    /// Filled from the body when status > 200
    pub error: Option<Slot<'a>>,
    /// Leave the body unread, e.g. for HEAD
    pub skip_body: bool,
    pub credentials: Option<Credentials>,
    pub headers: Option<HeaderMap>,
    /// Used only if the session has not created its transport yet
    pub transport: Option<Arc<dyn Transport>>,
    pending_error: Option<HttpError>,
}

impl<'a> Request<'a> {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            params: None,
            payload: None,
            result: None,
            error: None,
            skip_body: false,
            credentials: None,
            headers: None,
            transport: None,
            pending_error: None,
        }
    }

    /// Replace the request-level query parameters
    pub fn params(mut self, params: QueryParams) -> Self {
        self.params = Some(params);
        self
    }

    /// Add one request-level query parameter
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.get_or_insert_with(QueryParams::new).add(name, value);
        self
    }

    /// Set a request header
    ///
    /// An invalid name or value is reported when the request is sent.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        let parsed = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| format!("header name {:?}: {}", name, e))
            .and_then(|n| {
                HeaderValue::from_str(value)
                    .map(|v| (n, v))
                    .map_err(|e| format!("header {:?} value: {}", name, e))
            });
        match parsed {
            Ok((n, v)) => {
                self.headers.get_or_insert_with(HeaderMap::new).insert(n, v);
            }
            Err(msg) => self.defer(HttpError::InvalidRequest(msg)),
        }
        self
    }

    /// Replace the request-level headers
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn payload(mut self, payload: impl Into<Payload>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Serialize `value` as the JSON payload
    ///
    /// A serialization failure is reported when the request is sent, before
    /// anything reaches the transport.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match Payload::json(value) {
            Ok(payload) => self.payload = Some(payload),
            Err(e) => self.defer(e),
        }
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    pub fn result(mut self, slot: Slot<'a>) -> Self {
        self.result = Some(slot);
        self
    }

    pub fn error(mut self, slot: Slot<'a>) -> Self {
        self.error = Some(slot);
        self
    }

    pub fn skip_body(mut self, skip: bool) -> Self {
        self.skip_body = skip;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    // First failure wins
    fn defer(&mut self, err: HttpError) {
        if self.pending_error.is_none() {
            self.pending_error = Some(err);
        }
    }

    pub(crate) fn take_pending_error(&mut self) -> Option<HttpError> {
        self.pending_error.take()
    }
}

impl fmt::Debug for Request<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("params", &self.params)
            .field("payload", &self.payload)
            .field("has_result", &self.result.is_some())
            .field("has_error", &self.error.is_some())
            .field("skip_body", &self.skip_body)
            .field("credentials", &self.credentials)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}
