//! Executed request view

use crate::error::{HttpError, HttpResult};
use crate::params::QueryParams;
use crate::transport::{BodyStream, RawResponse};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Method};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// A request that has been sent, with what came back
///
/// The body is held in memory, so [`unmarshal`](Self::unmarshal) can be
/// called any number of times.
pub struct Response {
    pub(crate) method: Method,
    pub(crate) url: Url,
    pub(crate) params: QueryParams,
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) latency: Duration,
    pub(crate) raw: RawResponse,
    pub(crate) body: Bytes,
    pub(crate) body_stream: Option<BodyStream>,
}

impl Response {
    /// Wall-clock time just before dispatch
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Time from dispatch until the body was read (or headers arrived, when
    /// body capture was skipped)
    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// URL as sent, including the merged query string
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Query parameters that were actually sent
    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    pub fn status(&self) -> u16 {
        self.raw.status
    }

    /// True for any status up to and including 300
    pub fn status_ok(&self) -> bool {
        self.raw.status <= 300
    }

    /// Raw response body, empty when body capture was skipped
    pub fn raw_bytes(&self) -> &[u8] {
        &self.body
    }

    /// Body as text with surrounding whitespace trimmed
    pub fn raw_text(&self) -> String {
        String::from_utf8_lossy(&self.body).trim().to_string()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.raw.headers
    }

    /// First value of a response header, if it is valid text
    pub fn header(&self, name: &str) -> Option<&str> {
        self.raw.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Declared Content-Type, ignoring parameters, ends in `json`
    pub fn is_json_mime(&self) -> bool {
        self.header(CONTENT_TYPE.as_str())
            .and_then(|ct| ct.split(';').next())
            .map(|mime| mime.trim().ends_with("json"))
            .unwrap_or(false)
    }

    /// Status line and headers as returned by the transport
    pub fn raw_response(&self) -> &RawResponse {
        &self.raw
    }

    /// Decode the body as JSON into a fresh `T`
    pub fn unmarshal<T: DeserializeOwned>(&self) -> HttpResult<T> {
        serde_json::from_slice(&self.body).map_err(|source| HttpError::Decode {
            status: self.raw.status,
            source,
        })
    }

    /// The unread body, present only when body capture was skipped
    pub fn into_body_stream(self) -> Option<BodyStream> {
        self.body_stream
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("status", &self.raw.status)
            .field("timestamp", &self.timestamp)
            .field("latency", &self.latency)
            .field("body_len", &self.body.len())
            .field("body_stream", &self.body_stream.is_some())
            .finish()
    }
}
