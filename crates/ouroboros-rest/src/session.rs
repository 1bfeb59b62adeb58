//! Session: shared defaults plus a lazily created transport

use crate::config::{DecodePolicy, TransportConfig};
use crate::error::{sanitize_error_message, HttpError, HttpResult};
use crate::merge::{merge_headers, merge_params, resolve_credentials};
use crate::params::{Credentials, QueryParams};
use crate::payload::{encode, Encoded, Payload};
use crate::request::{Request, Slot};
use crate::response::Response;
use crate::transport::{BodyStream, ReqwestTransport, Transport, TransportRequest, TransportResponse};
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use futures::StreamExt;
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use http::Method;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Defaults shared by many requests, and the transport they go through
///
/// The transport is created on the first send and reused afterwards; a
/// request-level transport override only matters if it reaches an unused
/// session. `send` takes `&self`, so a session can serve concurrent sends
/// from several tasks; changing the public defaults needs `&mut self` and
/// therefore cannot race an in-flight send.
///
/// # Example
///
/// ```ignore
/// use ouroboros_rest::{QueryParams, Session};
///
/// #[derive(serde::Deserialize, Default)]
/// struct User { login: String }
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let session = Session::builder()
///         .basic_auth("alice", "s3cret")
///         .param("per_page", "50")
///         .build();
///
///     let mut user = User::default();
///     let mut problem = serde_json::Value::Null;
///     let resp = session
///         .get("https://api.example.com/user", None, Some(&mut user), Some(&mut problem))
///         .await?;
///     println!("{} -> {}", resp.status(), user.login);
///     Ok(())
/// }
/// ```
#[derive(Default)]
pub struct Session {
    /// Basic-auth credentials, below request credentials and above URL userinfo
    pub credentials: Option<Credentials>,

    /// Default headers, overwritten per name by request headers
    pub headers: Option<HeaderMap>,

    /// Default query parameters, lowest priority
    pub params: Option<QueryParams>,

    /// Used when the session creates its own reqwest transport
    pub config: TransportConfig,

    pub decode_policy: DecodePolicy,

    transport: OnceCell<Arc<dyn Transport>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// Session whose transport is fixed up front
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport: OnceCell::with_value(transport),
            ..Self::default()
        }
    }

    /// Whether the transport exists yet
    pub fn has_transport(&self) -> bool {
        self.transport.get().is_some()
    }

    fn transport(&self, fallback: Option<Arc<dyn Transport>>) -> HttpResult<Arc<dyn Transport>> {
        self.transport
            .get_or_try_init(|| match fallback {
                Some(transport) => Ok(transport),
                None => Ok(Arc::new(ReqwestTransport::new(&self.config)?) as Arc<dyn Transport>),
            })
            .map(Arc::clone)
    }

    /// Compose, dispatch and read one request
    ///
    /// Fails before touching the transport when the URL, method, a header
    /// or the payload is unusable. Transport and body-read failures are
    /// returned as they come; nothing is retried.
    pub async fn send(&self, mut request: Request<'_>) -> HttpResult<Response> {
        if let Some(err) = request.take_pending_error() {
            tracing::error!("Request rejected: {}", err);
            return Err(err);
        }

        let method = normalize_method(&request.method)?;

        let mut url = Url::parse(&request.url).map_err(|e| {
            tracing::error!(
                url = %sanitize_error_message(&request.url),
                "Malformed URL: {}",
                e
            );
            HttpError::from(e)
        })?;

        let params = merge_params(
            self.params.as_ref(),
            &QueryParams::from_url(&url),
            request.params.as_ref(),
        );
        let query = params.encode();
        url.set_query(if query.is_empty() { None } else { Some(query.as_str()) });

        // Userinfo travels as basic auth, never inside the URL
        let url_credentials = Credentials::from_url(&url);
        if url_credentials.is_some() {
            // Only cannot-be-a-base URLs reject these, and those carry no userinfo
            let stripped = url.set_username("").and(url.set_password(None));
            debug_assert!(stripped.is_ok());
        }

        let mut headers = merge_headers(self.headers.as_ref(), request.headers.as_ref());

        let Encoded {
            body,
            looks_like_json,
        } = match request.payload.take() {
            Some(payload) => encode_payload(payload)?,
            None => Encoded::default(),
        };
        if looks_like_json && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let basic_auth = resolve_credentials(
            url_credentials,
            self.credentials.as_ref(),
            request.credentials.as_ref(),
        );
        if basic_auth.is_some() && url.scheme() != "https" {
            tracing::warn!(url = %url, "Using HTTP Basic Auth in cleartext is insecure");
        }

        let transport = self.transport(request.transport.take())?;

        let timestamp = Utc::now();
        let start = Instant::now();
        tracing::debug!(method = %method, url = %url, "Sending request");

        let TransportResponse { raw, body: stream } = transport
            .execute(TransportRequest {
                method: method.clone(),
                url: url.clone(),
                headers,
                body,
                basic_auth,
            })
            .await
            .map_err(|e| {
                tracing::error!(method = %method, url = %url, "Request failed: {}", e.sanitized_message());
                e
            })?;

        let status = raw.status;
        let (body, body_stream) = if request.skip_body {
            (Bytes::new(), Some(stream))
        } else {
            let body = read_body(stream).await.map_err(|e| {
                tracing::error!(status, url = %url, "Failed to read response body: {}", e);
                e
            })?;
            (body, None)
        };

        let latency = start.elapsed();
        tracing::debug!(
            status,
            latency_ms = latency.as_millis() as u64,
            "Request completed"
        );

        if !body.is_empty() {
            let slot = if status <= 200 {
                request.result.take()
            } else {
                request.error.take()
            };
            if let Some(slot) = slot {
                self.decode_into(status, &body, slot)?;
            }
        }

        Ok(Response {
            method,
            url,
            params,
            timestamp,
            latency,
            raw,
            body,
            body_stream,
        })
    }

    fn decode_into(&self, status: u16, body: &[u8], slot: Slot<'_>) -> HttpResult<()> {
        match slot.decode_json(body) {
            Ok(()) => Ok(()),
            Err(source) => match self.decode_policy {
                DecodePolicy::Swallow => {
                    tracing::debug!(status, "Ignoring undecodable response body: {}", source);
                    Ok(())
                }
                DecodePolicy::Surface => Err(HttpError::Decode { status, source }),
            },
        }
    }

    /// Send a GET request
    pub async fn get<'a>(
        &self,
        url: &str,
        params: Option<QueryParams>,
        result: Option<Slot<'a>>,
        error: Option<Slot<'a>>,
    ) -> HttpResult<Response> {
        let mut request = Request::new(Method::GET.as_str(), url);
        request.params = params;
        request.result = result;
        request.error = error;
        self.send(request).await
    }

    /// Send an OPTIONS request
    pub async fn options<'a>(
        &self,
        url: &str,
        result: Option<Slot<'a>>,
        error: Option<Slot<'a>>,
    ) -> HttpResult<Response> {
        let mut request = Request::new(Method::OPTIONS.as_str(), url);
        request.result = result;
        request.error = error;
        self.send(request).await
    }

    /// Send a HEAD request
    pub async fn head<'a>(
        &self,
        url: &str,
        result: Option<Slot<'a>>,
        error: Option<Slot<'a>>,
    ) -> HttpResult<Response> {
        let mut request = Request::new(Method::HEAD.as_str(), url);
        request.result = result;
        request.error = error;
        self.send(request).await
    }

    /// Send a POST request
    pub async fn post<'a>(
        &self,
        url: &str,
        payload: impl Into<Payload>,
        result: Option<Slot<'a>>,
        error: Option<Slot<'a>>,
    ) -> HttpResult<Response> {
        self.send_with_payload(Method::POST, url, payload.into(), result, error)
            .await
    }

    /// Send a PUT request
    pub async fn put<'a>(
        &self,
        url: &str,
        payload: impl Into<Payload>,
        result: Option<Slot<'a>>,
        error: Option<Slot<'a>>,
    ) -> HttpResult<Response> {
        self.send_with_payload(Method::PUT, url, payload.into(), result, error)
            .await
    }

    /// Send a PATCH request
    pub async fn patch<'a>(
        &self,
        url: &str,
        payload: impl Into<Payload>,
        result: Option<Slot<'a>>,
        error: Option<Slot<'a>>,
    ) -> HttpResult<Response> {
        self.send_with_payload(Method::PATCH, url, payload.into(), result, error)
            .await
    }

    /// Send a DELETE request
    pub async fn delete<'a>(
        &self,
        url: &str,
        params: Option<QueryParams>,
        result: Option<Slot<'a>>,
        error: Option<Slot<'a>>,
    ) -> HttpResult<Response> {
        let mut request = Request::new(Method::DELETE.as_str(), url);
        request.params = params;
        request.result = result;
        request.error = error;
        self.send(request).await
    }

    async fn send_with_payload<'a>(
        &self,
        method: Method,
        url: &str,
        payload: Payload,
        result: Option<Slot<'a>>,
        error: Option<Slot<'a>>,
    ) -> HttpResult<Response> {
        let mut request = Request::new(method.as_str(), url).payload(payload);
        request.result = result;
        request.error = error;
        self.send(request).await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("credentials", &self.credentials)
            .field("headers", &self.headers)
            .field("params", &self.params)
            .field("decode_policy", &self.decode_policy)
            .field("has_transport", &self.has_transport())
            .finish()
    }
}

/// Builds a [`Session`] whose defaults are fixed once built
#[derive(Default)]
pub struct SessionBuilder {
    session: Session,
}

impl SessionBuilder {
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.session.credentials = Some(credentials);
        self
    }

    pub fn basic_auth(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials(Credentials::new(username, password))
    }

    /// Add a default header, replacing an earlier one with the same name
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.session
            .headers
            .get_or_insert_with(HeaderMap::new)
            .insert(name, value);
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.session.headers = Some(headers);
        self
    }

    /// Add a default query parameter value
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.session
            .params
            .get_or_insert_with(QueryParams::new)
            .add(name, value);
        self
    }

    pub fn params(mut self, params: QueryParams) -> Self {
        self.session.params = Some(params);
        self
    }

    pub fn config(mut self, config: TransportConfig) -> Self {
        self.session.config = config;
        self
    }

    pub fn decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.session.decode_policy = policy;
        self
    }

    /// Use this transport instead of creating one
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.session.transport = OnceCell::with_value(transport);
        self
    }

    pub fn build(self) -> Session {
        self.session
    }
}

/// Upper-case the method token; empty means GET
fn normalize_method(method: &str) -> HttpResult<Method> {
    let upper = method.trim().to_uppercase();
    if upper.is_empty() {
        return Ok(Method::GET);
    }
    Method::from_bytes(upper.as_bytes())
        .map_err(|e| HttpError::InvalidRequest(format!("method {:?}: {}", method, e)))
}

fn encode_payload(payload: Payload) -> HttpResult<Encoded> {
    encode(payload).map_err(|e| {
        tracing::error!("Payload encoding failed: {}", e);
        e
    })
}

/// Drain the body into memory; the stream is dropped on every return path
async fn read_body(mut stream: BodyStream) -> HttpResult<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}
