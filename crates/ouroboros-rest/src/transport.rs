//! The network collaborator a session dispatches through
//!
//! [`Transport`] is the only place I/O happens. [`ReqwestTransport`] is the
//! default; tests and embedders can supply their own.

use crate::config::TransportConfig;
use crate::error::{HttpError, HttpResult};
use crate::params::Credentials;
use crate::payload::EncodedBody;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use http::{HeaderMap, Method, Version};
use url::Url;

/// Response body as a stream of chunks
pub type BodyStream = BoxStream<'static, HttpResult<Bytes>>;

/// Fully composed request, ready for the wire
#[derive(Debug)]
pub struct TransportRequest {
    pub method: Method,
    /// Final URL with merged query string and no userinfo
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<EncodedBody>,
    pub basic_auth: Option<Credentials>,
}

/// Status line and headers of a response, without the body
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub version: Version,
    pub headers: HeaderMap,
    /// URL that produced the response, after redirects
    pub url: Url,
}

/// What a transport hands back: metadata plus an unread body
pub struct TransportResponse {
    pub raw: RawResponse,
    pub body: BodyStream,
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("raw", &self.raw)
            .finish_non_exhaustive()
    }
}

/// Executes one request, no retries
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: TransportRequest) -> HttpResult<TransportResponse>;
}

/// [`Transport`] backed by a pooled `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client from configuration
    pub fn new(config: &TransportConfig) -> HttpResult<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .user_agent(&config.user_agent)
            .gzip(config.gzip);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        if config.follow_redirects {
            builder = builder.redirect(reqwest::redirect::Policy::limited(config.max_redirects));
        } else {
            builder = builder.redirect(reqwest::redirect::Policy::none());
        }

        // Danger: Accept invalid certificates (testing only)
        if config.danger_accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Wrap an already configured client
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: TransportRequest) -> HttpResult<TransportResponse> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);

        if let Some(creds) = request.basic_auth {
            builder = builder.basic_auth(creds.username, creds.password);
        }

        builder = match request.body {
            Some(EncodedBody::Bytes(bytes)) => builder.body(bytes),
            Some(EncodedBody::Stream(stream)) => builder.body(reqwest::Body::wrap_stream(stream)),
            None => builder,
        };

        let response = builder.send().await?;

        let raw = RawResponse {
            status: response.status().as_u16(),
            version: response.version(),
            headers: response.headers().clone(),
            url: response.url().clone(),
        };
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(HttpError::from))
            .boxed();

        Ok(TransportResponse { raw, body })
    }
}
