//! One-shot functions
//!
//! Each call builds a fresh default [`Session`], so nothing is shared between
//! calls, connections included. Keep a `Session` around to reuse its
//! transport or to decode into result and error slots.

use crate::error::HttpResult;
use crate::params::QueryParams;
use crate::payload::Payload;
use crate::request::Request;
use crate::response::Response;
use crate::session::Session;

/// Send a fully described request
pub async fn send(request: Request<'_>) -> HttpResult<Response> {
    Session::new().send(request).await
}

/// Send a GET request
pub async fn get(url: &str, params: Option<QueryParams>) -> HttpResult<Response> {
    Session::new().get(url, params, None, None).await
}

/// Send an OPTIONS request
pub async fn options(url: &str) -> HttpResult<Response> {
    Session::new().options(url, None, None).await
}

/// Send a HEAD request
pub async fn head(url: &str) -> HttpResult<Response> {
    Session::new().head(url, None, None).await
}

/// Send a POST request
pub async fn post(url: &str, payload: impl Into<Payload>) -> HttpResult<Response> {
    Session::new().post(url, payload, None, None).await
}

/// Send a PUT request
pub async fn put(url: &str, payload: impl Into<Payload>) -> HttpResult<Response> {
    Session::new().put(url, payload, None, None).await
}

/// Send a PATCH request
pub async fn patch(url: &str, payload: impl Into<Payload>) -> HttpResult<Response> {
    Session::new().patch(url, payload, None, None).await
}

/// Send a DELETE request
pub async fn delete(url: &str, params: Option<QueryParams>) -> HttpResult<Response> {
    Session::new().delete(url, params, None, None).await
}
