//! ouroboros-rest: JSON REST calls with layered defaults
//!
//! A thin layer over reqwest that composes a request from session defaults
//! and per-request overrides, encodes the payload, sends it once, and decodes
//! the JSON body into caller-supplied result or error slots.
//!
//! # Architecture
//!
//! - `Session`: default credentials, headers and query parameters, plus a
//!   transport created on first use
//! - `Request`: one outbound request, consumed by `Session::send`
//! - `Response`: status, timing, raw body and on-demand JSON decoding
//! - `merge`: precedence rules between session, URL and request layers
//! - `payload`: turns a `Payload` into a body and a JSON content-type hint
//! - `transport`: the `Transport` trait and its reqwest implementation
//! - `api`: one-shot functions that use a throwaway session
//!
//! Parameter precedence, lowest first: session defaults, the URL's own
//! query, the request's params. Credentials: URL userinfo, session,
//! request.

pub mod api;
pub mod config;
pub mod error;
pub mod merge;
pub mod params;
pub mod payload;
pub mod request;
pub mod response;
pub mod session;
pub mod transport;

pub use api::{delete, get, head, options, patch, post, put, send};
pub use config::{DecodePolicy, TransportConfig};
pub use error::{HttpError, HttpErrorCategory, HttpResult};
pub use params::{Credentials, QueryParams};
pub use payload::{Payload, PayloadStream};
pub use request::{Destination, Request, Slot};
pub use response::Response;
pub use session::{Session, SessionBuilder};
pub use transport::{
    BodyStream, RawResponse, ReqwestTransport, Transport, TransportRequest, TransportResponse,
};
