//! Request payloads and their encoding into a body
//!
//! A [`Payload`] says what kind of data the caller has; [`encode`] turns it
//! into an [`EncodedBody`] and reports whether the bytes look like JSON.
//!
//! | Payload            | Body                                   |
//! |--------------------|----------------------------------------|
//! | `Stream`           | passed through untouched               |
//! | `Bytes`            | the bytes as given                     |
//! | `Text`             | UTF-8 bytes, no quoting                |
//! | `Json` object/array| `serde_json` serialization, as written |
//! | `Json` string      | the string's UTF-8 bytes, no quoting   |
//! | anything else/empty| no body                                |

use crate::error::{HttpError, HttpResult};
use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Byte stream accepted as a request body
pub type PayloadStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Data to send as the request body
pub enum Payload {
    /// Raw bytes
    Bytes(Bytes),
    /// UTF-8 text, sent as-is
    Text(String),
    /// Serialized JSON text, produced by [`Payload::json`]
    Json(Bytes),
    /// Already a byte source
    Stream(PayloadStream),
}

impl Payload {
    /// Serialize any `Serialize` value into a JSON payload
    ///
    /// Serializes straight to bytes, so struct fields keep their declared
    /// order on the wire.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> HttpResult<Self> {
        serde_json::to_vec(value)
            .map(|bytes| Payload::Json(Bytes::from(bytes)))
            .map_err(HttpError::Serialize)
    }

    /// Wrap a byte stream
    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = std::io::Result<Bytes>> + Send + 'static,
    {
        Payload::Stream(stream.boxed())
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Payload::Text(t) => f.debug_tuple("Text").field(t).finish(),
            Payload::Json(b) => f
                .debug_tuple("Json")
                .field(&String::from_utf8_lossy(b))
                .finish(),
            Payload::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Payload {
    fn from(bytes: &'static [u8]) -> Self {
        Payload::Bytes(Bytes::from_static(bytes))
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(Bytes::from(value.to_string()))
    }
}

/// Body handed to the transport
pub enum EncodedBody {
    Bytes(Bytes),
    Stream(PayloadStream),
}

impl EncodedBody {
    /// The bytes, if this body is not a stream
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            EncodedBody::Bytes(b) => Some(b),
            EncodedBody::Stream(_) => None,
        }
    }
}

impl fmt::Debug for EncodedBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodedBody::Bytes(b) => f.debug_tuple("Bytes").field(b).finish(),
            EncodedBody::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Result of encoding a payload
#[derive(Debug, Default)]
pub struct Encoded {
    pub body: Option<EncodedBody>,
    /// Body bytes are bracketed like a JSON object or array
    pub looks_like_json: bool,
}

/// Encode a payload into a request body
pub fn encode(payload: Payload) -> HttpResult<Encoded> {
    let bytes = match payload {
        Payload::Stream(stream) => {
            return Ok(Encoded {
                body: Some(EncodedBody::Stream(stream)),
                looks_like_json: false,
            })
        }
        Payload::Bytes(bytes) => bytes,
        Payload::Text(text) => Bytes::from(text),
        Payload::Json(json) => match json.first() {
            Some(b'{' | b'[') => json,
            Some(b'"') => {
                let text: String = serde_json::from_slice(&json).map_err(HttpError::Serialize)?;
                Bytes::from(text)
            }
            _ => {
                tracing::trace!(
                    "Payload {} has no body encoding, sending none",
                    String::from_utf8_lossy(&json)
                );
                Bytes::new()
            }
        },
    };

    if bytes.is_empty() {
        return Ok(Encoded::default());
    }

    let looks_like_json = is_bracketed(&bytes);
    Ok(Encoded {
        body: Some(EncodedBody::Bytes(bytes)),
        looks_like_json,
    })
}

fn is_bracketed(bytes: &[u8]) -> bool {
    matches!(
        (bytes.first(), bytes.last()),
        (Some(b'{'), Some(b'}')) | (Some(b'['), Some(b']'))
    )
}
