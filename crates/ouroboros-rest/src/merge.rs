//! Layering of session defaults, URL contents and request overrides
//!
//! Each function takes the layers from lowest to highest priority and
//! returns the effective value. A later layer's entry for a key replaces the
//! earlier entry for that key entirely; keys are never merged value-wise.

use crate::params::{Credentials, QueryParams};
use http::header::{HeaderMap, HeaderValue, ACCEPT};

/// Default `Accept` header when neither layer supplies one
pub const DEFAULT_ACCEPT: &str = "*/*";

/// Effective query parameters: session defaults, then the URL's own query,
/// then the request override
pub fn merge_params(
    session: Option<&QueryParams>,
    url: &QueryParams,
    request: Option<&QueryParams>,
) -> QueryParams {
    let mut merged = QueryParams::new();
    for layer in [session, Some(url), request].into_iter().flatten() {
        for (name, values) in layer.iter() {
            merged.insert_all(name.to_string(), values.to_vec());
        }
    }
    merged
}

/// Effective headers: session defaults overwritten by request headers
///
/// Only the first value of each header name is carried over from either
/// layer. `Accept` falls back to [`DEFAULT_ACCEPT`].
pub fn merge_headers(session: Option<&HeaderMap>, request: Option<&HeaderMap>) -> HeaderMap {
    let mut merged = HeaderMap::new();
    for layer in [session, request].into_iter().flatten() {
        for name in layer.keys() {
            if let Some(value) = layer.get(name) {
                merged.insert(name.clone(), value.clone());
            }
        }
    }
    if !merged.contains_key(ACCEPT) {
        merged.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
    }
    merged
}

/// Credentials to send: request beats session beats URL userinfo
pub fn resolve_credentials(
    url: Option<Credentials>,
    session: Option<&Credentials>,
    request: Option<&Credentials>,
) -> Option<Credentials> {
    request.or(session).cloned().or(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{CONTENT_TYPE, USER_AGENT};

    #[test]
    fn test_params_precedence_per_key() {
        let session = QueryParams::from([("a", "session"), ("b", "session"), ("c", "session")]);
        let url = QueryParams::from([("b", "url"), ("c", "url")]);
        let request = QueryParams::from([("c", "request")]);

        let merged = merge_params(Some(&session), &url, Some(&request));

        assert_eq!(merged.get("a"), Some("session"));
        assert_eq!(merged.get("b"), Some("url"));
        assert_eq!(merged.get("c"), Some("request"));
    }

    #[test]
    fn test_later_layer_replaces_whole_value_set() {
        let session = QueryParams::from([("tag", "x"), ("tag", "y")]);
        let request = QueryParams::from([("tag", "z")]);

        let merged = merge_params(Some(&session), &QueryParams::new(), Some(&request));
        assert_eq!(merged.get_all("tag"), &["z".to_string()]);
    }

    #[test]
    fn test_params_with_no_layers() {
        let merged = merge_params(None, &QueryParams::new(), None);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_headers_request_overrides_session() {
        let mut session = HeaderMap::new();
        session.insert(USER_AGENT, HeaderValue::from_static("session-agent"));
        session.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let mut request = HeaderMap::new();
        request.insert(CONTENT_TYPE, HeaderValue::from_static("application/xml"));

        let merged = merge_headers(Some(&session), Some(&request));

        assert_eq!(merged.get(USER_AGENT).unwrap(), "session-agent");
        assert_eq!(merged.get(CONTENT_TYPE).unwrap(), "application/xml");
        assert_eq!(merged.get(ACCEPT).unwrap(), DEFAULT_ACCEPT);
    }

    #[test]
    fn test_headers_first_value_wins_within_layer() {
        let mut request = HeaderMap::new();
        request.append("x-trace", HeaderValue::from_static("one"));
        request.append("x-trace", HeaderValue::from_static("two"));

        let merged = merge_headers(None, Some(&request));
        let values: Vec<_> = merged.get_all("x-trace").iter().collect();
        assert_eq!(values, vec!["one"]);
    }

    #[test]
    fn test_explicit_accept_is_kept() {
        let mut request = HeaderMap::new();
        request.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let merged = merge_headers(None, Some(&request));
        assert_eq!(merged.get(ACCEPT).unwrap(), "application/json");
    }

    #[test]
    fn test_credentials_precedence() {
        let from_url = Some(Credentials::new("url", "u"));
        let session = Credentials::new("session", "s");
        let request = Credentials::new("request", "r");

        let chosen = resolve_credentials(from_url.clone(), Some(&session), Some(&request));
        assert_eq!(chosen.unwrap().username, "request");

        let chosen = resolve_credentials(from_url.clone(), Some(&session), None);
        assert_eq!(chosen.unwrap().username, "session");

        let chosen = resolve_credentials(from_url, None, None);
        assert_eq!(chosen.unwrap().username, "url");

        assert!(resolve_credentials(None, None, None).is_none());
    }
}
