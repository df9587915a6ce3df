//! Deferred request mutations.
//!
//! Every option is a plain record describing one change to a [`Request`]
//! under construction. Options are applied strictly in the order they were
//! supplied, so scalar fields follow "last write wins" while headers added
//! with [`append_header`] and query parameters accumulate.
//!
//! ```
//! use std::time::Duration;
//! use requests::options::{basic_auth, header, query, timeout};
//! use requests::{Method, Request};
//!
//! let request = Request::build(
//!     Method::GET,
//!     "http://example.test/get",
//!     vec![
//!         header("Accept", "text/plain"),
//!         query("a", "1"),
//!         query("a", "2"),
//!         basic_auth("user", "pass"),
//!         timeout(Duration::from_secs(3)),
//!     ],
//! )
//! .unwrap();
//! assert_eq!(request.url().as_str(), "http://example.test/get?a=1&a=2");
//! ```

use std::time::Duration;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderName, HeaderValue};
use serde::Serialize;

use crate::error::ClientError;
use crate::request::{BasicAuth, Request};

/// A single, ordered mutation of a request descriptor
#[derive(Clone, PartialEq)]
pub enum RequestOption {
    /// Set a header, replacing every earlier value of the same name
    Header { name: String, value: String },
    /// Add a header value, keeping earlier values of the same name
    AppendHeader { name: String, value: String },
    /// Add a query parameter
    Query { key: String, value: String },
    /// Set basic auth credentials
    BasicAuth { username: String, password: String },
    /// Basic auth credentials in `user:password` form
    Credentials(String),
    /// Basic auth credentials as a JSON object `{"user": "password"}`
    AuthJson(serde_json::Value),
    /// Per-request timeout overriding the client default
    Timeout(Duration),
    /// Raw request body
    Body(Bytes),
    /// Pre-marshaled JSON body; also sets `Content-Type: application/json`
    Json(Bytes),
}

impl std::fmt::Debug for RequestOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestOption::Header { name, value } => f
                .debug_struct("Header")
                .field("name", name)
                .field("value", value)
                .finish(),
            RequestOption::AppendHeader { name, value } => f
                .debug_struct("AppendHeader")
                .field("name", name)
                .field("value", value)
                .finish(),
            RequestOption::Query { key, value } => f
                .debug_struct("Query")
                .field("key", key)
                .field("value", value)
                .finish(),
            RequestOption::BasicAuth { username, .. } => f
                .debug_struct("BasicAuth")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            RequestOption::Credentials(_) => write!(f, "Credentials([REDACTED])"),
            RequestOption::AuthJson(_) => write!(f, "AuthJson([REDACTED])"),
            RequestOption::Timeout(timeout) => f.debug_tuple("Timeout").field(timeout).finish(),
            RequestOption::Body(bytes) => f.debug_tuple("Body").field(&bytes.len()).finish(),
            RequestOption::Json(bytes) => f.debug_tuple("Json").field(&bytes.len()).finish(),
        }
    }
}

impl RequestOption {
    /// Apply this option to a request under construction.
    ///
    /// # Errors
    /// Returns `ClientError::Build` for invalid header names or values and
    /// `ClientError::AuthDecode` for malformed credentials.
    pub(crate) fn apply(self, request: &mut Request) -> Result<(), ClientError> {
        match self {
            RequestOption::Header { name, value } => {
                let (name, value) = parse_header(&name, &value)?;
                request.headers_mut().insert(name, value);
            }
            RequestOption::AppendHeader { name, value } => {
                let (name, value) = parse_header(&name, &value)?;
                request.headers_mut().append(name, value);
            }
            RequestOption::Query { key, value } => request.push_query(key, value),
            RequestOption::BasicAuth { username, password } => {
                request.set_basic_auth(BasicAuth::new(username, password)?);
            }
            RequestOption::Credentials(pair) => {
                request.set_basic_auth(BasicAuth::from_pair(&pair)?);
            }
            RequestOption::AuthJson(value) => {
                request.set_basic_auth(BasicAuth::from_json(&value)?);
            }
            RequestOption::Timeout(timeout) => request.set_timeout(timeout),
            RequestOption::Body(bytes) => request.set_body(bytes),
            RequestOption::Json(bytes) => {
                request
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                request.set_body(bytes);
            }
        }
        Ok(())
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), ClientError> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| ClientError::Build(format!("Invalid header name `{name}`: {e}")))?;
    let value = HeaderValue::from_str(value)
        .map_err(|e| ClientError::Build(format!("Invalid header value for `{name}`: {e}")))?;
    Ok((name, value))
}

/// Set a header, overwriting earlier values
#[must_use]
pub fn header(name: impl Into<String>, value: impl Into<String>) -> RequestOption {
    RequestOption::Header {
        name: name.into(),
        value: value.into(),
    }
}

/// Add a header value without removing earlier ones
#[must_use]
pub fn append_header(name: impl Into<String>, value: impl Into<String>) -> RequestOption {
    RequestOption::AppendHeader {
        name: name.into(),
        value: value.into(),
    }
}

/// Add a query parameter
#[must_use]
pub fn query(key: impl Into<String>, value: impl Into<String>) -> RequestOption {
    RequestOption::Query {
        key: key.into(),
        value: value.into(),
    }
}

/// Set basic auth credentials
#[must_use]
pub fn basic_auth(username: impl Into<String>, password: impl Into<String>) -> RequestOption {
    RequestOption::BasicAuth {
        username: username.into(),
        password: password.into(),
    }
}

/// Set basic auth credentials from `user:password`
#[must_use]
pub fn credentials(pair: impl Into<String>) -> RequestOption {
    RequestOption::Credentials(pair.into())
}

/// Set basic auth credentials from a `{"user": "password"}` object
#[must_use]
pub fn auth_json(value: serde_json::Value) -> RequestOption {
    RequestOption::AuthJson(value)
}

/// Set the per-request timeout
#[must_use]
pub fn timeout(duration: Duration) -> RequestOption {
    RequestOption::Timeout(duration)
}

/// Set a raw request body
#[must_use]
pub fn body(bytes: impl Into<Bytes>) -> RequestOption {
    RequestOption::Body(bytes.into())
}

/// Marshal `value` to JSON and use it as the request body.
///
/// Marshaling happens eagerly so that failures surface before dispatch.
///
/// # Errors
/// Returns `ClientError::Marshal` if `value` cannot be serialized.
pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<RequestOption, ClientError> {
    let bytes = serde_json::to_vec(value).map_err(ClientError::Marshal)?;
    Ok(RequestOption::Json(Bytes::from(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use serde_json::json;

    fn build(options: Vec<RequestOption>) -> Result<Request, ClientError> {
        Request::build(Method::GET, "http://example.test/get", options)
    }

    #[test]
    fn test_header_last_write_wins() {
        let request = build(vec![header("X", "1"), header("X", "2")]).unwrap();
        let values: Vec<_> = request.headers().get_all("x").iter().collect();
        assert_eq!(values, vec!["2"]);
    }

    #[test]
    fn test_append_header_accumulates() {
        let request = build(vec![append_header("X", "1"), append_header("X", "2")]).unwrap();
        let values: Vec<_> = request.headers().get_all("x").iter().collect();
        assert_eq!(values, vec!["1", "2"]);
    }

    #[test]
    fn test_header_overwrites_appended_values() {
        let request = build(vec![
            append_header("X", "1"),
            append_header("X", "2"),
            header("X", "3"),
        ])
        .unwrap();
        let values: Vec<_> = request.headers().get_all("x").iter().collect();
        assert_eq!(values, vec!["3"]);
    }

    #[test]
    fn test_invalid_header_name() {
        let err = build(vec![header("bad header", "1")]).unwrap_err();
        assert!(matches!(err, ClientError::Build(_)));
    }

    #[test]
    fn test_invalid_header_value() {
        let err = build(vec![header("X", "line\nbreak")]).unwrap_err();
        assert!(matches!(err, ClientError::Build(_)));
    }

    #[test]
    fn test_timeout_last_write_wins() {
        let request = build(vec![
            timeout(Duration::from_secs(3)),
            timeout(Duration::from_millis(500)),
        ])
        .unwrap();
        assert_eq!(request.timeout(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_credentials_options() {
        let request = build(vec![credentials("user:pass")]).unwrap();
        let auth = request.basic_auth().unwrap();
        assert_eq!(auth.username(), "user");
        assert_eq!(auth.password(), "pass");

        let request = build(vec![auth_json(json!({"ava": "secret"}))]).unwrap();
        assert_eq!(request.basic_auth().unwrap().username(), "ava");
    }

    #[test]
    fn test_malformed_credentials() {
        let err = build(vec![credentials("no-separator")]).unwrap_err();
        assert!(matches!(err, ClientError::AuthDecode(_)));

        let err = build(vec![auth_json(json!({"user": 42}))]).unwrap_err();
        assert!(matches!(err, ClientError::AuthDecode(_)));

        let err = build(vec![basic_auth("us:er", "pass")]).unwrap_err();
        assert!(matches!(err, ClientError::AuthDecode(_)));
    }

    #[test]
    fn test_json_sets_body_and_content_type() {
        let option = json(&json!({"foo": ["bar", "baz"]})).unwrap();
        let request = build(vec![header("Content-Type", "text/plain"), option]).unwrap();
        assert_eq!(
            request.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(
            &request.body().unwrap()[..],
            br#"{"foo":["bar","baz"]}"#
        );
    }

    #[test]
    fn test_json_marshal_error() {
        use std::collections::HashMap;

        // Non-string map keys cannot be represented as JSON object keys.
        let mut value = HashMap::new();
        value.insert(vec![1u8], "x");
        let err = json(&value).unwrap_err();
        assert!(matches!(err, ClientError::Marshal(_)));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", basic_auth("user", "hunter2"));
        assert!(rendered.contains("user"));
        assert!(!rendered.contains("hunter2"));
        assert!(!format!("{:?}", credentials("user:hunter2")).contains("hunter2"));
    }
}
