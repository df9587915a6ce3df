use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION, SET_COOKIE};
use http::{HeaderMap, StatusCode, Version};
use serde::de::DeserializeOwned;
use url::Url;

use crate::body::BodyBuffer;
use crate::error::ClientError;
use crate::transport::RawResponse;

/// A cookie set by the server via `Set-Cookie`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

/// HTTP response with buffered, multi-format body access.
///
/// The body is read from the wire lazily: the first call to [`len`],
/// [`bytes`], [`text`] or [`json`] drains and closes the stream, and every
/// later call returns the same buffered bytes.
///
/// [`len`]: Response::len
/// [`bytes`]: Response::bytes
/// [`text`]: Response::text
/// [`json`]: Response::json
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    version: Version,
    url: Url,
    headers: HeaderMap,
    body: BodyBuffer,
}

impl From<RawResponse> for Response {
    fn from(raw: RawResponse) -> Self {
        Self {
            status: raw.status,
            version: raw.version,
            url: raw.url,
            headers: raw.headers,
            body: BodyBuffer::new(raw.body),
        }
    }
}

impl Response {
    /// Get the HTTP status code
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Final URL after redirects
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the response headers
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Declared `Content-Length`, if present and well-formed
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }

    /// Raw value of the first `Content-Type` header
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// True if any `Content-Type` value has the media type `application/json`
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.headers
            .get_all(CONTENT_TYPE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(is_json_media_type)
    }

    /// Cookies from every `Set-Cookie` header, attributes omitted
    #[must_use]
    pub fn cookies(&self) -> Vec<Cookie> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(parse_set_cookie)
            .collect()
    }

    /// The `Location` header resolved against the response URL
    ///
    /// # Errors
    /// Returns `ClientError::InvalidUrl` if the header is not a valid URL
    /// reference.
    pub fn location(&self) -> Result<Option<Url>, ClientError> {
        let Some(value) = self.headers.get(LOCATION) else {
            return Ok(None);
        };
        let raw = value
            .to_str()
            .map_err(|e| ClientError::invalid_url("<non-ascii Location>", e))?;
        self.url
            .join(raw)
            .map(Some)
            .map_err(|e| ClientError::invalid_url(raw, e))
    }

    /// Length of the buffered body
    #[must_use]
    pub fn len(&self) -> usize {
        self.body.get().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The entire body as bytes
    #[must_use]
    pub fn bytes(&self) -> Bytes {
        self.body.get().clone()
    }

    /// The body as a string; invalid UTF-8 sequences are replaced
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.body.get()).into_owned()
    }

    /// The body if the response declares `application/json`, otherwise empty.
    ///
    /// A missing or different `Content-Type` is not an error.
    #[must_use]
    pub fn json(&self) -> Bytes {
        if self.is_json() {
            self.bytes()
        } else {
            Bytes::new()
        }
    }

    /// Deserialize [`json`](Response::json) into `T`
    ///
    /// # Errors
    /// Returns `ClientError::Decode` if the body is not JSON-typed or does not
    /// deserialize into `T`.
    pub fn json_as<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_slice(&self.json()).map_err(ClientError::Decode)
    }

    /// Whether the body has already been read from the wire
    #[must_use]
    pub fn is_body_buffered(&self) -> bool {
        self.body.is_buffered()
    }
}

// Media type is the part before any parameters, surrounding whitespace allowed.
fn is_json_media_type(value: &str) -> bool {
    let essence = value.split(';').next().unwrap_or_default().trim();
    essence.eq_ignore_ascii_case(mime::APPLICATION_JSON.essence_str())
}

fn parse_set_cookie(value: &str) -> Option<Cookie> {
    let pair = value.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(Cookie {
        name: name.to_owned(),
        value: value.trim().trim_matches('"').to_owned(),
    })
}
