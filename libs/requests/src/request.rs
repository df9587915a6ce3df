use bytes::Bytes;
use http::{HeaderMap, Method};
use serde::Serialize;
use std::time::Duration;
use url::Url;

use crate::error::ClientError;
use crate::options::{self, RequestOption};

/// Basic auth credentials attached to a request
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    username: String,
    password: String,
}

impl BasicAuth {
    /// Create credentials, rejecting usernames that cannot be encoded.
    ///
    /// # Errors
    /// Returns `ClientError::AuthDecode` if the username contains `:` or
    /// either part contains control characters.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let username = username.into();
        let password = password.into();
        if username.contains(':') {
            return Err(ClientError::AuthDecode("username must not contain `:`".into()));
        }
        if username.chars().chain(password.chars()).any(char::is_control) {
            return Err(ClientError::AuthDecode(
                "credentials must not contain control characters".into(),
            ));
        }
        Ok(Self { username, password })
    }

    /// Parse `user:password`. The password may itself contain `:`.
    ///
    /// # Errors
    /// Returns `ClientError::AuthDecode` if the separator is missing.
    pub fn from_pair(pair: &str) -> Result<Self, ClientError> {
        let (username, password) = pair
            .split_once(':')
            .ok_or_else(|| ClientError::AuthDecode("expected `user:password`".into()))?;
        Self::new(username, password)
    }

    /// Decode a `{"user": "password"}` object.
    ///
    /// # Errors
    /// Returns `ClientError::AuthDecode` unless `value` is an object holding
    /// exactly one string-valued entry.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ClientError> {
        let object = value
            .as_object()
            .ok_or_else(|| ClientError::AuthDecode("expected a JSON object".into()))?;
        let mut entries = object.iter();
        let (Some((username, password)), None) = (entries.next(), entries.next()) else {
            return Err(ClientError::AuthDecode(format!(
                "expected exactly one credential entry, found {}",
                object.len()
            )));
        };
        let password = password.as_str().ok_or_else(|| {
            ClientError::AuthDecode(format!("password for `{username}` is not a string"))
        })?;
        Self::new(username.as_str(), password)
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

/// Never prints the password.
impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Fully-built HTTP request descriptor.
///
/// Produced by [`Request::build`] or [`RequestBuilder::build`]; read-only
/// once built.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: Option<Bytes>,
    basic_auth: Option<BasicAuth>,
    timeout: Option<Duration>,
}

impl Request {
    /// Create a new request builder
    #[must_use]
    pub fn builder(method: Method, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(method, url)
    }

    /// Parse `url`, apply `options` in order and encode the query string.
    ///
    /// # Errors
    /// Returns `ClientError::InvalidUrl` if `url` is not an absolute
    /// `http`/`https` URL, or whatever error the first failing option reports.
    pub fn build(
        method: Method,
        url: &str,
        options: impl IntoIterator<Item = RequestOption>,
    ) -> Result<Self, ClientError> {
        let mut request = Self {
            method,
            url: parse_url(url)?,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
            basic_auth: None,
            timeout: None,
        };
        for option in options {
            option.apply(&mut request)?;
        }
        request.encode_query();
        Ok(request)
    }

    /// Get the HTTP method
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Final URL including the encoded query parameters
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the request headers
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Query parameters added by options, in insertion order
    #[must_use]
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Get the request body
    #[must_use]
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    #[must_use]
    pub fn basic_auth(&self) -> Option<&BasicAuth> {
        self.basic_auth.as_ref()
    }

    /// Get the timeout duration
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub(crate) fn push_query(&mut self, key: String, value: String) {
        self.query.push((key, value));
    }

    pub(crate) fn set_basic_auth(&mut self, auth: BasicAuth) {
        self.basic_auth = Some(auth);
    }

    pub(crate) fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    pub(crate) fn set_body(&mut self, body: Bytes) {
        self.body = Some(body);
    }

    // Appends after any query already present in the URL.
    fn encode_query(&mut self) {
        if self.query.is_empty() {
            return;
        }
        let mut pairs = self.url.query_pairs_mut();
        for (key, value) in &self.query {
            pairs.append_pair(key, value);
        }
    }
}

fn parse_url(raw: &str) -> Result<Url, ClientError> {
    let url = Url::parse(raw).map_err(|e| ClientError::invalid_url(raw, e))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ClientError::invalid_url(raw, format!("unsupported scheme `{other}`")));
        }
    }
    if url.host().is_none() {
        return Err(ClientError::invalid_url(raw, "missing host"));
    }
    Ok(url)
}

/// Builder for constructing HTTP requests with a fluent API.
///
/// Each call records one [`RequestOption`]; nothing is validated until
/// [`build`](RequestBuilder::build) applies them in order.
#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    url: String,
    options: Vec<RequestOption>,
}

impl RequestBuilder {
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            options: Vec::new(),
        }
    }

    /// Record an arbitrary option
    #[must_use]
    pub fn option(mut self, option: RequestOption) -> Self {
        self.options.push(option);
        self
    }

    /// Record several options, preserving their order
    #[must_use]
    pub fn options(mut self, options: impl IntoIterator<Item = RequestOption>) -> Self {
        self.options.extend(options);
        self
    }

    /// Set a header, replacing earlier values
    #[must_use]
    pub fn header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.option(options::header(name, value))
    }

    /// Add a header value
    #[must_use]
    pub fn append_header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.option(options::append_header(name, value))
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.option(options::query(key, value))
    }

    #[must_use]
    pub fn basic_auth(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.option(options::basic_auth(username, password))
    }

    /// Set request timeout
    #[must_use]
    pub fn timeout(self, duration: Duration) -> Self {
        self.option(options::timeout(duration))
    }

    /// Set the request body
    #[must_use]
    pub fn body(self, body: impl Into<Bytes>) -> Self {
        self.option(options::body(body))
    }

    /// Set the body to a JSON-serialized value and add Content-Type header
    ///
    /// # Errors
    /// Returns `ClientError::Marshal` if `value` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, ClientError> {
        Ok(self.option(options::json(value)?))
    }

    /// Build the request
    ///
    /// # Errors
    /// See [`Request::build`].
    pub fn build(self) -> Result<Request, ClientError> {
        Request::build(self.method, &self.url, self.options)
    }
}
