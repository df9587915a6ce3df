use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::ClientError;
use crate::options::{self, RequestOption};
use crate::promise::Promise;
use crate::request::Request;
use crate::response::Response;
use crate::transport::{ReqwestTransport, Transport};

/// Environment variable holding the default timeout in (fractional) seconds
pub const TIMEOUT_ENV: &str = "REQUESTS_TIMEOUT_SECS";
/// Environment variable overriding the `User-Agent` header
pub const USER_AGENT_ENV: &str = "REQUESTS_USER_AGENT";

const DEFAULT_THREAD_NAME: &str = "requests-dispatch";

/// Configuration for [`Client`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Timeout for requests that set none; `None` waits indefinitely
    pub default_timeout: Option<Duration>,
    pub user_agent: String,
    /// Sent with every request unless a request option replaces them
    pub default_headers: HeaderMap,
    /// Keep cookies between requests of the same client
    pub cookie_store: bool,
    /// Name of the threads running asynchronous requests
    pub thread_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_timeout: None,
            user_agent: concat!("cf-requests/", env!("CARGO_PKG_VERSION")).to_owned(),
            default_headers: HeaderMap::new(),
            cookie_store: false,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
        }
    }
}

impl ClientConfig {
    /// Set the default request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Wait indefinitely unless a request sets its own timeout
    #[must_use]
    pub fn without_timeout(mut self) -> Self {
        self.default_timeout = None;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Add a header sent with every request
    ///
    /// # Errors
    /// Returns `ClientError::Build` for an invalid header name or value.
    pub fn with_default_header(mut self, name: &str, value: &str) -> Result<Self, ClientError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ClientError::Build(format!("Invalid header name `{name}`: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ClientError::Build(format!("Invalid header value for `{name}`: {e}")))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    #[must_use]
    pub fn with_cookie_store(mut self, enabled: bool) -> Self {
        self.cookie_store = enabled;
        self
    }

    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Create configuration from environment variables
    ///
    /// Reads:
    /// - `REQUESTS_TIMEOUT_SECS`: default timeout in seconds, fractions allowed (e.g. `0.5`)
    /// - `REQUESTS_USER_AGENT`: `User-Agent` header value
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    /// Returns `ClientError::Build` if `REQUESTS_TIMEOUT_SECS` is not a
    /// non-negative number of seconds.
    pub fn from_env() -> Result<Self, ClientError> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(TIMEOUT_ENV) {
            config.default_timeout = Some(parse_timeout_secs(&raw)?);
        }
        if let Ok(user_agent) = std::env::var(USER_AGENT_ENV) {
            config.user_agent = user_agent;
        }
        Ok(config)
    }
}

fn parse_timeout_secs(raw: &str) -> Result<Duration, ClientError> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|e| ClientError::Build(format!("{TIMEOUT_ENV}=`{raw}` is not a number: {e}")))?;
    Duration::try_from_secs_f64(secs).map_err(|e| {
        ClientError::Build(format!("{TIMEOUT_ENV}=`{raw}` is not a valid duration: {e}"))
    })
}

/// HTTP client dispatching requests synchronously or on background threads.
///
/// Cheap to clone; clones share the same transport.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    thread_name: Arc<str>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("thread_name", &self.thread_name)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client with the default configuration
    ///
    /// # Errors
    /// Returns `ClientError::Build` if the transport cannot be constructed.
    pub fn new() -> Result<Self, ClientError> {
        Self::from_config(ClientConfig::default())
    }

    /// Create client from configuration
    ///
    /// # Errors
    /// Returns `ClientError::Build` if the transport cannot be constructed.
    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self {
            transport: Arc::new(transport),
            thread_name: config.thread_name.into(),
        })
    }

    /// Create a client over a custom transport
    #[must_use]
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            thread_name: DEFAULT_THREAD_NAME.into(),
        }
    }

    /// Send a built request, blocking until the response headers arrive.
    ///
    /// The returned response has not read its body yet.
    ///
    /// # Errors
    /// Returns `ClientError::Transport` on connection failure or timeout.
    pub fn send(&self, request: Request) -> Result<Response, ClientError> {
        dispatch(self.transport.as_ref(), request)
    }

    /// Send a built request on a background thread and return immediately
    pub fn send_async(&self, request: Request) -> Promise {
        let transport = Arc::clone(&self.transport);
        Promise::spawn(&self.thread_name, move || dispatch(transport.as_ref(), request))
    }

    /// Build and send a request
    ///
    /// # Errors
    /// Returns construction errors (`InvalidUrl`, `AuthDecode`, `Build`) or
    /// `ClientError::Transport`.
    pub fn request(
        &self,
        method: Method,
        url: &str,
        options: Vec<RequestOption>,
    ) -> Result<Response, ClientError> {
        self.send(Request::build(method, url, options)?)
    }

    /// Build a request and send it on a background thread.
    ///
    /// Construction errors are returned here, before anything is spawned;
    /// transport errors are delivered through the promise.
    ///
    /// # Errors
    /// Returns `InvalidUrl`, `AuthDecode` or `Build` errors.
    pub fn request_async(
        &self,
        method: Method,
        url: &str,
        options: Vec<RequestOption>,
    ) -> Result<Promise, ClientError> {
        Ok(self.send_async(Request::build(method, url, options)?))
    }

    /// Send a GET request
    ///
    /// # Errors
    /// See [`Client::request`].
    pub fn get(&self, url: &str, options: Vec<RequestOption>) -> Result<Response, ClientError> {
        self.request(Method::GET, url, options)
    }

    /// Send a GET request on a background thread
    ///
    /// # Errors
    /// See [`Client::request_async`].
    pub fn get_async(
        &self,
        url: &str,
        options: Vec<RequestOption>,
    ) -> Result<Promise, ClientError> {
        self.request_async(Method::GET, url, options)
    }

    /// Send a HEAD request
    ///
    /// # Errors
    /// See [`Client::request`].
    pub fn head(&self, url: &str, options: Vec<RequestOption>) -> Result<Response, ClientError> {
        self.request(Method::HEAD, url, options)
    }

    /// Send a HEAD request on a background thread
    ///
    /// # Errors
    /// See [`Client::request_async`].
    pub fn head_async(
        &self,
        url: &str,
        options: Vec<RequestOption>,
    ) -> Result<Promise, ClientError> {
        self.request_async(Method::HEAD, url, options)
    }

    /// Send a POST request with `body` declared as `content_type`
    ///
    /// # Errors
    /// See [`Client::request`].
    pub fn post(
        &self,
        url: &str,
        content_type: &str,
        body: impl Into<bytes::Bytes>,
        options: Vec<RequestOption>,
    ) -> Result<Response, ClientError> {
        let mut all = vec![
            options::header(http::header::CONTENT_TYPE.as_str(), content_type),
            options::body(body),
        ];
        all.extend(options);
        self.request(Method::POST, url, all)
    }

    /// Send a POST request with `body` marshaled as JSON
    ///
    /// # Errors
    /// Returns `ClientError::Marshal` before dispatch if `body` cannot be
    /// serialized, otherwise see [`Client::request`].
    pub fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
        options: Vec<RequestOption>,
    ) -> Result<Response, ClientError> {
        self.request(Method::POST, url, with_json(body, options)?)
    }

    /// Send a JSON POST request on a background thread
    ///
    /// # Errors
    /// Returns `ClientError::Marshal` or construction errors; nothing is
    /// spawned in that case.
    pub fn post_json_async<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
        options: Vec<RequestOption>,
    ) -> Result<Promise, ClientError> {
        self.request_async(Method::POST, url, with_json(body, options)?)
    }
}

// The JSON body goes first so caller options can still override its headers.
fn with_json<T: Serialize + ?Sized>(
    body: &T,
    options: Vec<RequestOption>,
) -> Result<Vec<RequestOption>, ClientError> {
    let mut all = Vec::with_capacity(options.len() + 1);
    all.push(options::json(body)?);
    all.extend(options);
    Ok(all)
}

fn dispatch(transport: &dyn Transport, request: Request) -> Result<Response, ClientError> {
    let method = request.method().clone();
    let url = request.url().clone();
    let started = Instant::now();
    tracing::debug!(%method, %url, "dispatching request");

    match transport.execute(request) {
        Ok(raw) => {
            tracing::debug!(
                %method,
                %url,
                status = raw.status.as_u16(),
                elapsed_ms = started.elapsed().as_millis(),
                "response received"
            );
            Ok(Response::from(raw))
        }
        Err(error) => {
            tracing::debug!(
                %method,
                %url,
                %error,
                elapsed_ms = started.elapsed().as_millis(),
                "request failed"
            );
            Err(error)
        }
    }
}
