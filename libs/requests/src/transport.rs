use http::{HeaderMap, Method, StatusCode, Version};
use parking_lot::Mutex;
use reqwest::cookie::Jar;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::body::BodyReader;
use crate::client::ClientConfig;
use crate::error::ClientError;
use crate::request::Request;

/// Transport-level response: metadata plus the unconsumed body stream
pub struct RawResponse {
    pub status: StatusCode,
    pub version: Version,
    /// Final URL after redirects
    pub url: Url,
    pub headers: HeaderMap,
    /// `None` when the response carries no body
    pub body: Option<BodyReader>,
}

impl std::fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawResponse")
            .field("status", &self.status)
            .field("version", &self.version)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .field("body", &self.body.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Capability that performs one HTTP exchange synchronously.
///
/// Implementations enforce `request.timeout()` (or their own default) and
/// report every failure as `ClientError::Transport`.
pub trait Transport: Send + Sync {
    /// Send `request` and return the response with its body still unread
    ///
    /// # Errors
    /// Returns `ClientError::Transport` on connection failure, timeout or a
    /// malformed request.
    fn execute(&self, request: Request) -> Result<RawResponse, ClientError>;
}

/// [`Transport`] backed by blocking reqwest clients.
///
/// Each distinct request timeout is served by a client built with that
/// timeout. It bounds every wait on the server, body reads included, and
/// never runs as a deadline from dispatch.
pub struct ReqwestTransport {
    config: ClientConfig,
    cookie_jar: Option<Arc<Jar>>,
    http_client: reqwest::blocking::Client,
    by_timeout: Mutex<HashMap<Duration, reqwest::blocking::Client>>,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("config", &self.config)
            .field("cookie_store", &self.cookie_jar.is_some())
            .field("timeouts", &self.by_timeout.lock().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl ReqwestTransport {
    /// Create a transport from client configuration
    ///
    /// # Errors
    /// Returns `ClientError::Build` if the underlying client cannot be
    /// constructed (e.g. TLS backend initialization failure).
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let cookie_jar = config.cookie_store.then(|| Arc::new(Jar::default()));
        let http_client = build_client(config, cookie_jar.as_ref(), config.default_timeout)?;

        Ok(Self {
            config: config.clone(),
            cookie_jar,
            http_client,
            by_timeout: Mutex::new(HashMap::new()),
        })
    }

    // Clients for request-level timeouts share the cookie jar of the default one.
    fn client_for(
        &self,
        timeout: Option<Duration>,
    ) -> Result<reqwest::blocking::Client, ClientError> {
        let Some(timeout) = timeout else {
            return Ok(self.http_client.clone());
        };
        if Some(timeout) == self.config.default_timeout {
            return Ok(self.http_client.clone());
        }

        let mut clients = self.by_timeout.lock();
        if let Some(client) = clients.get(&timeout) {
            return Ok(client.clone());
        }
        let client = build_client(&self.config, self.cookie_jar.as_ref(), Some(timeout))?;
        tracing::trace!(timeout_ms = timeout.as_millis(), "built client for request timeout");
        clients.insert(timeout, client.clone());
        Ok(client)
    }
}

fn build_client(
    config: &ClientConfig,
    cookie_jar: Option<&Arc<Jar>>,
    timeout: Option<Duration>,
) -> Result<reqwest::blocking::Client, ClientError> {
    let mut builder = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(config.user_agent.as_str())
        .default_headers(config.default_headers.clone());
    if let Some(jar) = cookie_jar {
        builder = builder.cookie_provider(Arc::clone(jar));
    }
    builder
        .build()
        .map_err(|e| ClientError::Build(e.to_string()))
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: Request) -> Result<RawResponse, ClientError> {
        let mut req_builder = self
            .client_for(request.timeout())?
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone());

        if let Some(auth) = request.basic_auth() {
            req_builder = req_builder.basic_auth(auth.username(), Some(auth.password()));
        }

        if let Some(body) = request.body() {
            req_builder = req_builder.body(body.to_vec());
        }

        let resp = req_builder.send()?;

        let status = resp.status();
        let version = resp.version();
        let url = resp.url().clone();
        let headers = resp.headers().clone();
        let body: Option<BodyReader> = if has_body(request.method(), status) {
            Some(Box::new(resp))
        } else {
            None
        };

        Ok(RawResponse {
            status,
            version,
            url,
            headers,
            body,
        })
    }
}

/// Whether a response to `method` with `status` can carry a body (RFC 9110 section 6.4.1)
fn has_body(method: &Method, status: StatusCode) -> bool {
    !(method == Method::HEAD
        || status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}
