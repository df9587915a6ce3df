use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Boxed cause carried by transport failures
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Classifies where a transport failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The request timeout elapsed before a response arrived
    Timeout,
    /// The connection could not be established
    Connect,
    /// The request could not be sent (malformed request, protocol error)
    Request,
    /// The response body failed mid-transfer
    Body,
    /// Any other transport failure
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Request => "request",
            TransportErrorKind::Body => "body",
            TransportErrorKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// Error types for request construction and dispatch
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to marshal request body: {0}")]
    Marshal(#[source] serde_json::Error),

    #[error("transport error ({kind}): {source}")]
    Transport {
        kind: TransportErrorKind,
        #[source]
        source: BoxError,
    },

    #[error("malformed basic auth credentials: {0}")]
    AuthDecode(String),

    #[error("request build error: {0}")]
    Build(String),

    #[error("failed to decode JSON response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("dispatch task panicked: {0}")]
    TaskPanicked(String),
}

impl ClientError {
    pub(crate) fn transport(kind: TransportErrorKind, source: impl Into<BoxError>) -> Self {
        ClientError::Transport {
            kind,
            source: source.into(),
        }
    }

    pub(crate) fn invalid_url(url: &str, reason: impl fmt::Display) -> Self {
        ClientError::InvalidUrl {
            url: url.to_owned(),
            reason: reason.to_string(),
        }
    }

    /// Kind of the transport failure, if this is one
    #[must_use]
    pub fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self {
            ClientError::Transport { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// True for any failure raised by the transport after dispatch
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport { .. })
    }

    /// True when the transport gave up because the timeout elapsed
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.transport_kind() == Some(TransportErrorKind::Timeout)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_body() || err.is_decode() {
            TransportErrorKind::Body
        } else if err.is_request() || err.is_builder() || err.is_redirect() {
            TransportErrorKind::Request
        } else {
            TransportErrorKind::Other
        };
        ClientError::transport(kind, err)
    }
}
