//! Declarative HTTP requests with buffered responses
//!
//! A thin convenience layer over a blocking HTTP transport:
//!
//! - requests are assembled from an ordered list of [`RequestOption`]s
//!   (headers, query parameters, basic auth, timeouts, bodies);
//! - a [`Client`] sends them either on the calling thread or on a background
//!   thread, handing back a [`Promise`];
//! - every [`Response`] reads its body lazily and exactly once, then serves
//!   it as bytes, text, or JSON (the latter only when the server declared
//!   `application/json`).
//!
//! # Examples
//!
//! ## Blocking Usage
//!
//! ```no_run
//! use requests::options::{header, query};
//! use requests::{Client, StatusCode};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new()?;
//! let response = client.get(
//!     "http://httpbin.org/get",
//!     vec![header("Accept", "application/json"), query("name", "Ava")],
//! )?;
//!
//! assert_eq!(response.status(), StatusCode::OK);
//! println!("{} bytes: {}", response.len(), response.text());
//! # Ok(())
//! # }
//! ```
//!
//! ## Async Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use requests::options::timeout;
//! use requests::Client;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new()?;
//! let promise = client.get_async(
//!     "http://httpbin.org/delay/1",
//!     vec![timeout(Duration::from_secs(5))],
//! )?;
//!
//! // Do some other things
//!
//! let status = promise.then(
//!     |response| response.status().as_u16(),
//!     |err| {
//!         eprintln!("request failed: {err}");
//!         0
//!     },
//! );
//! println!("status: {status}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Request Builder
//!
//! ```no_run
//! use requests::{Client, Method, Request};
//! use serde_json::json;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let request = Request::builder(Method::POST, "http://httpbin.org/post")
//!     .basic_auth("user", "pass")
//!     .json(&json!({"foo": ["bar", "baz"]}))?
//!     .build()?;
//!
//! let response = Client::new()?.send(request)?;
//! let body = response.json(); // empty unless Content-Type is application/json
//! # Ok(())
//! # }
//! ```

mod body;
mod client;
mod error;
pub mod options;
mod promise;
mod request;
mod response;
mod transport;

// Re-export public API
pub use body::BodyReader;
pub use client::{Client, ClientConfig, TIMEOUT_ENV, USER_AGENT_ENV};
pub use error::{BoxError, ClientError, TransportErrorKind};
pub use options::RequestOption;
pub use promise::Promise;
pub use request::{BasicAuth, Request, RequestBuilder};
pub use response::{Cookie, Response};
pub use transport::{RawResponse, ReqwestTransport, Transport};

// Re-export commonly used types from dependencies
pub use http::{HeaderMap, Method, StatusCode, Version};
pub use url::Url;
