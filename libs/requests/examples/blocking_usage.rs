//! Blocking usage example for the requests library
//!
//! Every call runs on the current thread and returns once the response
//! headers have arrived; the body is read on first access.
//!
//! To run this example:
//! ```bash
//! export REQUESTS_TIMEOUT_SECS=10   # Optional, no timeout by default
//! cargo run --example blocking_usage
//! ```

use requests::options::{basic_auth, header, query};
use requests::{Client, ClientConfig, Method, Request};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let client = Client::from_config(ClientConfig::from_env()?)?;

    println!("=== Example 1: GET with options ===\n");

    let response = client.get(
        "http://httpbin.org/get",
        vec![
            header("Accept", "application/json"),
            query("name", "Ava"),
            query("foo", "bar"),
        ],
    )?;

    println!("Status: {}", response.status());
    println!("Final URL: {}", response.url());
    println!("Body ({} bytes): {}\n", response.len(), response.text());

    println!("=== Example 2: Basic auth ===\n");

    let response = client.get(
        "http://httpbin.org/basic-auth/user/pass",
        vec![basic_auth("user", "pass")],
    )?;
    println!("Status: {}\n", response.status());

    println!("=== Example 3: JSON only when declared ===\n");

    let response = client.get("http://httpbin.org/html", vec![])?;
    println!("Content-Type: {:?}", response.content_type());
    println!("json() is empty: {}\n", response.json().is_empty());

    println!("=== Example 4: POST JSON ===\n");

    let response = client.post_json(
        "http://httpbin.org/post",
        &json!({"combined": [{"foo": ["bar", "baz"]}]}),
        vec![],
    )?;
    let data: serde_json::Value = response.json_as()?;
    println!("Echoed body: {}\n", data["json"]);

    println!("=== Example 5: Request builder ===\n");

    let request = Request::builder(Method::PUT, "http://httpbin.org/put")
        .header("X-Trace", "example")
        .body("plain text")
        .build()?;
    let response = client.send(request)?;
    println!("Status: {}", response.status());

    Ok(())
}
