//! Async usage example for the requests library
//!
//! Async calls return a `Promise` immediately; the request runs on a
//! background thread while the caller does other work.
//!
//! To run this example:
//! ```bash
//! RUST_LOG=requests=debug cargo run --example async_usage
//! ```

use requests::options::timeout;
use requests::Client;
use std::time::{Duration, Instant};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let client = Client::new()?;

    println!("=== Example 1: Fire and wait ===\n");

    let started = Instant::now();
    let promise = client.get_async("http://httpbin.org/delay/1", vec![])?;
    println!("Promise returned after {:?}", started.elapsed());

    // Do some other things

    let response = promise.wait().map_err(ToString::to_string)?;
    println!(
        "Status {} after {:?}\n",
        response.status(),
        started.elapsed()
    );

    println!("=== Example 2: Continuations ===\n");

    let promise = client.get_async(
        "http://httpbin.org/delay/3",
        vec![timeout(Duration::from_secs(1))],
    )?;
    let summary = promise.then(
        |response| format!("succeeded with {}", response.status()),
        |err| format!("failed: {err}"),
    );
    println!("Request {summary}\n");

    println!("=== Example 3: Several requests in flight ===\n");

    let promises = ["get", "uuid", "ip"]
        .into_iter()
        .map(|path| client.get_async(&format!("http://httpbin.org/{path}"), vec![]))
        .collect::<Result<Vec<_>, _>>()?;

    for promise in promises {
        match promise.into_result() {
            Ok(response) => println!("{} -> {} bytes", response.url(), response.len()),
            Err(err) => println!("error: {err}"),
        }
    }

    Ok(())
}
