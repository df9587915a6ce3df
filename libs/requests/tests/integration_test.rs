#![allow(clippy::unwrap_used, clippy::expect_used)]

use httpmock::prelude::*;
use httpmock::Method::HEAD;
use requests::options::{append_header, basic_auth, header, query, timeout};
use requests::{Client, ClientConfig, ClientError, StatusCode};
use serde_json::json;
use std::collections::HashMap;
use std::net::TcpListener;
use std::thread;
use std::time::{Duration, Instant};

const JSON_BODY: &str = r#"{"foo": ["bar", "baz"]}"#;

fn client() -> Client {
    Client::new().unwrap()
}

/// URL on localhost where nothing is listening
fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/get")
}

#[test]
fn test_get_hello_world() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(GET).path("/get");
        then.status(200).body("Hello world!");
    });

    let response = client().get(&server.url("/get"), vec![]).unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.is_body_buffered());
    assert_eq!(response.text(), "Hello world!");
    assert_eq!(response.bytes().as_ref(), b"Hello world!");
    assert_eq!(response.len(), 12);

    mock.assert();
}

#[test]
fn test_custom_headers() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/headers")
            .header("X-Custom-Header", "2")
            .header("Content-Type", "application/json");
        then.status(200).body("OK");
    });

    let response = client()
        .get(
            &server.url("/headers"),
            vec![
                header("X-Custom-Header", "1"),
                header("Content-Type", "application/json"),
                header("X-Custom-Header", "2"),
            ],
        )
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    mock.assert();
}

#[test]
fn test_appended_headers_are_all_sent() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/headers")
            .header("X-Tag", "a")
            .header("X-Tag", "b");
        then.status(200);
    });

    client()
        .get(
            &server.url("/headers"),
            vec![append_header("X-Tag", "a"), append_header("X-Tag", "b")],
        )
        .unwrap();

    mock.assert();
}

#[test]
fn test_query_params() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/search")
            .query_param("foo", "bar")
            .query_param("name", "Ava");
        then.status(200).body("Ava");
    });

    let response = client()
        .get(
            &server.url("/search"),
            vec![query("foo", "bar"), query("name", "Ava")],
        )
        .unwrap();

    assert_eq!(
        response.url().query(),
        Some("foo=bar&name=Ava"),
        "query string is encoded in insertion order"
    );
    assert_eq!(response.text(), "Ava");
    mock.assert();
}

#[test]
fn test_basic_auth() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/auth")
            .header("Authorization", "Basic dXNlcjpwYXNz");
        then.status(200).body("user : pass");
    });

    let response = client()
        .get(&server.url("/auth"), vec![basic_auth("user", "pass")])
        .unwrap();

    assert_eq!(response.text(), "user : pass");
    mock.assert();
}

#[test]
fn test_json_content_negotiation() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/json");
        then.status(200)
            .header("Content-Type", "application/json")
            .body(JSON_BODY);
    });
    server.mock(|when, then| {
        when.method(GET).path("/json-charset");
        then.status(200)
            .header("Content-Type", "application/json; charset=utf-8")
            .body(JSON_BODY);
    });
    server.mock(|when, then| {
        when.method(GET).path("/html");
        then.status(200)
            .header("Content-Type", "text/html")
            .body(JSON_BODY);
    });

    let client = client();
    for (path, expected) in [
        ("/json", JSON_BODY),
        ("/json-charset", JSON_BODY),
        ("/html", ""),
    ] {
        let response = client.get(&server.url(path), vec![]).unwrap();
        assert_eq!(response.json().as_ref(), expected.as_bytes(), "path {path}");
        // The body itself is always available.
        assert_eq!(response.text(), JSON_BODY);
    }
}

#[test]
fn test_json_as_typed_value() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/json");
        then.status(200).json_body(json!({"foo": ["bar", "baz"]}));
    });

    let response = client().get(&server.url("/json"), vec![]).unwrap();
    let data: serde_json::Value = response.json_as().unwrap();
    assert_eq!(data["foo"], json!(["bar", "baz"]));
}

#[test]
fn test_head_request_has_no_body() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(HEAD).path("/head");
        then.status(200).header("X-Served", "yes");
    });

    let response = client().head(&server.url("/head"), vec![]).unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-served").unwrap(), "yes");
    assert_eq!(response.len(), 0);
    assert_eq!(response.text(), "");
    mock.assert();
}

#[test]
fn test_post_json() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/post")
            .header("Content-Type", "application/json")
            .json_body(json!({"combined": [{"foo": ["bar", "baz"]}]}));
        then.status(201)
            .header("Content-Type", "application/json")
            .json_body(json!({"created": true}));
    });

    let body = json!({"combined": [{"foo": ["bar", "baz"]}]});
    let response = client()
        .post_json(&server.url("/post"), &body, vec![])
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let data: serde_json::Value = response.json_as().unwrap();
    assert_eq!(data["created"], json!(true));
    mock.assert();
}

#[test]
fn test_post_with_content_type() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/form")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body("name=Ava");
        then.status(200);
    });

    let response = client()
        .post(
            &server.url("/form"),
            "application/x-www-form-urlencoded",
            "name=Ava",
            vec![],
        )
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    mock.assert();
}

#[test]
fn test_marshal_error_is_raised_before_dispatch() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(POST).path("/post");
        then.status(200);
    });

    let mut body = HashMap::new();
    body.insert(vec![1u8, 2], "not representable as a JSON object key");

    let err = client()
        .post_json(&server.url("/post"), &body, vec![])
        .unwrap_err();

    assert!(matches!(err, ClientError::Marshal(_)));
    mock.assert_hits(0);
}

#[test]
fn test_invalid_url() {
    let err = client().get("http//missing-colon", vec![]).unwrap_err();
    assert!(matches!(err, ClientError::InvalidUrl { .. }));
}

#[test]
fn test_get_waits_for_response() {
    let server = MockServer::start();
    let delay = Duration::from_secs(1);

    server.mock(|when, then| {
        when.method(GET).path("/slow");
        then.status(200).body("Hello world!").delay(delay);
    });

    let started = Instant::now();
    let response = client().get(&server.url("/slow"), vec![]).unwrap();

    assert!(started.elapsed() >= delay, "client returned before the server responded");
    assert_eq!(response.text(), "Hello world!");
}

#[test]
fn test_request_timeout() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/slow");
        then.status(200).delay(Duration::from_secs(2));
    });

    let started = Instant::now();
    let err = client()
        .get(
            &server.url("/slow"),
            vec![timeout(Duration::from_millis(500))],
        )
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(err.is_timeout(), "expected a timeout, got {err:?}");
    assert!(elapsed >= Duration::from_millis(450), "timed out too early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1500), "timed out too late: {elapsed:?}");
}

#[test]
fn test_body_readable_after_request_timeout_elapsed() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/get");
        then.status(200).body("Hello world!");
    });

    let client = client();
    let response = client
        .get(
            &server.url("/get"),
            vec![timeout(Duration::from_millis(300))],
        )
        .unwrap();
    thread::sleep(Duration::from_millis(600));

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text(), "Hello world!");

    // Same behaviour as a client-wide default timeout.
    let client = Client::from_config(
        ClientConfig::default().with_timeout(Duration::from_millis(300)),
    )
    .unwrap();
    let response = client.get(&server.url("/get"), vec![]).unwrap();
    thread::sleep(Duration::from_millis(600));
    assert_eq!(response.text(), "Hello world!");
}

#[test]
fn test_client_default_timeout() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/slow");
        then.status(200).delay(Duration::from_secs(2));
    });

    let config = ClientConfig::default().with_timeout(Duration::from_millis(300));
    let client = Client::from_config(config).unwrap();

    let err = client.get(&server.url("/slow"), vec![]).unwrap_err();
    assert!(err.is_timeout(), "expected a timeout, got {err:?}");

    // A per-request timeout takes precedence over the client default.
    server.mock(|when, then| {
        when.method(GET).path("/medium");
        then.status(200).body("done").delay(Duration::from_millis(600));
    });
    let response = client
        .get(&server.url("/medium"), vec![timeout(Duration::from_secs(3))])
        .unwrap();
    assert_eq!(response.text(), "done");
}

#[test]
fn test_connection_refused() {
    let err = client().get(&refused_url(), vec![]).unwrap_err();
    assert!(err.is_transport(), "expected a transport error, got {err:?}");
    assert!(!err.is_timeout());
}

#[test]
fn test_response_metadata() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/cookies");
        then.status(200)
            .header("Set-Cookie", "session=abc123; Path=/; HttpOnly")
            .body("ok");
    });

    let url = server.url("/cookies");
    let response = client().get(&url, vec![]).unwrap();

    assert_eq!(response.url().as_str(), url);
    let cookies = response.cookies();
    assert_eq!(cookies.len(), 1);
    assert_eq!(cookies[0].name, "session");
    assert_eq!(cookies[0].value, "abc123");
    assert_eq!(response.content_length(), Some(2));
}

#[test]
fn test_config_user_agent_and_default_headers() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/ua")
            .header("User-Agent", "rodent/1.0")
            .header("X-Team", "cats");
        then.status(200);
    });

    let config = ClientConfig::default()
        .with_user_agent("rodent/1.0")
        .with_default_header("X-Team", "cats")
        .unwrap();
    let client = Client::from_config(config).unwrap();

    client.get(&server.url("/ua"), vec![]).unwrap();
    mock.assert();
}

#[test]
fn test_cookie_store_replays_cookies() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/login");
        then.status(200).header("Set-Cookie", "session=abc123; Path=/");
    });
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/me")
            .header("Cookie", "session=abc123");
        then.status(200).body("Ava");
    });

    let client = Client::from_config(ClientConfig::default().with_cookie_store(true)).unwrap();
    client.get(&server.url("/login"), vec![]).unwrap();
    let response = client.get(&server.url("/me"), vec![]).unwrap();

    assert_eq!(response.text(), "Ava");
    mock.assert();
}
