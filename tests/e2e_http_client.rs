//! End-to-End Test Suite: client workflow against a mock JSON API
//!
//! Walks the typical lifecycle of a shared client: configure defaults, issue
//! requests from several tasks, install interceptors, observe events, abort
//! everything in flight and keep going.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use courier_http::{
    shared_client, ClientConfig, EventKind, HttpClient, HttpError, Interceptors, Payload,
    RequestConfig, RequestOptions, Result,
};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock API with a posts collection, a slow endpoint and a failing endpoint
async fn start_api() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/posts/\d+$"))
        .and(header("Authorization", "Bearer my-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "title": "foo"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/posts/\d+$"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "unauthorized"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 101})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fail"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    server
}

#[tokio::test]
async fn test_client_lifecycle_workflow() {
    let server = start_api().await;
    let base = server.uri();
    let client = shared_client(ClientConfig::fetch_style()).expect("Failed to create client");

    // Without credentials the API refuses
    let err = client
        .get::<Value>(&format!("{base}/posts/1"), None)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(401));

    // Defaults add credentials to every call
    client.set_defaults(RequestOptions::new().with_headers([
        ("Authorization", "Bearer my-token"),
        ("Content-Type", "application/json"),
    ]));
    let post: Value = client
        .get(&format!("{base}/posts/2"), None)
        .await
        .expect("authorized GET should succeed");
    assert_eq!(post["title"], "foo");

    let created: Value = client
        .post(&format!("{base}/posts"), &json!({"title": "foo", "body": "bar", "userId": 1}), None)
        .await
        .expect("POST should succeed");
    assert_eq!(created["id"], 101);

    // Concurrent requests from several tasks share the client
    let handles: Vec<_> = (1..=5)
        .map(|id| {
            let client = client.clone();
            let url = format!("{base}/posts/{id}");
            tokio::spawn(async move { client.get::<Value>(&url, None).await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
}

#[tokio::test]
async fn test_interceptors_and_events_workflow() {
    let server = start_api().await;
    let base = server.uri();
    let client = HttpClient::new(ClientConfig::default()).expect("Failed to create client");

    let failures = Arc::new(AtomicUsize::new(0));
    let counter = failures.clone();
    client.on(EventKind::RequestFailed, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    client.set_interceptors(
        Interceptors::new()
            .with_request(|config: RequestConfig| -> Result<RequestConfig> {
                Ok(config.with_header("Authorization", "Bearer my-token"))
            })
            .with_response(|payload: Payload| -> Result<Payload> {
                let mut value = payload.into_value();
                value["intercepted"] = json!(true);
                Ok(Payload::Json(value))
            })
            .with_response_error(|err: HttpError| -> Result<Payload> {
                match err.status() {
                    Some(500) => Ok(Payload::Json(json!({"degraded": true}))),
                    _ => Err(err),
                }
            }),
    );

    let post: Value = client.get(&format!("{base}/posts/3"), None).await.unwrap();
    assert_eq!(post["intercepted"], true);

    let degraded: Value = client.get(&format!("{base}/fail"), None).await.unwrap();
    assert_eq!(degraded, json!({"degraded": true}));

    // Status failures are not transport failures
    assert_eq!(failures.load(Ordering::SeqCst), 0);

    let err = client
        .get::<Value>(
            &format!("{base}/slow"),
            Some(RequestOptions::new().with_timeout_ms(100)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, HttpError::Timeout(_)));
    assert_eq!(failures.load(Ordering::SeqCst), 1);

    client.clear_interceptors();
    let err = client
        .get::<Value>(&format!("{base}/fail"), None)
        .await
        .unwrap_err();
    assert_eq!(err.body(), Some(&Payload::Text("boom".to_string())));
}

#[tokio::test]
async fn test_abort_workflow() {
    let server = start_api().await;
    let base = server.uri();
    let client = shared_client(ClientConfig::default()).expect("Failed to create client");
    client.set_defaults(RequestOptions::new().with_header("Authorization", "Bearer my-token"));

    let pending: Vec<_> = (0..3)
        .map(|_| {
            let client = client.clone();
            let url = format!("{base}/slow");
            tokio::spawn(async move { client.get::<Value>(&url, None).await })
        })
        .collect();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(client.abort(Some("user navigated away")));
    for handle in pending {
        match handle.await.unwrap() {
            Err(HttpError::Aborted { reason }) => {
                assert_eq!(reason.as_deref(), Some("user navigated away"))
            }
            other => panic!("expected aborted request, got {other:?}"),
        }
    }
    assert_eq!(client.abort_generation(), 1);

    // Aborting with nothing in flight still succeeds
    assert!(client.abort(None));

    let post: Value = client
        .get(&format!("{base}/posts/1"), None)
        .await
        .expect("client should keep working after abort");
    assert_eq!(post["id"], 1);
}
