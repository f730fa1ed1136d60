//! End-to-end proxy tests
//!
//! Real sockets on both sides: a fake upstream served by axum, the reqwest
//! upstream adapter, and the Tilepace router in front of the paced queue.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;

use tilepace_api_http::{HttpServer, HttpServerConfig, ServerHandle};
use tilepace_core::application::{MapProxyService, PacedQueue};
use tilepace_core::domain::QueueConfig;
use tilepace_infra_http::{ReqwestUpstream, UpstreamConfig};

#[derive(Debug, Clone)]
struct Hit {
    path: String,
    query: Option<String>,
    at: Instant,
}

#[derive(Clone, Default)]
struct FakeUpstream {
    hits: Arc<Mutex<Vec<Hit>>>,
}

impl FakeUpstream {
    fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    fn paths(&self) -> Vec<String> {
        self.hits().into_iter().map(|h| h.path).collect()
    }
}

async fn fake_handler(
    State(fake): State<FakeUpstream>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    fake.hits.lock().unwrap().push(Hit {
        path: path.clone(),
        query: query.clone(),
        at: Instant::now(),
    });

    if path.starts_with("slow/") {
        tokio::time::sleep(Duration::from_millis(300)).await;
    }
    if path.starts_with("missing/") {
        return (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"}))).into_response();
    }
    Json(json!({"path": path, "query": query})).into_response()
}

async fn spawn_fake_upstream() -> (FakeUpstream, String) {
    let fake = FakeUpstream::default();
    let app = Router::new()
        .route("/{*path}", get(fake_handler))
        .with_state(fake.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (fake, format!("http://{}", addr))
}

struct Stack {
    base: String,
    queue: Arc<PacedQueue>,
    _handle: ServerHandle,
}

async fn spawn_stack(
    upstream_url: &str,
    token: Option<&str>,
    capacity: usize,
    pacing: Duration,
) -> Stack {
    let upstream = ReqwestUpstream::new(UpstreamConfig {
        base_url: upstream_url.to_string(),
        access_token: token.map(str::to_string),
        timeout: Duration::from_secs(5),
    })
    .unwrap();

    let queue = Arc::new(PacedQueue::new(QueueConfig::new("e2e", capacity, pacing)));
    let service = Arc::new(MapProxyService::new(queue.clone(), Arc::new(upstream)));

    let handle = HttpServer::new(
        HttpServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        service,
    )
    .start()
    .await
    .unwrap();

    Stack {
        base: format!("http://{}", handle.local_addr()),
        queue,
        _handle: handle,
    }
}

async fn get_status(url: String) -> u16 {
    reqwest::get(url).await.unwrap().status().as_u16()
}

#[tokio::test]
async fn test_relays_body_with_json_content_type_and_token() {
    let (fake, upstream_url) = spawn_fake_upstream().await;
    let stack = spawn_stack(&upstream_url, Some("pk.test"), 100, Duration::from_millis(10)).await;

    let response = reqwest::get(format!(
        "{}/map-proxy/styles/v1/acme/streets?optimize=true",
        stack.base
    ))
    .await
    .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/json"
    );
    let body: serde_json::Value = serde_json::from_str(&response.text().await.unwrap()).unwrap();
    assert_eq!(body["path"], "styles/v1/acme/streets");

    let hits = fake.hits();
    assert_eq!(hits.len(), 1);
    assert_eq!(
        hits[0].query.as_deref(),
        Some("optimize=true&access_token=pk.test")
    );
}

#[tokio::test]
async fn test_encoded_query_and_fragment_chars_stay_in_path() {
    let (fake, upstream_url) = spawn_fake_upstream().await;
    let stack = spawn_stack(&upstream_url, Some("pk.test"), 100, Duration::from_millis(10)).await;

    let status = get_status(format!(
        "{}/map-proxy/fonts/Open%20Sans%3Fbold%23x/0-255.pbf?v=1",
        stack.base
    ))
    .await;
    assert_eq!(status, 200);

    let hits = fake.hits();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].path, "fonts/Open Sans?bold#x/0-255.pbf");
    assert_eq!(hits[0].query.as_deref(), Some("v=1&access_token=pk.test"));
}

#[tokio::test]
async fn test_upstream_status_is_relayed() {
    let (_fake, upstream_url) = spawn_fake_upstream().await;
    let stack = spawn_stack(&upstream_url, None, 100, Duration::from_millis(10)).await;

    let response = reqwest::get(format!("{}/map-proxy/missing/style", stack.base))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/json"
    );
    assert!(response.text().await.unwrap().contains("Not Found"));
}

#[tokio::test]
async fn test_concurrent_requests_are_paced() {
    let pacing = Duration::from_millis(50);
    let (fake, upstream_url) = spawn_fake_upstream().await;
    let stack = spawn_stack(&upstream_url, None, 100, pacing).await;

    let mut handles = Vec::new();
    for i in 0..4 {
        handles.push(tokio::spawn(get_status(format!(
            "{}/map-proxy/tiles/{}",
            stack.base, i
        ))));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), 200);
    }

    let hits = fake.hits();
    assert_eq!(hits.len(), 4);
    for pair in hits.windows(2) {
        let gap = pair[1].at.duration_since(pair[0].at);
        assert!(gap >= pacing, "upstream calls only {:?} apart", gap);
    }
}

#[tokio::test]
async fn test_upstream_sees_requests_in_arrival_order() {
    let (fake, upstream_url) = spawn_fake_upstream().await;
    let stack = spawn_stack(&upstream_url, None, 100, Duration::from_millis(10)).await;

    let mut handles = vec![tokio::spawn(get_status(format!(
        "{}/map-proxy/slow/first",
        stack.base
    )))];
    tokio::time::sleep(Duration::from_millis(50)).await;

    for name in ["a", "b", "c"] {
        handles.push(tokio::spawn(get_status(format!(
            "{}/map-proxy/tiles/{}",
            stack.base, name
        ))));
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), 200);
    }

    assert_eq!(
        fake.paths(),
        vec!["slow/first", "tiles/a", "tiles/b", "tiles/c"]
    );
}

#[tokio::test]
async fn test_full_queue_answers_503_with_retry_after() {
    let (_fake, upstream_url) = spawn_fake_upstream().await;
    let stack = spawn_stack(&upstream_url, None, 2, Duration::from_millis(10)).await;

    // One request executing, two waiting
    let mut handles = vec![tokio::spawn(get_status(format!(
        "{}/map-proxy/slow/1",
        stack.base
    )))];
    tokio::time::sleep(Duration::from_millis(50)).await;
    for i in 2..=3 {
        handles.push(tokio::spawn(get_status(format!(
            "{}/map-proxy/slow/{}",
            stack.base, i
        ))));
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(stack.queue.size(), 2);

    let rejected = reqwest::get(format!("{}/map-proxy/tiles/overflow", stack.base))
        .await
        .unwrap();
    assert_eq!(rejected.status().as_u16(), 503);
    assert_eq!(rejected.headers()["retry-after"].to_str().unwrap(), "1");
    let body: serde_json::Value = serde_json::from_str(&rejected.text().await.unwrap()).unwrap();
    assert_eq!(body["error"]["code"], "queue_full");

    for handle in handles {
        assert_eq!(handle.await.unwrap(), 200);
    }
    assert_eq!(stack.queue.stats().rejected, 1);
}

#[tokio::test]
async fn test_unreachable_upstream_does_not_wedge_queue() {
    // Bind then drop to get a port nobody listens on
    let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let closed_url = format!("http://{}", closed.local_addr().unwrap());
    drop(closed);

    let stack = spawn_stack(&closed_url, None, 100, Duration::from_millis(10)).await;

    for i in 0..2 {
        let status = get_status(format!("{}/map-proxy/tiles/{}", stack.base, i)).await;
        assert_eq!(status, 502);
    }

    tokio::time::timeout(Duration::from_secs(2), stack.queue.wait_idle())
        .await
        .expect("queue should go idle after failures");

    let health: serde_json::Value = serde_json::from_str(
        &reqwest::get(format!("{}/health", stack.base))
            .await
            .unwrap()
            .text()
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(health["queue"]["failed"], 2);
    assert_eq!(health["queue"]["processing"], false);
    assert_eq!(health["queue"]["size"], 0);
}
