//! Live Server Tests
//!
//! Serves the router on a real socket with background tasks running and
//! talks to it over HTTP.

use std::sync::Arc;
use std::time::Duration;

use cache_node::{
    api::create_router,
    cache::{CacheEngine, CacheMetrics, FixedProbe, MemoryCapacity, BYTES_PER_MB},
    spawn_sampler_task, spawn_trim_task, AppState, MetricsSampler,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

struct TestNode {
    base: String,
    cancel: CancellationToken,
}

async fn start_node(limit_bytes: u64) -> TestNode {
    let metrics = Arc::new(CacheMetrics::new());
    let engine = Arc::new(CacheEngine::new(
        MemoryCapacity::from_bytes(limit_bytes),
        metrics.clone(),
    ));
    let cancel = CancellationToken::new();

    spawn_trim_task(engine.clone(), Duration::from_millis(50), cancel.clone());
    let sampler = MetricsSampler::new(
        engine.clone(),
        Arc::new(FixedProbe(8 * BYTES_PER_MB)),
        metrics.clone(),
    );
    spawn_sampler_task(Arc::new(sampler), Duration::from_millis(50), cancel.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(AppState::new(engine, metrics));
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .unwrap();
    });

    TestNode {
        base: format!("http://{}", addr),
        cancel,
    }
}

#[tokio::test]
async fn test_live_roundtrip_and_metrics() {
    let node = start_node(64 * BYTES_PER_MB).await;
    let client = reqwest::Client::new();

    let response = client
        .put(format!("{}/entries/greeting", node.base))
        .body("hello")
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let body = client
        .get(format!("{}/entries/greeting", node.base))
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    assert_eq!(&body[..], b"hello");

    // Give the sampler a couple of ticks
    tokio::time::sleep(Duration::from_millis(150)).await;

    let stats: Value = client
        .get(format!("{}/stats", node.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["count"], 1);
    assert_eq!(stats["metrics"]["object_count"], 1);
    assert_eq!(stats["metrics"]["memory_usage_mb"], 8);
    assert_eq!(stats["metrics"]["memory_usage_limit_mb"], 64);

    node.cancel.cancel();
}

#[tokio::test]
async fn test_live_trim_keeps_interned_content() {
    // Tiny ceiling: every normal entry is over budget
    let node = start_node(1).await;
    let client = reqwest::Client::new();

    client
        .put(format!("{}/entries/scratch", node.base))
        .body("evict me")
        .send()
        .await
        .unwrap();
    client
        .put(format!("{}/interned/doc", node.base))
        .body("keep me")
        .send()
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;

    let scratch = client
        .get(format!("{}/entries/scratch", node.base))
        .send()
        .await
        .unwrap();
    assert_eq!(scratch.status(), reqwest::StatusCode::NOT_FOUND);

    let doc = client
        .get(format!("{}/entries/doc", node.base))
        .send()
        .await
        .unwrap();
    assert_eq!(doc.bytes().await.unwrap().as_ref(), b"keep me");

    node.cancel.cancel();
}
