//! E2E: concurrent routing, live registration and cancellation.

mod helpers;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tokio::task::JoinSet;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hr_classify::RoutingConfig;
use hr_router::RouteStatus;

use helpers::{TestHarness, ollama_response, ollama_stub, verdict};

async fn slow_server(delay: Duration) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ollama_response(&verdict(Some("greeting"), 0.9)))
                .set_delay(delay),
        )
        .mount(&server)
        .await;
    server
}

// ── Shared router ──────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn e2e_concurrent_routes_share_one_router() {
    let server = ollama_stub(Some("greeting"), 0.9).await;
    let harness =
        TestHarness::with_ollama(RoutingConfig::default(), &server).with_standard_handlers();
    let router = Arc::new(harness.router);

    let mut tasks = JoinSet::new();
    for i in 0..32 {
        let router = router.clone();
        tasks.spawn(async move {
            // Unknown input goes through the model, which answers greeting.
            let text = match i % 3 {
                0 => "Hi there!",
                1 => "remind me to call mom at 5pm",
                _ => "xyzzy plugh",
            };
            (i, router.route(text, &json!({ "request": i })).await)
        });
    }

    let mut seen = 0;
    while let Some(joined) = tasks.join_next().await {
        let (i, result) = joined.unwrap();
        let expected = if i % 3 == 1 { "reminder_handler" } else { "greeting_handler" };
        assert!(result.is_dispatched(), "request {i}: {:?}", result.status);
        assert_eq!(result.handler_name.as_deref(), Some(expected));
        seen += 1;
    }
    assert_eq!(seen, 32);
    assert_eq!(harness.log.calls().len(), 32);
    assert_eq!(helpers::llm_calls(&server).await, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn e2e_registration_while_routing() {
    let harness = TestHarness::new(RoutingConfig::for_low_latency(), None);
    let log = harness.log.clone();
    let router = Arc::new(harness.router);
    router.set_fallback_handler(log.recording("fallback"));

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let router = router.clone();
        tasks.spawn(async move {
            let mut statuses = Vec::new();
            for _ in 0..25 {
                statuses.push(router.route("bye for now", &json!({})).await.status);
                tokio::task::yield_now().await;
            }
            statuses
        });
    }

    let registrar = router.clone();
    let farewell = log.recording("farewell_handler");
    tasks.spawn(async move {
        tokio::task::yield_now().await;
        registrar
            .handler("farewell_handler")
            .intent("farewell")
            .register(farewell)
            .unwrap();
        Vec::new()
    });

    while let Some(joined) = tasks.join_next().await {
        for status in joined.unwrap() {
            assert!(
                matches!(status, RouteStatus::Dispatched | RouteStatus::Fallback),
                "unexpected status {status:?}"
            );
        }
    }

    let result = router.route("bye for now", &json!({})).await;
    assert_eq!(result.handler_name.as_deref(), Some("farewell_handler"));
}

// ── Deadlines ──────────────────────────────────────────────────

#[tokio::test]
async fn e2e_slow_model_bounded_by_llm_timeout() {
    let server = slow_server(Duration::from_secs(5)).await;
    let config = RoutingConfig {
        llm_timeout_ms: 200,
        ..RoutingConfig::default()
    };
    let harness = TestHarness::with_ollama(config, &server).with_standard_handlers();

    let started = Instant::now();
    let result = harness.router.route("the lamp", &json!({})).await;

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(result.classification.intent_name(), Some("lights_control"));
    assert_eq!(result.status, RouteStatus::ClarificationRequested);
}

#[tokio::test]
async fn e2e_cancelled_route_leaves_router_usable() {
    let server = slow_server(Duration::from_secs(5)).await;
    let harness =
        TestHarness::with_ollama(RoutingConfig::default(), &server).with_standard_handlers();

    let cancelled = tokio::time::timeout(
        Duration::from_millis(100),
        harness.router.route("xyzzy plugh", &json!({})),
    )
    .await;
    assert!(cancelled.is_err(), "route should still be waiting on the model");
    assert!(harness.log.calls().is_empty());

    let result = harness.router.route("Hi there!", &json!({})).await;
    assert!(result.is_dispatched());
    assert_eq!(harness.log.calls(), vec!["greeting_handler"]);
}
