//! Shared test harness for end-to-end routing tests.
//!
//! Wires the real catalog, classifiers and router together, with the
//! language model played by a wiremock Ollama server (or an address that
//! refuses connections).

#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hr_catalog::IntentCatalog;
use hr_classify::{LlmBackend, LlmConfig, OllamaBackend, RoutingConfig};
use hr_router::{Handler, Router, handler_fn};

/// Nothing listens on the discard port.
pub const UNREACHABLE_HOST: &str = "http://127.0.0.1:9";

static TRACING: Once = Once::new();

/// Install a test-writer subscriber once per test binary.
/// Filter with `RUST_LOG`, e.g. `RUST_LOG=hr_router=debug`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Helper: build an Ollama chat response carrying `content`.
pub fn ollama_response(content: &str) -> Value {
    json!({
        "model": "llama3.2:3b",
        "message": {
            "role": "assistant",
            "content": content
        },
        "done": true
    })
}

/// Helper: verdict JSON as the model would write it.
pub fn verdict(intent: Option<&str>, confidence: f64) -> String {
    json!({
        "intent": intent,
        "confidence": confidence,
        "slots": {},
        "reasoning": "stubbed verdict"
    })
    .to_string()
}

/// Start an Ollama stub that always answers with `intent` at `confidence`.
pub async fn ollama_stub(intent: Option<&str>, confidence: f64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(ollama_response(&verdict(intent, confidence))),
        )
        .mount(&server)
        .await;
    server
}

pub fn ollama_backend(host: &str) -> Arc<dyn LlmBackend> {
    Arc::new(
        OllamaBackend::new(LlmConfig {
            host: host.to_string(),
            ..LlmConfig::default()
        })
        .unwrap(),
    )
}

/// Number of requests the stub has seen.
pub async fn llm_calls(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or(0)
}

/// Names of the handlers that ran, in order.
#[derive(Clone, Default)]
pub struct HandlerLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl HandlerLog {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// A handler that records `name` and answers `{"handled_by": name}`.
    pub fn recording(&self, name: &'static str) -> Arc<dyn Handler> {
        let calls = self.calls.clone();
        handler_fn(move |_, classification, _| {
            let calls = calls.clone();
            async move {
                calls.lock().unwrap().push(name.to_string());
                Ok::<_, anyhow::Error>(json!({
                    "handled_by": name,
                    "slots": classification.extracted_slots,
                }))
            }
        })
    }

    /// A handler that records `name` and then fails.
    pub fn failing(&self, name: &'static str, message: &'static str) -> Arc<dyn Handler> {
        let calls = self.calls.clone();
        handler_fn(move |_, _, _| {
            let calls = calls.clone();
            async move {
                calls.lock().unwrap().push(name.to_string());
                Err::<Value, _>(anyhow::anyhow!(message))
            }
        })
    }
}

/// End-to-end harness: a configured router plus a log of handler calls.
pub struct TestHarness {
    pub router: Router,
    pub log: HandlerLog,
}

impl TestHarness {
    /// Router over the default catalog with `backend` as its model.
    pub fn new(config: RoutingConfig, backend: Option<Arc<dyn LlmBackend>>) -> Self {
        init_tracing();
        let catalog = Arc::new(IntentCatalog::with_defaults().unwrap());
        Self {
            router: Router::with_backend(catalog, config, backend).unwrap(),
            log: HandlerLog::default(),
        }
    }

    /// Router backed by the Ollama stub at `server`.
    pub fn with_ollama(config: RoutingConfig, server: &MockServer) -> Self {
        Self::new(config, Some(ollama_backend(&server.uri())))
    }

    /// Router whose model server refuses connections.
    pub fn unreachable(config: RoutingConfig) -> Self {
        Self::new(config, Some(ollama_backend(UNREACHABLE_HOST)))
    }

    /// The handler set used across scenarios: social, files, reminders,
    /// plus a fallback. `file_delete_handler` always fails.
    pub fn with_standard_handlers(self) -> Self {
        self.router
            .handler("greeting_handler")
            .intents(["greeting", "farewell", "gratitude"])
            .describe("Social replies")
            .register(self.log.recording("greeting_handler"))
            .unwrap();
        self.router
            .handler("file_delete_handler")
            .intent("file_delete")
            .describe("Deletes files")
            .register(self.log.failing("file_delete_handler", "permission denied"))
            .unwrap();
        self.router
            .handler("reminder_handler")
            .intent("create_reminder")
            .register(self.log.recording("reminder_handler"))
            .unwrap();
        self.router
            .set_fallback_handler(self.log.recording("fallback"));
        self
    }
}
