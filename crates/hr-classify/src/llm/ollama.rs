//! Ollama chat backend (`POST {host}/api/chat`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{LlmBackend, SYSTEM_PROMPT};
use crate::config::LlmConfig;
use crate::error::{ClassifyError, ClassifyResult};

/// Ollama chat API request body.
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    format: &'a str,
    stream: bool,
    options: Options,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Options {
    temperature: f32,
    num_predict: u32,
}

/// Ollama chat API response (only fields we need).
#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Client for a local Ollama server.
pub struct OllamaBackend {
    client: reqwest::Client,
    config: LlmConfig,
}

impl OllamaBackend {
    /// The classifier bounds each call with its own timeout, so the HTTP
    /// client carries none.
    pub fn new(config: LlmConfig) -> ClassifyResult<Self> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            ClassifyError::BackendUnavailable(format!("failed to build http client: {e}"))
        })?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    async fn complete(&self, prompt: &str) -> ClassifyResult<String> {
        let url = format!("{}/api/chat", self.config.host.trim_end_matches('/'));

        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            format: "json",
            stream: false,
            options: Options {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClassifyError::BackendUnavailable(format!("ollama request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ClassifyError::BackendUnavailable(format!(
                "ollama returned {}",
                response.status()
            )));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            ClassifyError::MalformedResponse(format!("unreadable ollama response body: {e}"))
        })?;

        chat.message
            .map(|m| m.content)
            .ok_or_else(|| ClassifyError::MalformedResponse("ollama response has no message".into()))
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Helper: build an Ollama chat response body.
    fn ollama_response(content: &str) -> serde_json::Value {
        serde_json::json!({
            "model": "llama3.2:3b",
            "message": {
                "role": "assistant",
                "content": content
            },
            "done": true
        })
    }

    fn backend_for(server: &MockServer) -> OllamaBackend {
        OllamaBackend::new(LlmConfig {
            host: server.uri(),
            ..LlmConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn complete_returns_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama3.2:3b",
                "format": "json",
                "stream": false,
                "options": {"num_predict": 150}
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(ollama_response(r#"{"intent": "greeting", "confidence": 0.9}"#)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let content = backend_for(&server).complete("classify this").await.unwrap();
        assert_eq!(content, r#"{"intent": "greeting", "confidence": 0.9}"#);
    }

    #[tokio::test]
    async fn trailing_slash_in_host() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ollama_response("{}")))
            .mount(&server)
            .await;

        let backend = OllamaBackend::new(LlmConfig {
            host: format!("{}/", server.uri()),
            ..LlmConfig::default()
        })
        .unwrap();
        assert_eq!(backend.complete("x").await.unwrap(), "{}");
    }

    #[tokio::test]
    async fn server_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = backend_for(&server).complete("x").await.unwrap_err();
        assert!(matches!(err, ClassifyError::BackendUnavailable(_)), "{err}");
    }

    #[tokio::test]
    async fn missing_message_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"done": true})))
            .mount(&server)
            .await;

        let err = backend_for(&server).complete("x").await.unwrap_err();
        assert!(matches!(err, ClassifyError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = backend_for(&server).complete("x").await.unwrap_err();
        assert!(matches!(err, ClassifyError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_unavailable() {
        let backend = OllamaBackend::new(LlmConfig {
            host: "http://127.0.0.1:9".into(),
            ..LlmConfig::default()
        })
        .unwrap();
        let err = backend.complete("x").await.unwrap_err();
        assert!(matches!(err, ClassifyError::BackendUnavailable(_)));
    }
}
