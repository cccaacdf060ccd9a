//! OpenAI-compatible chat backend (`POST {host}/v1/chat/completions`).
//!
//! Spoken by llama.cpp's server, vLLM and LM Studio.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{LlmBackend, SYSTEM_PROMPT};
use crate::config::LlmConfig;
use crate::error::{ClassifyError, ClassifyResult};

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiCompatBackend {
    client: reqwest::Client,
    config: LlmConfig,
}

impl OpenAiCompatBackend {
    pub fn new(config: LlmConfig) -> ClassifyResult<Self> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            ClassifyError::BackendUnavailable(format!("failed to build http client: {e}"))
        })?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatBackend {
    async fn complete(&self, prompt: &str) -> ClassifyResult<String> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let body = CompletionRequest {
            model: &self.config.model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            ClassifyError::BackendUnavailable(format!("completion request failed: {e}"))
        })?;

        if !response.status().is_success() {
            return Err(ClassifyError::BackendUnavailable(format!(
                "completion server returned {}",
                response.status()
            )));
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            ClassifyError::MalformedResponse(format!("unreadable completion body: {e}"))
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ClassifyError::MalformedResponse("completion has no content".into()))
    }

    fn name(&self) -> &str {
        "openai_compatible"
    }
}
