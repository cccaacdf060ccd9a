//! Language-model classifier.
//!
//! Builds a prompt listing every catalog intent, sends it to an
//! `LlmBackend` under a timeout, and parses the JSON verdict back into a
//! `ClassificationResult`. Backends:
//! - **Ollama** (`/api/chat`), the default local server.
//! - **OpenAI-compatible** (`/v1/chat/completions`) for llama.cpp / vLLM.

pub mod ollama;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use hr_catalog::{ClassificationResult, ClassifierTier, Intent, IntentCatalog, Slots};

use crate::config::{BackendKind, LlmConfig};
use crate::error::{ClassifyError, ClassifyResult};

pub use ollama::OllamaBackend;
pub use openai::OpenAiCompatBackend;

/// System message sent alongside every prompt.
pub(crate) const SYSTEM_PROMPT: &str =
    "You are an intent classifier. Respond with a single JSON object and nothing else.";

/// Examples listed per intent in the prompt.
const PROMPT_EXAMPLES: usize = 3;

/// Intent names a model may use to say "nothing fits".
const NO_INTENT: &[&str] = &["", "none", "null", "unknown"];

/// Request/response text-completion service.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Send a prompt and return the raw model text.
    async fn complete(&self, prompt: &str) -> ClassifyResult<String>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Build the backend selected by `config.backend`.
pub fn backend_from_config(config: &LlmConfig) -> ClassifyResult<Arc<dyn LlmBackend>> {
    Ok(match config.backend {
        BackendKind::Ollama => Arc::new(OllamaBackend::new(config.clone())?),
        BackendKind::OpenaiCompatible => Arc::new(OpenAiCompatBackend::new(config.clone())?),
    })
}

/// Asks a language model which catalog intent an input belongs to.
#[derive(Clone)]
pub struct LlmClassifier {
    catalog: Arc<IntentCatalog>,
    backend: Arc<dyn LlmBackend>,
    timeout: Duration,
}

impl LlmClassifier {
    pub fn new(catalog: Arc<IntentCatalog>, backend: Arc<dyn LlmBackend>, timeout: Duration) -> Self {
        Self {
            catalog,
            backend,
            timeout,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Classify `text`.
    ///
    /// Fails with `BackendUnavailable` on transport errors or timeout and with
    /// `MalformedResponse` when the verdict cannot be used.
    pub async fn classify(&self, text: &str) -> ClassifyResult<ClassificationResult> {
        let intents = self.catalog.all();
        let prompt = build_prompt(&intents, text);

        let raw = tokio::time::timeout(self.timeout, self.backend.complete(&prompt))
            .await
            .map_err(|_| {
                ClassifyError::BackendUnavailable(format!(
                    "{} timed out after {}ms",
                    self.backend.name(),
                    self.timeout.as_millis()
                ))
            })??;

        let result = parse_verdict(&raw, &intents)?;
        tracing::debug!(
            tier = "llm",
            backend = self.backend.name(),
            intent = result.intent_name().unwrap_or("none"),
            confidence = result.confidence,
            "llm classification"
        );
        Ok(result)
    }
}

/// Render the classification prompt for `text`.
pub fn build_prompt(intents: &[Arc<Intent>], text: &str) -> String {
    let mut prompt = String::from(
        "Classify the user's message into exactly one of the intents below.\n\nIntents:\n",
    );
    for intent in intents {
        prompt.push_str(&format!("- {}: {}\n", intent.name, intent.description));
        let examples: Vec<String> = intent
            .examples
            .iter()
            .take(PROMPT_EXAMPLES)
            .map(|e| format!("\"{e}\""))
            .collect();
        if !examples.is_empty() {
            prompt.push_str(&format!("  examples: {}\n", examples.join(", ")));
        }
    }

    // serde_json quoting keeps stray quotes in the input from breaking the frame
    let quoted = serde_json::to_string(text).unwrap_or_else(|_| format!("\"{text}\""));
    prompt.push_str(&format!(
        r#"
Message: {quoted}

Respond with ONLY a JSON object:
{{"intent": "<intent name or null>", "confidence": <0.0-1.0>, "slots": {{"<slot>": "<value>"}}, "reasoning": "<one sentence>"}}

Use null for the intent when none of the listed intents fits."#
    ));
    prompt
}

/// Raw verdict before validation.
#[derive(Deserialize)]
struct Verdict {
    intent: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    slots: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    reasoning: Option<String>,
}

fn parse_verdict(raw: &str, intents: &[Arc<Intent>]) -> ClassifyResult<ClassificationResult> {
    let json = extract_json(raw);
    let verdict: Verdict = serde_json::from_str(json).map_err(|e| {
        ClassifyError::MalformedResponse(format!("invalid verdict JSON ({e}): {}", truncate(raw)))
    })?;

    let name = verdict
        .intent
        .map(|n| n.trim().to_string())
        .filter(|n| !NO_INTENT.contains(&n.to_ascii_lowercase().as_str()));

    let Some(name) = name else {
        let result = ClassificationResult::none(ClassifierTier::Llm);
        return Ok(match verdict.reasoning {
            Some(reasoning) => result.with_reasoning(reasoning),
            None => result,
        });
    };

    let intent = intents
        .iter()
        .find(|i| i.name == name)
        .cloned()
        .ok_or_else(|| ClassifyError::MalformedResponse(format!("unknown intent: {name}")))?;

    let slots = verdict.slots.map(stringify_slots).unwrap_or_default();
    let result = ClassificationResult::new(
        intent,
        verdict.confidence.unwrap_or(0.0),
        ClassifierTier::Llm,
    )
    .with_slots(slots);

    Ok(match verdict.reasoning {
        Some(reasoning) => result.with_reasoning(reasoning),
        None => result,
    })
}

/// Strings kept as-is, other scalars rendered as JSON, nulls and blanks dropped.
fn stringify_slots(slots: serde_json::Map<String, Value>) -> Slots {
    slots
        .into_iter()
        .filter_map(|(name, value)| {
            let value = match value {
                Value::Null => return None,
                Value::String(s) => s.trim().to_string(),
                other => other.to_string(),
            };
            (!value.is_empty()).then_some((name, value))
        })
        .collect()
}

/// Pull the JSON object out of model text that may be wrapped in markdown
/// fences or surrounded by prose.
pub(crate) fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();

    // ```json ... ```
    if let Some(start) = trimmed.find("```json") {
        let after_fence = &trimmed[start + 7..];
        if let Some(end) = after_fence.find("```") {
            return after_fence[..end].trim();
        }
    }

    // ``` ... ```
    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        if let Some(end) = after_fence.find("```") {
            return after_fence[..end].trim();
        }
    }

    // Outermost braces
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

fn truncate(text: &str) -> String {
    const MAX: usize = 200;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
