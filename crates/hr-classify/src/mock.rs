//! Scripted language-model backend for testing without a model server.
//!
//! Replies are played back in order; once the script runs out the last
//! reply repeats. Every prompt is recorded for assertion in tests.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ClassifyError, ClassifyResult};
use crate::llm::LlmBackend;

/// Mock implementation of the `LlmBackend` trait.
pub struct MockBackend {
    script: Vec<ClassifyResult<String>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockBackend {
    /// Always answer with `raw` model text.
    pub fn replying(raw: &str) -> Self {
        Self::scripted(vec![Ok(raw.to_string())])
    }

    /// Always answer with a well-formed verdict.
    pub fn verdict(intent: Option<&str>, confidence: f64) -> Self {
        Self::replying(&verdict_json(intent, confidence))
    }

    /// Always fail as if the server were down.
    pub fn unavailable() -> Self {
        Self::scripted(vec![Err(ClassifyError::BackendUnavailable(
            "mock backend offline".into(),
        ))])
    }

    pub fn scripted(script: Vec<ClassifyResult<String>>) -> Self {
        Self {
            script,
            prompts: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Queue another reply after the current script.
    pub fn then(mut self, reply: ClassifyResult<String>) -> Self {
        self.script.push(reply);
        self
    }

    /// Sleep before every reply (honours a paused tokio clock).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `complete` calls so far.
    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

/// JSON verdict in the shape the classifier expects.
pub fn verdict_json(intent: Option<&str>, confidence: f64) -> String {
    serde_json::json!({
        "intent": intent,
        "confidence": confidence,
        "slots": {},
        "reasoning": "mock verdict",
    })
    .to_string()
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn complete(&self, prompt: &str) -> ClassifyResult<String> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap_or_else(PoisonError::into_inner);
            prompts.push(prompt.to_string());
            prompts.len() - 1
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.script.get(call).or_else(|| self.script.last()) {
            Some(reply) => reply.clone(),
            None => Err(ClassifyError::BackendUnavailable("mock script is empty".into())),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plays_script_then_repeats_last() {
        let mock = MockBackend::verdict(Some("greeting"), 0.9).then(Err(
            ClassifyError::MalformedResponse("garbage".into()),
        ));

        assert!(mock.complete("a").await.unwrap().contains("greeting"));
        assert!(mock.complete("b").await.is_err());
        assert!(mock.complete("c").await.is_err());
        assert_eq!(mock.calls(), 3);
        assert_eq!(mock.prompts(), vec!["a", "b", "c"]);
        assert_eq!(mock.last_prompt().as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn empty_script_fails() {
        let mock = MockBackend::scripted(Vec::new());
        assert!(matches!(
            mock.complete("x").await,
            Err(ClassifyError::BackendUnavailable(_))
        ));
    }

    #[test]
    fn verdict_json_shape() {
        let value: serde_json::Value =
            serde_json::from_str(&verdict_json(None, 0.0)).unwrap();
        assert!(value["intent"].is_null());
        assert_eq!(value["confidence"], 0.0);
    }
}
