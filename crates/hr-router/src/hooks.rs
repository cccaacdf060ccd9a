//! Pluggable steps around routing: classification middleware and
//! clarification prompt writers.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use hr_catalog::ClassificationResult;

use crate::handler::Context;

/// Runs before or after classification.
///
/// Registered with `Router::add_pre_middleware` (called with `None`; a
/// returned classification skips the classifier) or
/// `Router::add_post_middleware` (called with the ensemble result; a
/// returned classification replaces it). Errors are logged and ignored.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn process(
        &self,
        text: &str,
        classification: Option<&ClassificationResult>,
        context: &Context,
    ) -> anyhow::Result<Option<ClassificationResult>>;
}

pub struct FnMiddleware<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(String, Option<ClassificationResult>, Context) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Option<ClassificationResult>>> + Send,
{
    async fn process(
        &self,
        text: &str,
        classification: Option<&ClassificationResult>,
        context: &Context,
    ) -> anyhow::Result<Option<ClassificationResult>> {
        (self.f)(text.to_string(), classification.cloned(), context.clone()).await
    }
}

/// Wrap an async closure taking owned `(text, classification, context)`.
pub fn middleware_fn<F, Fut>(f: F) -> Arc<dyn Middleware>
where
    F: Fn(String, Option<ClassificationResult>, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Option<ClassificationResult>>> + Send + 'static,
{
    Arc::new(FnMiddleware { f })
}

/// Writes the question put to the caller when confidence is too low.
///
/// An error or an empty prompt falls back to the built-in wording.
#[async_trait]
pub trait ClarificationHandler: Send + Sync {
    async fn prompt(
        &self,
        text: &str,
        classification: &ClassificationResult,
        candidates: &[String],
    ) -> anyhow::Result<String>;
}

pub struct FnClarification<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> ClarificationHandler for FnClarification<F>
where
    F: Fn(String, ClassificationResult, Vec<String>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<String>> + Send,
{
    async fn prompt(
        &self,
        text: &str,
        classification: &ClassificationResult,
        candidates: &[String],
    ) -> anyhow::Result<String> {
        (self.f)(text.to_string(), classification.clone(), candidates.to_vec()).await
    }
}

pub fn clarification_fn<F, Fut>(f: F) -> Arc<dyn ClarificationHandler>
where
    F: Fn(String, ClassificationResult, Vec<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
{
    Arc::new(FnClarification { f })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hr_catalog::ClassifierTier;
    use serde_json::json;

    #[tokio::test]
    async fn middleware_closure_sees_classification() {
        let middleware = middleware_fn(|text, classification, context| async move {
            assert_eq!(text, "hi");
            assert_eq!(context["user"], "ada");
            Ok::<_, anyhow::Error>(classification.map(|c| c.with_reasoning("seen")))
        });
        let classification = ClassificationResult::none(ClassifierTier::Rules);

        let before = middleware
            .process("hi", None, &json!({"user": "ada"}))
            .await
            .unwrap();
        assert!(before.is_none());

        let after = middleware
            .process("hi", Some(&classification), &json!({"user": "ada"}))
            .await
            .unwrap();
        assert_eq!(after.unwrap().reasoning.as_deref(), Some("seen"));
    }

    #[tokio::test]
    async fn clarification_closure_gets_candidates() {
        let prompter = clarification_fn(|_, _, candidates| async move {
            Ok::<_, anyhow::Error>(format!("pick one of {}", candidates.join("/")))
        });
        let classification = ClassificationResult::none(ClassifierTier::Ensemble);
        let prompt = prompter
            .prompt("?", &classification, &["greeting".into(), "farewell".into()])
            .await
            .unwrap();
        assert_eq!(prompt, "pick one of greeting/farewell");
    }
}
