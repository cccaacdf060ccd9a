//! Handler trait and closure adapter.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use hr_catalog::ClassificationResult;

/// Caller-supplied context passed through to handlers untouched.
pub type Context = Value;

/// Business logic bound to one or more intents.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Act on a routed request. Errors are reported in the `RouterResult`,
    /// they never abort routing.
    async fn handle(
        &self,
        text: &str,
        classification: &ClassificationResult,
        context: &Context,
    ) -> anyhow::Result<Value>;
}

/// Adapts an async closure to `Handler`.
pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(String, ClassificationResult, Context) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    async fn handle(
        &self,
        text: &str,
        classification: &ClassificationResult,
        context: &Context,
    ) -> anyhow::Result<Value> {
        (self.f)(text.to_string(), classification.clone(), context.clone()).await
    }
}

/// Wrap an async closure taking owned `(text, classification, context)`.
///
/// ```ignore
/// let greet = handler_fn(|_, _, _| async {
///     Ok::<_, anyhow::Error>(serde_json::json!({"reply": "Hello!"}))
/// });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn Handler>
where
    F: Fn(String, ClassificationResult, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Arc::new(FnHandler { f })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hr_catalog::ClassifierTier;
    use serde_json::json;

    #[tokio::test]
    async fn closure_receives_arguments() {
        let handler = handler_fn(|text, classification, context| async move {
            Ok::<_, anyhow::Error>(json!({
                "text": text,
                "intent": classification.intent_name(),
                "user": context["user"],
            }))
        });
        let classification = ClassificationResult::none(ClassifierTier::Rules);
        let value = handler
            .handle("hello", &classification, &json!({"user": "ada"}))
            .await
            .unwrap();
        assert_eq!(value, json!({"text": "hello", "intent": null, "user": "ada"}));
    }

    #[tokio::test]
    async fn closure_errors_propagate() {
        let handler = handler_fn(|_, _, _| async { Err::<Value, _>(anyhow::anyhow!("disk full")) });
        let classification = ClassificationResult::none(ClassifierTier::Rules);
        let err = handler
            .handle("x", &classification, &Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }
}
