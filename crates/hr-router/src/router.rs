//! Confidence-based dispatch of classified input to handlers.
//!
//! Per request: merge the default context, classify (with pre and post
//! middleware around the ensemble), ask for clarification when unsure,
//! fall back when no handler fits, check required slots, then run the
//! handler with its errors and panics captured into the result.

use std::any::Any;
use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use serde_json::{Map, Value};

use hr_catalog::{ClassificationResult, IntentCatalog};
use hr_classify::{
    ConfigError, EnsembleClassifier, LlmBackend, LlmClassifier, RoutingConfig, RuleClassifier,
    backend_from_config,
};

use crate::builder::HandlerBuilder;
use crate::config::RouterConfig;
use crate::error::RouterError;
use crate::handler::{Context, Handler};
use crate::hooks::{ClarificationHandler, Middleware};
use crate::registry::{HandlerInfo, HandlerRegistry};
use crate::result::{Clarification, RouteStatus, RouterResult};

/// Handler name reported when the fallback handler runs.
pub const FALLBACK_HANDLER: &str = "fallback";

const MAX_CANDIDATES: usize = 3;

/// Which catalog intents have a handler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coverage {
    pub total_intents: usize,
    /// Catalog intents with a handler, in catalog order.
    pub covered: Vec<String>,
    /// Catalog intents without one, in catalog order.
    pub uncovered: Vec<String>,
    /// Intents claimed by handlers that the catalog does not define.
    pub unknown: Vec<String>,
    pub has_fallback: bool,
}

impl Coverage {
    /// Share of catalog intents with a handler, in `[0, 1]`.
    pub fn ratio(&self) -> f64 {
        if self.total_intents == 0 {
            0.0
        } else {
            self.covered.len() as f64 / self.total_intents as f64
        }
    }
}

pub struct Router {
    catalog: Arc<IntentCatalog>,
    classifier: EnsembleClassifier,
    registry: HandlerRegistry,
}

impl Router {
    pub fn new(catalog: Arc<IntentCatalog>, classifier: EnsembleClassifier) -> Self {
        Self {
            catalog,
            classifier,
            registry: HandlerRegistry::new(),
        }
    }

    /// Build the classifier stack over `catalog`. `backend` is ignored when
    /// `config.llm_enabled` is false.
    pub fn with_backend(
        catalog: Arc<IntentCatalog>,
        config: RoutingConfig,
        backend: Option<Arc<dyn LlmBackend>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let rules = RuleClassifier::new(catalog.clone());
        let llm = backend
            .filter(|_| config.llm_enabled)
            .map(|backend| LlmClassifier::new(catalog.clone(), backend, config.llm_timeout()));
        let classifier = EnsembleClassifier::new(rules, llm, config);
        Ok(Self::new(catalog, classifier))
    }

    /// Build from file configuration: default intents plus the configured
    /// ones, and the configured model backend.
    pub fn from_config(config: RouterConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let catalog = Arc::new(IntentCatalog::with_defaults()?);
        for intent in config.intents {
            catalog.replace(intent);
        }

        let backend = if config.routing.llm_enabled {
            Some(backend_from_config(&config.llm)?)
        } else {
            None
        };

        tracing::info!(
            strategy = config.routing.strategy.as_str(),
            intents = catalog.len(),
            llm = config.routing.llm_enabled,
            model = %config.llm.model,
            "router configured"
        );
        Ok(Self::with_backend(catalog, config.routing, backend)?)
    }

    pub fn catalog(&self) -> &Arc<IntentCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> &RoutingConfig {
        self.classifier.config()
    }

    pub(crate) fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn register_handler<I, S>(
        &self,
        name: &str,
        handler: Arc<dyn Handler>,
        intents: I,
    ) -> Result<(), RouterError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let intents: BTreeSet<String> = intents.into_iter().map(Into::into).collect();
        self.registry.register(name, handler, intents, "")
    }

    /// Start a fluent registration for `name`.
    pub fn handler(&self, name: &str) -> HandlerBuilder<'_> {
        HandlerBuilder::new(self, name)
    }

    pub fn set_fallback_handler(&self, handler: Arc<dyn Handler>) {
        self.registry.set_fallback(handler);
    }

    /// Runs when an intent's (or a forced) handler fails. Its output is
    /// carried in the error result's `result`; its own failure is ignored.
    /// Fallback failures do not reach it.
    pub fn set_error_handler(&self, handler: Arc<dyn Handler>) {
        self.registry.set_error_handler(handler);
    }

    /// Replace the built-in "did you mean" wording for low-confidence input.
    pub fn set_clarification_handler(&self, clarifier: Arc<dyn ClarificationHandler>) {
        self.registry.set_clarifier(clarifier);
    }

    /// Runs before classification; the first one to return a
    /// classification skips the classifier and the post middleware.
    pub fn add_pre_middleware(&self, middleware: Arc<dyn Middleware>) {
        self.registry.add_pre_middleware(middleware);
    }

    /// Runs after classification; each returned classification replaces
    /// the current one.
    pub fn add_post_middleware(&self, middleware: Arc<dyn Middleware>) {
        self.registry.add_post_middleware(middleware);
    }

    /// Merge `values` into the default context every call starts from.
    pub fn update_context<I, K>(&self, values: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let values: Map<String, Value> = values.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.registry.update_context(values);
    }

    /// Copy of the default context.
    pub fn context(&self) -> Context {
        Value::Object(self.registry.context())
    }

    /// Classify `text` and dispatch it. Never fails; every outcome is a
    /// `RouterResult`.
    pub async fn route(&self, text: &str, context: &Context) -> RouterResult {
        let context = self.merged_context(context);
        let classification = self.classify(text, &context).await;
        self.dispatch(text, classification, &context).await
    }

    /// `route`, run again up to `max_retries` times while the outcome is an
    /// error. Retry `n` sees `"retry_attempt": n` in its context.
    pub async fn route_with_retry(
        &self,
        text: &str,
        context: &Context,
        max_retries: u32,
    ) -> RouterResult {
        let mut context = context.clone();
        let mut attempt = 0;
        loop {
            let result = self.route(text, &context).await;
            if !result.is_error() || attempt == max_retries {
                return result;
            }
            attempt += 1;
            tracing::debug!(attempt, max_retries, "retrying failed route");
            match &mut context {
                Value::Object(map) => {
                    map.insert("retry_attempt".into(), attempt.into());
                }
                other => *other = serde_json::json!({ "retry_attempt": attempt }),
            }
        }
    }

    async fn dispatch(
        &self,
        text: &str,
        classification: ClassificationResult,
        context: &Context,
    ) -> RouterResult {
        let config = self.classifier.config();

        if classification.confidence < config.clarification_threshold {
            tracing::debug!(
                confidence = classification.confidence,
                "confidence below clarification threshold"
            );
            let clarification = self.clarification(text, &classification).await;
            return RouterResult::clarify(classification, clarification);
        }

        let entry = classification
            .intent_name()
            .filter(|_| classification.confidence >= config.confidence_threshold)
            .and_then(|intent| self.registry.for_intent(intent));
        let (Some(entry), Some(intent)) = (entry, classification.intent.clone()) else {
            return self.fallback(text, classification, context).await;
        };

        let missing: Vec<String> = intent
            .required_slot_names()
            .into_iter()
            .filter(|slot| !classification.extracted_slots.contains_key(*slot))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            tracing::debug!(intent = %intent.name, missing = ?missing, "required slots missing");
            return RouterResult::clarify(classification, slot_prompt(missing));
        }

        invoke(
            &entry.name,
            entry.handler(),
            text,
            classification,
            context,
            RouteStatus::Dispatched,
            self.registry.error_handler(),
        )
        .await
    }

    /// Classify `text`, then run `handler_name` regardless of thresholds,
    /// intent ownership or slots.
    pub async fn route_with_handler(
        &self,
        text: &str,
        context: &Context,
        handler_name: &str,
    ) -> RouterResult {
        let context = self.merged_context(context);
        let classification = self.classify(text, &context).await;
        match self.registry.get(handler_name) {
            Some(entry) => {
                invoke(
                    &entry.name,
                    entry.handler(),
                    text,
                    classification,
                    &context,
                    RouteStatus::Dispatched,
                    self.registry.error_handler(),
                )
                .await
            }
            None => RouterResult::failed(
                classification,
                None,
                RouterError::UnknownHandler {
                    name: handler_name.to_string(),
                },
            ),
        }
    }

    /// Object keys in `context` override the defaults; `null` means the
    /// defaults alone; any other value is passed through untouched.
    fn merged_context(&self, context: &Context) -> Context {
        match context {
            Value::Object(call) => {
                let mut merged = self.registry.context();
                merged.extend(call.iter().map(|(k, v)| (k.clone(), v.clone())));
                Value::Object(merged)
            }
            Value::Null => Value::Object(self.registry.context()),
            other => other.clone(),
        }
    }

    async fn classify(&self, text: &str, context: &Context) -> ClassificationResult {
        for middleware in self.registry.pre_middleware() {
            if let Some(classification) = run_middleware(&middleware, text, None, context).await {
                tracing::debug!(
                    intent = classification.intent_name().unwrap_or("none"),
                    "classified by pre-middleware"
                );
                return classification;
            }
        }

        let mut classification = self.classifier.classify(text).await;
        for middleware in self.registry.post_middleware() {
            if let Some(replaced) =
                run_middleware(&middleware, text, Some(&classification), context).await
            {
                classification = replaced;
            }
        }
        classification
    }

    /// Built-in candidate prompt, reworded by the clarification handler
    /// when one is set and answers with something non-blank.
    async fn clarification(
        &self,
        text: &str,
        classification: &ClassificationResult,
    ) -> Clarification {
        let mut clarification = candidate_prompt(classification);
        let Some(clarifier) = self.registry.clarifier() else {
            return clarification;
        };

        let outcome = AssertUnwindSafe(clarifier.prompt(
            text,
            classification,
            &clarification.candidates,
        ))
        .catch_unwind()
        .await;
        match outcome {
            Ok(Ok(prompt)) if !prompt.trim().is_empty() => clarification.prompt = prompt,
            Ok(Ok(_)) => tracing::debug!("blank clarification prompt, using default"),
            Ok(Err(e)) => {
                tracing::warn!(error = %format!("{e:#}"), "clarification handler failed")
            }
            Err(panic) => tracing::warn!(
                error = panic_message(panic.as_ref()),
                "clarification handler panicked"
            ),
        }
        clarification
    }

    async fn fallback(
        &self,
        text: &str,
        classification: ClassificationResult,
        context: &Context,
    ) -> RouterResult {
        match self.registry.fallback() {
            Some(handler) => {
                invoke(
                    FALLBACK_HANDLER,
                    handler,
                    text,
                    classification,
                    context,
                    RouteStatus::Fallback,
                    None,
                )
                .await
            }
            None => {
                let intent = classification.intent_name().map(str::to_string);
                tracing::warn!(
                    intent = intent.as_deref().unwrap_or("none"),
                    "no handler and no fallback"
                );
                RouterResult::failed(classification, None, RouterError::NoHandler { intent })
            }
        }
    }

    pub fn registered_handlers(&self) -> Vec<HandlerInfo> {
        self.registry.entries().iter().map(|e| e.info()).collect()
    }

    pub fn coverage(&self) -> Coverage {
        let intents = self.catalog.all();
        let served = self.registry.covered_intents();

        let (covered, uncovered): (Vec<String>, Vec<String>) = intents
            .iter()
            .map(|i| i.name.clone())
            .partition(|name| served.contains(name));
        let unknown = served
            .into_iter()
            .filter(|name| !self.catalog.contains(name))
            .collect();

        Coverage {
            total_intents: intents.len(),
            covered,
            uncovered,
            unknown,
            has_fallback: self.registry.fallback().is_some(),
        }
    }
}

/// Errors and panics are logged and read as "no opinion".
async fn run_middleware(
    middleware: &Arc<dyn Middleware>,
    text: &str,
    classification: Option<&ClassificationResult>,
    context: &Context,
) -> Option<ClassificationResult> {
    let outcome = AssertUnwindSafe(middleware.process(text, classification, context))
        .catch_unwind()
        .await;
    match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            tracing::warn!(error = %format!("{e:#}"), "middleware failed");
            None
        }
        Err(panic) => {
            tracing::warn!(error = panic_message(panic.as_ref()), "middleware panicked");
            None
        }
    }
}

/// Run a handler with errors and panics captured. On failure the error
/// handler, if any, runs under the same capture.
async fn invoke(
    name: &str,
    handler: Arc<dyn Handler>,
    text: &str,
    classification: ClassificationResult,
    context: &Context,
    status: RouteStatus,
    error_handler: Option<Arc<dyn Handler>>,
) -> RouterResult {
    let outcome = AssertUnwindSafe(handler.handle(text, &classification, context))
        .catch_unwind()
        .await;

    let detail = match outcome {
        Ok(Ok(value)) => {
            tracing::info!(
                handler = %name,
                intent = classification.intent_name().unwrap_or("none"),
                confidence = classification.confidence,
                status = ?status,
                "request dispatched"
            );
            return RouterResult::completed(classification, status, name, value);
        }
        Ok(Err(e)) => format!("{e:#}"),
        Err(panic) => format!("handler panicked: {}", panic_message(panic.as_ref())),
    };

    tracing::warn!(handler = %name, error = %detail, "handler failed");
    let recovered = match error_handler {
        Some(error_handler) => {
            let outcome = AssertUnwindSafe(error_handler.handle(text, &classification, context))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(value)) => Some(value),
                Ok(Err(e)) => {
                    tracing::warn!(handler = %name, error = %format!("{e:#}"), "error handler failed");
                    None
                }
                Err(panic) => {
                    tracing::warn!(
                        handler = %name,
                        error = panic_message(panic.as_ref()),
                        "error handler panicked"
                    );
                    None
                }
            }
        }
        None => None,
    };

    let failed = RouterResult::failed(
        classification,
        Some(name),
        RouterError::Handler {
            handler: name.to_string(),
            detail,
        },
    );
    match recovered {
        Some(value) => failed.with_result(value),
        None => failed,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    }
}

/// "Did you mean" prompt from the classified intent and its runners-up.
fn candidate_prompt(classification: &ClassificationResult) -> Clarification {
    let mut candidates: Vec<String> = Vec::new();
    let names = classification
        .intent_name()
        .into_iter()
        .chain(classification.alternatives.iter().map(|c| c.intent.name.as_str()));
    for name in names {
        if candidates.len() == MAX_CANDIDATES {
            break;
        }
        if !candidates.iter().any(|c| c == name) {
            candidates.push(name.to_string());
        }
    }

    let prompt = if candidates.is_empty() {
        "Could you please clarify what you'd like me to do?".to_string()
    } else {
        let options: Vec<String> = candidates.iter().map(|c| format!("'{c}'")).collect();
        format!(
            "I'm not sure what you mean. Did you want to: {}?",
            options.join(", ")
        )
    };

    Clarification {
        prompt,
        candidates,
        missing_slots: Vec::new(),
    }
}

fn slot_prompt(missing: Vec<String>) -> Clarification {
    let prompt = missing
        .iter()
        .map(|slot| match slot.as_str() {
            "path" => "What file or path should I use?".to_string(),
            "time" => "What time?".to_string(),
            "date" => "What date?".to_string(),
            "task" => "What should I remind you about?".to_string(),
            "command" => "What command should I run?".to_string(),
            "message" => "What message?".to_string(),
            "temperature" => "What temperature?".to_string(),
            "room" => "Which room?".to_string(),
            other => format!("Please provide: {other}"),
        })
        .collect::<Vec<_>>()
        .join(" ");

    Clarification {
        prompt,
        candidates: Vec::new(),
        missing_slots: missing,
    }
}
