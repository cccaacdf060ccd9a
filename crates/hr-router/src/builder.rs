//! Fluent handler registration.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use hr_catalog::ClassificationResult;

use crate::error::RouterError;
use crate::handler::{Context, Handler, handler_fn};
use crate::router::Router;

/// Created by [`Router::handler`]; forwards to `register_handler`.
///
/// ```ignore
/// router
///     .handler("greeter")
///     .intents(["greeting", "farewell"])
///     .describe("Social niceties")
///     .register_fn(|_, _, _| async { Ok::<_, anyhow::Error>(json!({"reply": "Hi!"})) })?;
/// ```
#[must_use = "a handler builder does nothing until `register` is called"]
pub struct HandlerBuilder<'r> {
    router: &'r Router,
    name: String,
    intents: BTreeSet<String>,
    description: String,
}

impl<'r> HandlerBuilder<'r> {
    pub(crate) fn new(router: &'r Router, name: &str) -> Self {
        Self {
            router,
            name: name.to_string(),
            intents: BTreeSet::new(),
            description: String::new(),
        }
    }

    pub fn intent(mut self, intent: &str) -> Self {
        self.intents.insert(intent.to_string());
        self
    }

    pub fn intents<I, S>(mut self, intents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.intents.extend(intents.into_iter().map(Into::into));
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn register(self, handler: Arc<dyn Handler>) -> Result<(), RouterError> {
        self.router
            .registry()
            .register(&self.name, handler, self.intents, &self.description)
    }

    pub fn register_fn<F, Fut>(self, f: F) -> Result<(), RouterError>
    where
        F: Fn(String, ClassificationResult, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.register(handler_fn(f))
    }
}
