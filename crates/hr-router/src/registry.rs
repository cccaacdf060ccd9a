//! Handler registry: handler name → handler, intent name → handler name.
//!
//! Copy-on-write like the intent catalog: registration swaps in a new
//! snapshot under the write lock, dispatch clones the current `Arc` and
//! never holds the lock while a handler runs. The same snapshot carries
//! the routing hooks and the router's default context.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::RouterError;
use crate::handler::Handler;
use crate::hooks::{ClarificationHandler, Middleware};

/// One registered handler and the intents it serves.
#[derive(Clone)]
pub struct HandlerEntry {
    pub name: String,
    pub description: String,
    pub intents: BTreeSet<String>,
    handler: Arc<dyn Handler>,
}

impl HandlerEntry {
    pub fn handler(&self) -> Arc<dyn Handler> {
        self.handler.clone()
    }

    pub fn info(&self) -> HandlerInfo {
        HandlerInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            intents: self.intents.iter().cloned().collect(),
        }
    }
}

impl fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("intents", &self.intents)
            .finish_non_exhaustive()
    }
}

/// Metadata about a registered handler (used by introspection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerInfo {
    pub name: String,
    pub description: String,
    pub intents: Vec<String>,
}

#[derive(Clone, Default)]
struct RegistryState {
    handlers: HashMap<String, Arc<HandlerEntry>>,
    /// Map from intent name → owning handler name.
    by_intent: HashMap<String, String>,
    fallback: Option<Arc<dyn Handler>>,
    error_handler: Option<Arc<dyn Handler>>,
    clarifier: Option<Arc<dyn ClarificationHandler>>,
    pre: Vec<Arc<dyn Middleware>>,
    post: Vec<Arc<dyn Middleware>>,
    context: Map<String, Value>,
}

#[derive(Default)]
pub struct HandlerRegistry {
    state: RwLock<Arc<RegistryState>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Arc<RegistryState> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Bind `handler` to `name` and to each intent in `intents`.
    ///
    /// Registering the same handler object again under its name replaces
    /// its intent set; a different object under a taken name fails. An
    /// intent already served by another handler moves to this one.
    pub fn register(
        &self,
        name: &str,
        handler: Arc<dyn Handler>,
        intents: BTreeSet<String>,
        description: &str,
    ) -> Result<(), RouterError> {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);

        let previous = guard.handlers.get(name).cloned();
        if let Some(existing) = &previous {
            if !same_handler(&existing.handler, &handler) {
                return Err(RouterError::DuplicateHandlerName {
                    name: name.to_string(),
                });
            }
        }

        let state = Arc::make_mut(&mut guard);

        if let Some(existing) = &previous {
            for dropped in existing.intents.difference(&intents) {
                if state.by_intent.get(dropped).map(String::as_str) == Some(name) {
                    state.by_intent.remove(dropped);
                }
            }
        }

        for intent in &intents {
            let Some(owner) = state.by_intent.insert(intent.clone(), name.to_string()) else {
                continue;
            };
            if owner == name {
                continue;
            }
            tracing::warn!(
                intent = %intent,
                previous = %owner,
                handler = %name,
                "intent handler overridden"
            );
            if let Some(entry) = state.handlers.get_mut(&owner) {
                Arc::make_mut(entry).intents.remove(intent);
            }
        }

        state.handlers.insert(
            name.to_string(),
            Arc::new(HandlerEntry {
                name: name.to_string(),
                description: description.to_string(),
                intents,
                handler,
            }),
        );

        tracing::debug!(handler = %name, "handler registered");
        Ok(())
    }

    pub fn set_fallback(&self, handler: Arc<dyn Handler>) {
        self.update(|state| state.fallback = Some(handler));
    }

    pub fn fallback(&self) -> Option<Arc<dyn Handler>> {
        self.snapshot().fallback.clone()
    }

    fn update(&self, f: impl FnOnce(&mut RegistryState)) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(Arc::make_mut(&mut guard));
    }

    pub fn set_error_handler(&self, handler: Arc<dyn Handler>) {
        self.update(|state| state.error_handler = Some(handler));
    }

    pub fn error_handler(&self) -> Option<Arc<dyn Handler>> {
        self.snapshot().error_handler.clone()
    }

    pub fn set_clarifier(&self, clarifier: Arc<dyn ClarificationHandler>) {
        self.update(|state| state.clarifier = Some(clarifier));
    }

    pub fn clarifier(&self) -> Option<Arc<dyn ClarificationHandler>> {
        self.snapshot().clarifier.clone()
    }

    pub fn add_pre_middleware(&self, middleware: Arc<dyn Middleware>) {
        self.update(|state| state.pre.push(middleware));
    }

    pub fn add_post_middleware(&self, middleware: Arc<dyn Middleware>) {
        self.update(|state| state.post.push(middleware));
    }

    /// Pre-classification middleware, in registration order.
    pub fn pre_middleware(&self) -> Vec<Arc<dyn Middleware>> {
        self.snapshot().pre.clone()
    }

    /// Post-classification middleware, in registration order.
    pub fn post_middleware(&self) -> Vec<Arc<dyn Middleware>> {
        self.snapshot().post.clone()
    }

    /// Merge `values` into the default context; existing keys are replaced.
    pub fn update_context(&self, values: Map<String, Value>) {
        self.update(|state| state.context.extend(values));
    }

    pub fn context(&self) -> Map<String, Value> {
        self.snapshot().context.clone()
    }

    /// Handler currently serving `intent`.
    pub fn for_intent(&self, intent: &str) -> Option<Arc<HandlerEntry>> {
        let snapshot = self.snapshot();
        let name = snapshot.by_intent.get(intent)?;
        snapshot.handlers.get(name).cloned()
    }

    pub fn get(&self, name: &str) -> Option<Arc<HandlerEntry>> {
        self.snapshot().handlers.get(name).cloned()
    }

    /// Every registered handler, sorted by name.
    pub fn entries(&self) -> Vec<Arc<HandlerEntry>> {
        let mut entries: Vec<_> = self.snapshot().handlers.values().cloned().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Intent names that currently have a handler.
    pub fn covered_intents(&self) -> BTreeSet<String> {
        self.snapshot().by_intent.keys().cloned().collect()
    }
}

/// Pointer identity on the data half of the trait object.
fn same_handler(a: &Arc<dyn Handler>, b: &Arc<dyn Handler>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use crate::hooks::middleware_fn;
    use serde_json::json;
    use std::io;
    use std::sync::Mutex;

    fn noop() -> Arc<dyn Handler> {
        handler_fn(|_, _, _| async { Ok::<_, anyhow::Error>(Value::Null) })
    }

    fn intents(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn register_and_lookup() {
        let registry = HandlerRegistry::new();
        registry
            .register("greeter", noop(), intents(&["greeting", "farewell"]), "says hi")
            .unwrap();

        let entry = registry.for_intent("farewell").unwrap();
        assert_eq!(entry.name, "greeter");
        assert_eq!(entry.description, "says hi");
        assert!(registry.for_intent("gratitude").is_none());
        assert_eq!(registry.covered_intents(), intents(&["farewell", "greeting"]));
    }

    #[test]
    fn one_entry_per_handler() {
        let registry = HandlerRegistry::new();
        registry
            .register("greeter", noop(), intents(&["greeting", "farewell"]), "")
            .unwrap();
        let a = registry.for_intent("greeting").unwrap();
        let b = registry.for_intent("farewell").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.entries().len(), 1);
    }

    #[test]
    fn duplicate_name_with_different_handler_fails() {
        let registry = HandlerRegistry::new();
        registry.register("h", noop(), intents(&["greeting"]), "").unwrap();
        let err = registry
            .register("h", noop(), intents(&["farewell"]), "")
            .unwrap_err();
        assert_eq!(
            err,
            RouterError::DuplicateHandlerName { name: "h".into() }
        );
        assert!(registry.for_intent("farewell").is_none());
        assert!(registry.for_intent("greeting").is_some());
    }

    #[test]
    fn same_handler_replaces_intent_set() {
        let registry = HandlerRegistry::new();
        let handler = noop();
        registry
            .register("h", handler.clone(), intents(&["greeting", "farewell"]), "")
            .unwrap();
        registry
            .register("h", handler, intents(&["gratitude"]), "thanks only")
            .unwrap();

        assert!(registry.for_intent("greeting").is_none());
        assert!(registry.for_intent("farewell").is_none());
        let entry = registry.for_intent("gratitude").unwrap();
        assert_eq!(entry.description, "thanks only");
        assert_eq!(registry.entries().len(), 1);
    }

    #[test]
    fn last_write_wins_per_intent() {
        let registry = HandlerRegistry::new();
        registry
            .register("old", noop(), intents(&["greeting", "farewell"]), "")
            .unwrap();
        registry.register("new", noop(), intents(&["greeting"]), "").unwrap();

        assert_eq!(registry.for_intent("greeting").unwrap().name, "new");
        assert_eq!(registry.for_intent("farewell").unwrap().name, "old");
        let old = registry.get("old").unwrap();
        assert_eq!(old.intents, intents(&["farewell"]));
    }

    #[test]
    fn fallback_is_optional() {
        let registry = HandlerRegistry::new();
        assert!(registry.fallback().is_none());
        registry.set_fallback(noop());
        assert!(registry.fallback().is_some());
        assert!(registry.error_handler().is_none());
        registry.set_error_handler(noop());
        assert!(registry.error_handler().is_some());
    }

    #[test]
    fn middleware_kept_in_order() {
        let registry = HandlerRegistry::new();
        let first = middleware_fn(|_, _, _| async { Ok::<_, anyhow::Error>(None) });
        let second = middleware_fn(|_, _, _| async { Ok::<_, anyhow::Error>(None) });
        registry.add_post_middleware(first.clone());
        registry.add_post_middleware(second.clone());

        let post = registry.post_middleware();
        assert_eq!(post.len(), 2);
        assert!(Arc::ptr_eq(&post[0], &first));
        assert!(Arc::ptr_eq(&post[1], &second));
        assert!(registry.pre_middleware().is_empty());
    }

    #[test]
    fn context_updates_merge() {
        let registry = HandlerRegistry::new();
        let Value::Object(first) = json!({"user": "ada", "locale": "en"}) else {
            unreachable!()
        };
        let Value::Object(second) = json!({"locale": "fr"}) else {
            unreachable!()
        };
        registry.update_context(first);
        registry.update_context(second);

        assert_eq!(
            Value::Object(registry.context()),
            json!({"user": "ada", "locale": "fr"})
        );
    }

    #[test]
    fn override_is_logged_as_warning() {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || Capture(writer.clone()))
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();

        let registry = HandlerRegistry::new();
        tracing::subscriber::with_default(subscriber, || {
            registry.register("old", noop(), intents(&["greeting"]), "").unwrap();
            registry.register("new", noop(), intents(&["greeting"]), "").unwrap();
        });

        let output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        let warning = output
            .lines()
            .find(|line| line.contains("intent handler overridden"))
            .expect("override warning");
        assert!(warning.contains("WARN"));
        assert!(warning.contains("intent=greeting"));
        assert!(warning.contains("previous=old"));
        assert!(warning.contains("handler=new"));
        assert_eq!(output.matches("intent handler overridden").count(), 1);
    }

    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn entries_sorted_by_name() {
        let registry = HandlerRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(name, noop(), intents(&[name]), "").unwrap();
        }
        let names: Vec<String> = registry.entries().iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
        assert_eq!(registry.get("mid").unwrap().info().intents, vec!["mid"]);
    }
}
