//! Process-wide intent catalog.
//!
//! Readers take a cheap `Arc` snapshot and never hold the lock while they
//! classify; writers are serialized by the write lock and swap in a new
//! snapshot (copy-on-write), so a reader sees either the state before or
//! after a registration, never a partial one.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::defaults::default_intents;
use crate::error::{CatalogError, CatalogResult};
use crate::intent::{Intent, IntentCategory};

#[derive(Debug, Clone, Default)]
struct Snapshot {
    intents: Vec<Arc<Intent>>,
    /// Map from intent name → position in `intents`.
    index: HashMap<String, usize>,
}

/// Registry of every intent known to the process, in insertion order.
#[derive(Debug, Default)]
pub struct IntentCatalog {
    state: RwLock<Arc<Snapshot>>,
}

impl IntentCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog pre-populated with the built-in intents.
    pub fn with_defaults() -> CatalogResult<Self> {
        let catalog = Self::new();
        for intent in default_intents()? {
            catalog.register(intent)?;
        }
        Ok(catalog)
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Add a new intent. Fails if the name is already taken.
    pub fn register(&self, intent: Intent) -> CatalogResult<Arc<Intent>> {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if guard.index.contains_key(&intent.name) {
            return Err(CatalogError::DuplicateIntent(intent.name));
        }

        let intent = Arc::new(intent);
        let next = Arc::make_mut(&mut guard);
        next.index.insert(intent.name.clone(), next.intents.len());
        next.intents.push(intent.clone());

        tracing::debug!(intent = %intent.name, category = %intent.category, "intent registered");
        Ok(intent)
    }

    /// Add or overwrite an intent. An overwritten intent keeps its position.
    pub fn replace(&self, intent: Intent) -> Arc<Intent> {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let intent = Arc::new(intent);
        let next = Arc::make_mut(&mut guard);

        match next.index.get(&intent.name) {
            Some(&pos) => {
                next.intents[pos] = intent.clone();
                tracing::debug!(intent = %intent.name, "intent replaced");
            }
            None => {
                next.index.insert(intent.name.clone(), next.intents.len());
                next.intents.push(intent.clone());
                tracing::debug!(intent = %intent.name, "intent registered");
            }
        }
        intent
    }

    /// Look up an intent by name.
    pub fn lookup(&self, name: &str) -> CatalogResult<Arc<Intent>> {
        self.get(name)
            .ok_or_else(|| CatalogError::UnknownIntent(name.to_string()))
    }

    /// Like `lookup`, but returns `None` for unknown names.
    pub fn get(&self, name: &str) -> Option<Arc<Intent>> {
        let snapshot = self.snapshot();
        snapshot
            .index
            .get(name)
            .map(|&pos| snapshot.intents[pos].clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.snapshot().index.contains_key(name)
    }

    /// Every intent, in registration order.
    pub fn all(&self) -> Vec<Arc<Intent>> {
        self.snapshot().intents.clone()
    }

    pub fn by_category(&self, category: IntentCategory) -> Vec<Arc<Intent>> {
        self.snapshot()
            .intents
            .iter()
            .filter(|i| i.category == category)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().intents.is_empty()
    }
}
