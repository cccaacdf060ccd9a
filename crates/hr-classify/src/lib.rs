//! Intent classifiers for the hybrid router.
//!
//! Three stages over a shared `IntentCatalog`:
//! - **Rules**: keyword and pattern scoring, synchronous, no I/O.
//! - **LLM**: a local language model behind the `LlmBackend` trait.
//! - **Ensemble**: combines both under a `RoutingConfig` strategy.

pub mod config;
pub mod ensemble;
pub mod error;
pub mod llm;
pub mod mock;
pub mod rules;

pub use config::{BackendKind, LlmConfig, Preset, RoutingConfig, Strategy};
pub use ensemble::EnsembleClassifier;
pub use error::{ClassifyError, ClassifyResult, ConfigError};
pub use llm::{LlmBackend, LlmClassifier, OllamaBackend, OpenAiCompatBackend, backend_from_config};
pub use mock::MockBackend;
pub use rules::RuleClassifier;
