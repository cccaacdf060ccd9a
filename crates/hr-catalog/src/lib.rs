//! Intent catalog for the hybrid router.
//!
//! Shared types used by every classification stage and by the router:
//! - `Intent` definitions (keywords, slot patterns, prompt examples)
//! - `IntentCatalog`, the process-wide registry of intents
//! - `ClassificationResult`, the output of any classifier stage

pub mod catalog;
pub mod classification;
pub mod defaults;
pub mod error;
pub mod intent;

pub use catalog::IntentCatalog;
pub use classification::{Candidate, ClassificationResult, ClassifierTier, Slots};
pub use error::{CatalogError, CatalogResult};
pub use intent::{Intent, IntentCategory, SlotPattern};
