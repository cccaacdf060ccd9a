//! Output of any classification stage.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};

use crate::intent::Intent;

/// At or above this confidence a classification is trusted on its own.
pub const CONFIDENT: f64 = 0.7;

/// Below this confidence the caller should be asked to clarify.
pub const NEEDS_CLARIFICATION: f64 = 0.5;

/// Slot name → extracted value.
pub type Slots = BTreeMap<String, String>;

/// Which stage produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierTier {
    /// Keyword and pattern matching.
    Rules,
    /// Local language model.
    Llm,
    /// A combination of both.
    Ensemble,
}

/// A runner-up intent considered during classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    #[serde(serialize_with = "intent_name")]
    pub intent: Arc<Intent>,
    pub confidence: f64,
}

/// Intent chosen for an input, with confidence and extracted slots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    /// `None` when nothing in the catalog fits.
    #[serde(serialize_with = "optional_intent_name")]
    pub intent: Option<Arc<Intent>>,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub extracted_slots: Slots,
    /// Free-text explanation, set on paths that involve the language model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Runner-up intents, best first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<Candidate>,
    pub tier: ClassifierTier,
}

impl ClassificationResult {
    pub fn new(intent: Arc<Intent>, confidence: f64, tier: ClassifierTier) -> Self {
        Self {
            intent: Some(intent),
            confidence: clamp_confidence(confidence),
            extracted_slots: Slots::new(),
            reasoning: None,
            alternatives: Vec::new(),
            tier,
        }
    }

    /// No intent, zero confidence.
    pub fn none(tier: ClassifierTier) -> Self {
        Self {
            intent: None,
            confidence: 0.0,
            extracted_slots: Slots::new(),
            reasoning: None,
            alternatives: Vec::new(),
            tier,
        }
    }

    pub fn with_slots(mut self, slots: Slots) -> Self {
        self.extracted_slots = slots;
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn with_alternatives(mut self, alternatives: Vec<Candidate>) -> Self {
        self.alternatives = alternatives;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = clamp_confidence(confidence);
        self
    }

    pub fn with_tier(mut self, tier: ClassifierTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn intent_name(&self) -> Option<&str> {
        self.intent.as_deref().map(|i| i.name.as_str())
    }

    pub fn is_confident(&self) -> bool {
        self.confidence >= CONFIDENT
    }

    pub fn needs_clarification(&self) -> bool {
        self.confidence < NEEDS_CLARIFICATION
    }

    /// True when both results name the same (non-empty) intent.
    pub fn agrees_with(&self, other: &Self) -> bool {
        match (self.intent_name(), other.intent_name()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

fn intent_name<S: Serializer>(intent: &Arc<Intent>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&intent.name)
}

fn optional_intent_name<S: Serializer>(
    intent: &Option<Arc<Intent>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match intent {
        Some(intent) => serializer.serialize_some(&intent.name),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::IntentCategory;

    fn greeting() -> Arc<Intent> {
        Arc::new(Intent::new(IntentCategory::Social, "greeting", "Say hello"))
    }

    #[test]
    fn confidence_is_clamped() {
        let r = ClassificationResult::new(greeting(), 1.7, ClassifierTier::Rules);
        assert_eq!(r.confidence, 1.0);
        let r = r.with_confidence(-0.3);
        assert_eq!(r.confidence, 0.0);
        let r = r.with_confidence(f64::NAN);
        assert_eq!(r.confidence, 0.0);
    }

    #[test]
    fn predicates_follow_thresholds() {
        let r = ClassificationResult::new(greeting(), 0.7, ClassifierTier::Rules);
        assert!(r.is_confident());
        assert!(!r.needs_clarification());

        let r = r.with_confidence(0.49);
        assert!(!r.is_confident());
        assert!(r.needs_clarification());
    }

    #[test]
    fn none_needs_clarification() {
        let r = ClassificationResult::none(ClassifierTier::Llm);
        assert!(r.intent.is_none());
        assert!(r.needs_clarification());
        assert!(r.intent_name().is_none());
    }

    #[test]
    fn agreement_requires_both_intents() {
        let a = ClassificationResult::new(greeting(), 0.9, ClassifierTier::Rules);
        let b = ClassificationResult::new(greeting(), 0.4, ClassifierTier::Llm);
        let none = ClassificationResult::none(ClassifierTier::Llm);
        assert!(a.agrees_with(&b));
        assert!(!a.agrees_with(&none));
        assert!(!none.agrees_with(&none));
    }

    #[test]
    fn serializes_intent_by_name() {
        let mut slots = Slots::new();
        slots.insert("name".into(), "Ada".into());
        let r = ClassificationResult::new(greeting(), 0.8, ClassifierTier::Rules).with_slots(slots);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["intent"], "greeting");
        assert_eq!(json["tier"], "rules");
        assert_eq!(json["extracted_slots"]["name"], "Ada");
        assert!(json.get("reasoning").is_none());

        let json = serde_json::to_value(ClassificationResult::none(ClassifierTier::Ensemble)).unwrap();
        assert!(json["intent"].is_null());
    }
}
