//! Rule-based classifier: keyword and pattern scoring over the catalog.
//!
//! Synchronous and allocation-light; latency is bounded by input length
//! times catalog size. Every catalog intent is scored, the best one wins.

use std::sync::Arc;

use hr_catalog::{Candidate, ClassificationResult, ClassifierTier, Intent, IntentCatalog, Slots};

/// Weight of the keyword component when every counted keyword hits.
pub const KEYWORD_WEIGHT: f64 = 0.4;

/// Keyword hits needed to saturate the keyword component.
pub const KEYWORD_SATURATION: usize = 3;

/// Score contributed by any pattern match. Deliberately above
/// `KEYWORD_WEIGHT` so a structural match outranks loose keyword hits.
pub const PATTERN_SCORE: f64 = 0.6;

/// Scores at or below this are treated as no match.
pub const NOISE_FLOOR: f64 = 0.05;

const MAX_ALTERNATIVES: usize = 3;

/// Scores input against every intent in a shared catalog.
#[derive(Debug, Clone)]
pub struct RuleClassifier {
    catalog: Arc<IntentCatalog>,
}

impl RuleClassifier {
    pub fn new(catalog: Arc<IntentCatalog>) -> Self {
        Self { catalog }
    }

    pub fn classify(&self, text: &str) -> ClassificationResult {
        let lower = text.to_lowercase();

        let mut scored: Vec<(Arc<Intent>, f64)> = self
            .catalog
            .all()
            .into_iter()
            .filter_map(|intent| {
                let score = score(&intent, text, &lower);
                (score > NOISE_FLOOR).then_some((intent, score))
            })
            .collect();

        if scored.is_empty() {
            tracing::debug!(tier = "rules", "no intent matched");
            return ClassificationResult::none(ClassifierTier::Rules);
        }

        // Stable sort: equal scores keep registration order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        let mut ranked = scored.into_iter();
        let Some((best, confidence)) = ranked.next() else {
            return ClassificationResult::none(ClassifierTier::Rules);
        };

        let alternatives = ranked
            .take(MAX_ALTERNATIVES)
            .map(|(intent, confidence)| Candidate { intent, confidence })
            .collect();
        let slots = extract_slots(&best, text);

        tracing::debug!(
            tier = "rules",
            intent = %best.name,
            confidence,
            slots = slots.len(),
            "rule classification"
        );

        ClassificationResult::new(best, confidence, ClassifierTier::Rules)
            .with_slots(slots)
            .with_alternatives(alternatives)
    }
}

/// Keyword component plus pattern component, capped at 1.
fn score(intent: &Intent, text: &str, lower: &str) -> f64 {
    let keyword = if intent.keywords.is_empty() {
        0.0
    } else {
        let hits = intent
            .keywords
            .iter()
            .filter(|k| contains_phrase(lower, &k.to_lowercase()))
            .count();
        let needed = intent.keywords.len().min(KEYWORD_SATURATION);
        KEYWORD_WEIGHT * (hits as f64 / needed as f64).min(1.0)
    };

    let pattern = if intent.patterns.iter().any(|p| p.is_match(text)) {
        PATTERN_SCORE
    } else {
        0.0
    };

    (keyword + pattern).min(1.0)
}

/// Named groups from every matching pattern; the first pattern to capture a
/// slot keeps it.
fn extract_slots(intent: &Intent, text: &str) -> Slots {
    let mut slots = Slots::new();
    for captures in intent.patterns.iter().filter_map(|p| p.captures(text)) {
        for (name, value) in captures {
            slots.entry(name).or_insert(value);
        }
    }
    slots
}

/// Whole-word (or whole-phrase) containment: the match may not be glued to
/// a letter or digit on either side.
fn contains_phrase(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
