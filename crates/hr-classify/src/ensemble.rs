//! Ensemble classifier: combines the rule and language-model verdicts.
//!
//! `classify` never fails. A language-model error is logged and that side
//! counts as "no intent, zero confidence"; the rule path always answers.

use hr_catalog::{Candidate, ClassificationResult, ClassifierTier, Slots};

use crate::config::{RoutingConfig, Strategy};
use crate::llm::LlmClassifier;
use crate::rules::RuleClassifier;

/// Under `rule_first`, a model verdict weaker than this does not override
/// the rules unless it is still the stronger of the two.
pub const WEAK_LLM_VERDICT: f64 = 0.3;

/// Multiplier applied to a `weighted_vote` winner that was contested.
pub const DISAGREEMENT_PENALTY: f64 = 0.8;

/// Ceiling, as a share of the rule confidence, for an `llm_verify` result
/// the model contradicted.
pub const VERIFY_PENALTY: f64 = 0.9;

/// What the language model had to say, after absorbing its errors.
enum Opinion {
    Verdict(ClassificationResult),
    /// Disabled, unreachable, timed out, or unusable output.
    Absent,
}

impl Opinion {
    fn into_result(self) -> ClassificationResult {
        match self {
            Self::Verdict(result) => result,
            Self::Absent => ClassificationResult::none(ClassifierTier::Llm),
        }
    }
}

/// Rule classifier, optional language-model classifier, and the policy
/// that combines them.
pub struct EnsembleClassifier {
    rules: RuleClassifier,
    llm: Option<LlmClassifier>,
    config: RoutingConfig,
}

impl EnsembleClassifier {
    /// The language-model classifier is discarded when
    /// `config.llm_enabled` is false.
    pub fn new(rules: RuleClassifier, llm: Option<LlmClassifier>, config: RoutingConfig) -> Self {
        let llm = llm.filter(|_| config.llm_enabled);
        Self { rules, llm, config }
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    pub async fn classify(&self, text: &str) -> ClassificationResult {
        let result = match self.config.strategy {
            Strategy::RuleFirst => self.rule_first(text).await,
            Strategy::WeightedVote => self.weighted_vote(text).await,
            Strategy::LlmVerify => self.llm_verify(text).await,
            Strategy::Consensus => self.consensus(text).await,
        };
        tracing::debug!(
            strategy = self.config.strategy.as_str(),
            intent = result.intent_name().unwrap_or("none"),
            confidence = result.confidence,
            tier = ?result.tier,
            "ensemble classification"
        );
        result
    }

    async fn consult_llm(&self, text: &str) -> Opinion {
        let Some(llm) = &self.llm else {
            return Opinion::Absent;
        };
        match llm.classify(text).await {
            Ok(result) => Opinion::Verdict(result),
            Err(e) => {
                tracing::warn!(
                    backend = llm.backend_name(),
                    error = %e,
                    "llm classifier degraded, continuing with rules"
                );
                Opinion::Absent
            }
        }
    }

    async fn rule_first(&self, text: &str) -> ClassificationResult {
        let rule = self.rules.classify(text);
        if rule.confidence >= self.config.rule_confidence_threshold {
            return rule;
        }

        match self.consult_llm(text).await {
            Opinion::Absent => rule,
            Opinion::Verdict(llm) if llm.confidence < WEAK_LLM_VERDICT => {
                if rule.confidence >= llm.confidence {
                    rule
                } else {
                    llm
                }
            }
            Opinion::Verdict(llm) => fill_slots(llm, &rule),
        }
    }

    async fn weighted_vote(&self, text: &str) -> ClassificationResult {
        let (rule, llm) = tokio::join!(async { self.rules.classify(text) }, self.consult_llm(text));
        let llm = llm.into_result();
        let (rule_weight, llm_weight) = self.config.normalized_weights();

        if rule.agrees_with(&llm) {
            let confidence = rule_weight * rule.confidence + llm_weight * llm.confidence;
            let reasoning = llm.reasoning.clone();
            let slots = merge_slots(&rule, &llm);
            let combined = rule
                .with_confidence(confidence)
                .with_slots(slots)
                .with_tier(ClassifierTier::Ensemble);
            return match reasoning {
                Some(reasoning) => combined.with_reasoning(reasoning),
                None => combined,
            };
        }

        let reasoning = format!(
            "rules suggested {}, language model suggested {}",
            describe(&rule),
            describe(&llm)
        );
        let rule_vote = rule_weight * rule.confidence;
        let llm_vote = llm_weight * llm.confidence;
        let (winner, loser) = if llm_vote > rule_vote {
            (llm, rule)
        } else {
            (rule, llm)
        };

        if winner.intent.is_none() {
            return ClassificationResult::none(ClassifierTier::Ensemble);
        }
        if loser.intent.is_none() {
            return winner.with_tier(ClassifierTier::Ensemble);
        }

        let confidence = winner.confidence * DISAGREEMENT_PENALTY;
        let alternatives = with_candidate(&winner.alternatives, &loser);
        winner
            .with_confidence(confidence)
            .with_reasoning(reasoning)
            .with_alternatives(alternatives)
            .with_tier(ClassifierTier::Ensemble)
    }

    async fn llm_verify(&self, text: &str) -> ClassificationResult {
        let rule = self.rules.classify(text);

        if rule.confidence < self.config.rule_confidence_threshold {
            return match self.consult_llm(text).await {
                Opinion::Absent => rule,
                Opinion::Verdict(llm) => fill_slots(llm, &rule),
            };
        }

        let llm = match self.consult_llm(text).await {
            Opinion::Verdict(llm) => llm,
            Opinion::Absent => return rule,
        };

        if rule.agrees_with(&llm) {
            if llm.confidence < self.config.clarification_threshold {
                return rule;
            }
            let average = (rule.confidence + llm.confidence) / 2.0;
            let confidence = rule.confidence.max(average).min(1.0);
            return rule
                .with_confidence(confidence)
                .with_reasoning(format!("language model confirmed ({:.2})", llm.confidence))
                .with_tier(ClassifierTier::Ensemble);
        }

        if llm.intent.is_none() {
            return rule;
        }

        let confidence = contradicted(rule.confidence, llm.confidence);
        let reasoning = format!(
            "rules suggested {}, language model suggested {}",
            describe(&rule),
            describe(&llm)
        );
        let alternatives = with_candidate(&rule.alternatives, &llm);
        rule.with_confidence(confidence)
            .with_reasoning(reasoning)
            .with_alternatives(alternatives)
            .with_tier(ClassifierTier::Ensemble)
    }

    async fn consensus(&self, text: &str) -> ClassificationResult {
        let (rule, llm) = tokio::join!(async { self.rules.classify(text) }, self.consult_llm(text));
        let llm = llm.into_result();

        if rule.agrees_with(&llm) {
            let confidence = (rule.confidence + llm.confidence) / 2.0;
            let slots = merge_slots(&rule, &llm);
            return rule
                .with_confidence(confidence)
                .with_slots(slots)
                .with_reasoning("rules and language model agree")
                .with_tier(ClassifierTier::Ensemble);
        }

        let reasoning = format!(
            "no consensus: rules suggested {}, language model suggested {}",
            describe(&rule),
            describe(&llm)
        );
        let alternatives = [&rule, &llm]
            .into_iter()
            .filter_map(candidate)
            .collect();
        ClassificationResult::none(ClassifierTier::Ensemble)
            .with_reasoning(reasoning)
            .with_alternatives(alternatives)
    }
}

/// Rule confidence after the model named a different intent at `llm`:
/// midway between the rule confidence and the model's residual belief in
/// the rule's intent, and never above `VERIFY_PENALTY` of the original.
fn contradicted(rule: f64, llm: f64) -> f64 {
    let midpoint = (rule + (1.0 - llm)) / 2.0;
    midpoint.min(rule * VERIFY_PENALTY).clamp(0.0, 1.0)
}

/// Model verdict with any slots the rules extracted for the same intent.
fn fill_slots(llm: ClassificationResult, rule: &ClassificationResult) -> ClassificationResult {
    if !llm.agrees_with(rule) {
        return llm;
    }
    let slots = merge_slots(rule, &llm);
    llm.with_slots(slots)
}

/// Union of both slot maps; rule values win collisions.
fn merge_slots(rule: &ClassificationResult, llm: &ClassificationResult) -> Slots {
    let mut slots = llm.extracted_slots.clone();
    slots.extend(rule.extracted_slots.clone());
    slots
}

fn candidate(result: &ClassificationResult) -> Option<Candidate> {
    result.intent.clone().map(|intent| Candidate {
        intent,
        confidence: result.confidence,
    })
}

/// `existing` with `other`'s intent put first.
fn with_candidate(existing: &[Candidate], other: &ClassificationResult) -> Vec<Candidate> {
    let mut alternatives: Vec<Candidate> = candidate(other).into_iter().collect();
    alternatives.extend(
        existing
            .iter()
            .filter(|c| Some(c.intent.name.as_str()) != other.intent_name())
            .cloned(),
    );
    alternatives.truncate(3);
    alternatives
}

fn describe(result: &ClassificationResult) -> String {
    match result.intent_name() {
        Some(name) => format!("{name} ({:.2})", result.confidence),
        None => "nothing".to_string(),
    }
}
