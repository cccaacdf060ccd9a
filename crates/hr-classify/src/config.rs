//! Routing and language-model configuration.
//!
//! `RoutingConfig` is built once (from a preset, by hand, or from the
//! `[routing]` TOML table) and is read-only afterwards.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How the rule and language-model verdicts are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Trust confident rules, ask the model otherwise.
    #[default]
    RuleFirst,
    /// Run both, combine by weight.
    WeightedVote,
    /// Rules decide, the model confirms or contests.
    LlmVerify,
    /// Run both, accept only when they agree.
    Consensus,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RuleFirst => "rule_first",
            Self::WeightedVote => "weighted_vote",
            Self::LlmVerify => "llm_verify",
            Self::Consensus => "consensus",
        }
    }
}

/// Named bundles of option values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Default,
    ForAccuracy,
    ForHybrid,
    ForLowLatency,
}

impl Preset {
    pub fn config(self) -> RoutingConfig {
        match self {
            Self::Default => RoutingConfig::default(),
            Self::ForAccuracy => RoutingConfig::for_accuracy(),
            Self::ForHybrid => RoutingConfig::for_hybrid(),
            Self::ForLowLatency => RoutingConfig::for_low_latency(),
        }
    }
}

/// Options controlling classification and dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RoutingSection")]
pub struct RoutingConfig {
    pub strategy: Strategy,
    /// Minimum confidence to dispatch to an intent's handler.
    pub confidence_threshold: f64,
    /// Below this the router asks the caller to clarify.
    pub clarification_threshold: f64,
    /// Rule confidence at which the rules are trusted alone
    /// (`rule_first`, `llm_verify`).
    pub rule_confidence_threshold: f64,
    /// Rule-side weight (`weighted_vote` only).
    pub rule_weight: f64,
    /// Model-side weight (`weighted_vote` only).
    pub llm_weight: f64,
    /// Upper bound on a single language-model call.
    pub llm_timeout_ms: u64,
    /// When false the language model is never built nor consulted.
    pub llm_enabled: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::RuleFirst,
            confidence_threshold: 0.5,
            clarification_threshold: 0.5,
            rule_confidence_threshold: 0.7,
            rule_weight: 0.4,
            llm_weight: 0.6,
            llm_timeout_ms: 10_000,
            llm_enabled: true,
        }
    }
}

impl RoutingConfig {
    /// Both classifiers vote on every input.
    pub fn for_accuracy() -> Self {
        Self {
            strategy: Strategy::WeightedVote,
            rule_confidence_threshold: 0.9,
            ..Self::default()
        }
    }

    /// Rules decide, the model double-checks.
    pub fn for_hybrid() -> Self {
        Self {
            strategy: Strategy::LlmVerify,
            rule_confidence_threshold: 0.85,
            ..Self::default()
        }
    }

    /// Rules only.
    pub fn for_low_latency() -> Self {
        Self {
            strategy: Strategy::RuleFirst,
            rule_confidence_threshold: 0.5,
            llm_enabled: false,
            llm_timeout_ms: 2_000,
            ..Self::default()
        }
    }

    /// Look up a preset by its config name (`"for_hybrid"`, ...).
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        let preset = match name {
            "default" => Preset::Default,
            "for_accuracy" => Preset::ForAccuracy,
            "for_hybrid" => Preset::ForHybrid,
            "for_low_latency" => Preset::ForLowLatency,
            other => return Err(ConfigError::UnknownPreset(other.to_string())),
        };
        Ok(preset.config())
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_millis(self.llm_timeout_ms)
    }

    /// `(rule, llm)` weights scaled to sum to 1.
    pub fn normalized_weights(&self) -> (f64, f64) {
        let sum = self.rule_weight + self.llm_weight;
        if sum > 0.0 {
            (self.rule_weight / sum, self.llm_weight / sum)
        } else {
            (0.5, 0.5)
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("confidence_threshold", self.confidence_threshold),
            ("clarification_threshold", self.clarification_threshold),
            ("rule_confidence_threshold", self.rule_confidence_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { name, value });
            }
        }

        let (rule, llm) = (self.rule_weight, self.llm_weight);
        if !(rule >= 0.0 && llm >= 0.0 && rule + llm > 0.0) {
            return Err(ConfigError::InvalidWeights { rule, llm });
        }

        if self.llm_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

/// `[routing]` as written in TOML: an optional preset plus overrides.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RoutingSection {
    preset: Option<Preset>,
    strategy: Option<Strategy>,
    confidence_threshold: Option<f64>,
    clarification_threshold: Option<f64>,
    rule_confidence_threshold: Option<f64>,
    rule_weight: Option<f64>,
    llm_weight: Option<f64>,
    llm_timeout_ms: Option<u64>,
    llm_enabled: Option<bool>,
}

impl From<RoutingSection> for RoutingConfig {
    fn from(section: RoutingSection) -> Self {
        let base = section.preset.map(Preset::config).unwrap_or_default();
        Self {
            strategy: section.strategy.unwrap_or(base.strategy),
            confidence_threshold: section
                .confidence_threshold
                .unwrap_or(base.confidence_threshold),
            clarification_threshold: section
                .clarification_threshold
                .unwrap_or(base.clarification_threshold),
            rule_confidence_threshold: section
                .rule_confidence_threshold
                .unwrap_or(base.rule_confidence_threshold),
            rule_weight: section.rule_weight.unwrap_or(base.rule_weight),
            llm_weight: section.llm_weight.unwrap_or(base.llm_weight),
            llm_timeout_ms: section.llm_timeout_ms.unwrap_or(base.llm_timeout_ms),
            llm_enabled: section.llm_enabled.unwrap_or(base.llm_enabled),
        }
    }
}

/// Wire protocol spoken by the language-model server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Ollama `/api/chat`.
    #[default]
    Ollama,
    /// `/v1/chat/completions` (llama.cpp server, vLLM, LM Studio).
    OpenaiCompatible,
}

/// Connection settings for the local language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub backend: BackendKind,
    /// HTTP base URL of the model server.
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Cap on generated tokens; the verdict is a short JSON object.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Bearer token, only sent to OpenAI-compatible servers.
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_host() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "llama3.2:3b".into()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_max_tokens() -> u32 {
    150
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            host: default_host(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            api_key: None,
        }
    }
}
