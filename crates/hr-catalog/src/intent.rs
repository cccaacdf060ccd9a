//! Intent definitions: category, keywords, slot patterns and prompt examples.

use std::collections::BTreeSet;
use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CatalogError, CatalogResult};

/// High-level domain an intent belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    Social,
    Code,
    File,
    Question,
    Productivity,
    Home,
    Control,
    /// Caller-defined intents that fit none of the built-in domains.
    Other,
}

impl IntentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Social => "social",
            Self::Code => "code",
            Self::File => "file",
            Self::Question => "question",
            Self::Productivity => "productivity",
            Self::Home => "home",
            Self::Control => "control",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A case-insensitive regular expression whose named capture groups are slots.
///
/// Compiled once at construction; serializes as its source string so intents
/// can be declared in TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SlotPattern {
    regex: Regex,
}

impl SlotPattern {
    pub fn new(source: &str) -> CatalogResult<Self> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(true)
            .build()
            .map_err(|e| CatalogError::InvalidPattern {
                pattern: source.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { regex })
    }

    /// Pattern source as written.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Names of the capture groups this pattern declares.
    pub fn slot_names(&self) -> impl Iterator<Item = &str> {
        self.regex.capture_names().flatten()
    }

    /// Match `text` and return the named groups that captured something.
    ///
    /// `None` means the pattern did not match at all. Captured values are
    /// trimmed; groups that did not participate or captured only whitespace
    /// are left out.
    pub fn captures(&self, text: &str) -> Option<Vec<(String, String)>> {
        let caps = self.regex.captures(text)?;
        let slots = self
            .regex
            .capture_names()
            .flatten()
            .filter_map(|name| {
                let value = caps.name(name)?.as_str().trim();
                (!value.is_empty()).then(|| (name.to_string(), value.to_string()))
            })
            .collect();
        Some(slots)
    }
}

impl TryFrom<String> for SlotPattern {
    type Error = CatalogError;

    fn try_from(source: String) -> CatalogResult<Self> {
        Self::new(&source)
    }
}

impl From<SlotPattern> for String {
    fn from(pattern: SlotPattern) -> Self {
        pattern.as_str().to_string()
    }
}

impl PartialEq for SlotPattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for SlotPattern {}

/// A named category of user request the system can act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub category: IntentCategory,
    /// Unique key across the catalog.
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Words or phrases that hint at this intent, stored trimmed and
    /// lowercased.
    #[serde(default, deserialize_with = "deserialize_keywords")]
    pub keywords: BTreeSet<String>,
    /// Ordered patterns; named capture groups become slots.
    #[serde(default)]
    pub patterns: Vec<SlotPattern>,
    /// Sample utterances, only used to prompt the language model.
    #[serde(default)]
    pub examples: Vec<String>,
    /// Capture groups that may stay empty without blocking dispatch.
    #[serde(default)]
    pub optional_slots: BTreeSet<String>,
    /// Slots that must be present even though no pattern declares them.
    #[serde(default)]
    pub required_slots: BTreeSet<String>,
}

impl Intent {
    pub fn new(category: IntentCategory, name: &str, description: &str) -> Self {
        Self {
            category,
            name: name.to_string(),
            description: description.to_string(),
            keywords: BTreeSet::new(),
            patterns: Vec::new(),
            examples: Vec::new(),
            optional_slots: BTreeSet::new(),
            required_slots: BTreeSet::new(),
        }
    }

    pub fn keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords
            .extend(keywords.iter().filter_map(|k| normalize_keyword(k)));
        self
    }

    /// Append patterns, compiling each one. Fails on the first invalid regex.
    pub fn patterns(mut self, patterns: &[&str]) -> CatalogResult<Self> {
        for source in patterns {
            self.patterns.push(SlotPattern::new(source)?);
        }
        Ok(self)
    }

    pub fn examples(mut self, examples: &[&str]) -> Self {
        self.examples.extend(examples.iter().map(|e| e.to_string()));
        self
    }

    pub fn optional_slots(mut self, slots: &[&str]) -> Self {
        self.optional_slots
            .extend(slots.iter().map(|s| s.to_string()));
        self
    }

    pub fn require_slots(mut self, slots: &[&str]) -> Self {
        self.required_slots
            .extend(slots.iter().map(|s| s.to_string()));
        self
    }

    /// Slots that must be filled before a handler may run.
    ///
    /// Every named group declared by the patterns, minus `optional_slots`,
    /// plus the explicit `required_slots`.
    pub fn required_slot_names(&self) -> BTreeSet<&str> {
        let mut names: BTreeSet<&str> = self
            .patterns
            .iter()
            .flat_map(|p| p.slot_names())
            .filter(|name| !self.optional_slots.contains(*name))
            .collect();
        names.extend(self.required_slots.iter().map(String::as_str));
        names
    }

    /// True when neither keywords nor patterns can ever select this intent.
    pub fn is_llm_only(&self) -> bool {
        self.keywords.is_empty() && self.patterns.is_empty()
    }
}

fn normalize_keyword(keyword: &str) -> Option<String> {
    let keyword = keyword.trim();
    (!keyword.is_empty()).then(|| keyword.to_lowercase())
}

/// Config-supplied keywords get the same normalization as the builder.
fn deserialize_keywords<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    Ok(raw.iter().filter_map(|k| normalize_keyword(k)).collect())
}
