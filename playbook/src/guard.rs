//! Versioned lexicon guard rulesets.
//!
//! A ruleset is a list of per-locale regex rules, each carrying the reason
//! code reported when it fires. Rulesets are edited by admins and loaded
//! through a [`GuardRulesetSource`]; the engine compiles them into a
//! [`LexiconGuard`] and runs it after the built-in lexicon.

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::registry::PlaybookError;
use crate::text::normalize;

/// Locale wildcard for rules that apply everywhere.
pub const ANY_LOCALE: &str = "*";

/// A single guard rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardRule {
    pub id: String,
    /// Locale the rule applies to (`en`, `fr`, or `*`)
    #[serde(default = "any_locale")]
    pub locale: String,
    /// Regex matched case-insensitively against normalized text
    pub pattern: String,
    pub reason_code: String,
}

fn any_locale() -> String {
    ANY_LOCALE.to_string()
}

/// A versioned set of guard rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardRuleset {
    pub version: String,
    pub rules: Vec<GuardRule>,
}

impl GuardRuleset {
    /// Parse a ruleset from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, PlaybookError> {
        serde_yaml::from_str(yaml).map_err(|e| PlaybookError::Parse(e.to_string()))
    }

    /// Ruleset shipped with the crate.
    ///
    /// Patterns are written against normalized text (lowercase, no accents).
    pub fn builtin() -> Self {
        let rule = |id: &str, locale: &str, pattern: &str, reason: &str| GuardRule {
            id: id.to_string(),
            locale: locale.to_string(),
            pattern: pattern.to_string(),
            reason_code: reason.to_string(),
        };

        Self {
            version: "2024.1".to_string(),
            rules: vec![
                rule(
                    "harm-others-en",
                    "en",
                    r"\b(kill|hurt|poison|beat up)\s+(my|his|her|their|a|the|some)\b",
                    "harm_to_others",
                ),
                rule(
                    "harm-others-fr",
                    "fr",
                    r"\b(tuer|blesser|empoisonner|frapper)\s+(mon|ma|mes|son|sa|ses|un|une|quelqu)",
                    "harm_to_others",
                ),
                rule(
                    "explosives",
                    ANY_LOCALE,
                    r"\b(bomb|bombe|explosive|explosif)s?\b",
                    "dangerous_manufacture",
                ),
                rule(
                    "stalking-en",
                    "en",
                    r"\b(stalk|spy on|track)\s+(my|his|her)\s+(ex|neighbou?r|wife|husband|girlfriend|boyfriend)\b",
                    "harassment",
                ),
                rule(
                    "stalking-fr",
                    "fr",
                    r"\b(harceler|espionner|traquer)\b",
                    "harassment",
                ),
                rule(
                    "self-harm",
                    ANY_LOCALE,
                    r"\b(suicide|self[- ]harm|me suicider|scarifi)",
                    "self_harm",
                ),
            ],
        }
    }
}

/// A rule that matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardHit {
    pub rule_id: String,
    pub reason_code: String,
    pub ruleset_version: String,
}

struct CompiledRule {
    id: String,
    locale: String,
    regex: Regex,
    reason_code: String,
}

/// Compiled form of a [`GuardRuleset`].
pub struct LexiconGuard {
    version: String,
    rules: Vec<CompiledRule>,
}

impl LexiconGuard {
    /// Compile every rule. Fails on the first pattern that does not compile.
    pub fn compile(ruleset: &GuardRuleset) -> Result<Self, PlaybookError> {
        let mut rules = Vec::with_capacity(ruleset.rules.len());
        for rule in &ruleset.rules {
            let regex = RegexBuilder::new(&rule.pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| PlaybookError::InvalidGuardRule {
                    rule_id: rule.id.clone(),
                    message: e.to_string(),
                })?;
            rules.push(CompiledRule {
                id: rule.id.clone(),
                locale: rule.locale.to_lowercase(),
                regex,
                reason_code: rule.reason_code.clone(),
            });
        }
        Ok(Self {
            version: ruleset.version.clone(),
            rules,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// First rule matching the text for this locale, in ruleset order.
    pub fn check(&self, text: &str, locale: &str) -> Option<GuardHit> {
        let normalized = normalize(text);
        let locale = locale.to_lowercase();

        self.rules
            .iter()
            .filter(|r| r.locale == ANY_LOCALE || r.locale == locale)
            .find(|r| r.regex.is_match(&normalized))
            .map(|r| GuardHit {
                rule_id: r.id.clone(),
                reason_code: r.reason_code.clone(),
                ruleset_version: self.version.clone(),
            })
    }
}

/// Where the current ruleset comes from.
#[async_trait]
pub trait GuardRulesetSource: Send + Sync {
    async fn load(&self) -> Result<GuardRuleset, PlaybookError>;
}

/// Admin-editable ruleset held in memory.
#[derive(Clone)]
pub struct InMemoryGuardRulesetSource {
    current: Arc<RwLock<Option<GuardRuleset>>>,
}

impl InMemoryGuardRulesetSource {
    pub fn new(ruleset: GuardRuleset) -> Self {
        Self {
            current: Arc::new(RwLock::new(Some(ruleset))),
        }
    }

    /// A source with nothing published yet. Loading from it fails.
    pub fn empty() -> Self {
        Self {
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Replace the published ruleset. The new one must compile.
    pub async fn publish(&self, ruleset: GuardRuleset) -> Result<(), PlaybookError> {
        LexiconGuard::compile(&ruleset)?;
        tracing::info!(version = %ruleset.version, rules = ruleset.rules.len(), "Guard ruleset published");
        *self.current.write().await = Some(ruleset);
        Ok(())
    }
}

impl Default for InMemoryGuardRulesetSource {
    fn default() -> Self {
        Self::new(GuardRuleset::builtin())
    }
}

#[async_trait]
impl GuardRulesetSource for InMemoryGuardRulesetSource {
    async fn load(&self) -> Result<GuardRuleset, PlaybookError> {
        self.current
            .read()
            .await
            .clone()
            .ok_or_else(|| PlaybookError::RulesetUnavailable("no ruleset published".to_string()))
    }
}
