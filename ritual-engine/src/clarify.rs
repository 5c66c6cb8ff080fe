//! Clarify chips.
//!
//! When an intent is too broad, the client shows a few sections of short
//! chips to narrow it down. Generated chip sets are cached per prompt
//! version, domain, normalized intent, language and duration. A generated
//! reply that does not match the contract is replaced by a static localized
//! fallback, which is never cached.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use playbook::text::normalize;
use playbook::{compute_hash, PromptAssembler};
use ritual_agent::{GenerationTask, GeneratorService};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::config::ClarifyConfig;
use crate::types::Locale;

/// How the chip set was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum CacheTrace {
    Hit,
    Miss,
    /// The cache was not read
    Bypass,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(deny_unknown_fields)]
pub struct ChipSection {
    pub key: String,
    pub title: String,
    pub chips: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(deny_unknown_fields)]
pub struct ChipTrace {
    pub cache: CacheTrace,
    pub fallback: bool,
}

/// The chip set returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(deny_unknown_fields)]
pub struct ChipContract {
    pub template_key: String,
    pub prompt_version: String,
    pub lang: String,
    pub days: u32,
    pub sections: Vec<ChipSection>,
    pub trace: ChipTrace,
}

/// Contract violations.
#[derive(Debug, thiserror::Error)]
pub enum ChipError {
    #[error("Invalid chip contract: {0}")]
    Shape(#[from] serde_json::Error),

    #[error("Expected 2 to 3 sections, got {0}")]
    SectionCount(usize),

    #[error("Section '{0}' has no chips")]
    EmptySection(String),
}

impl ChipContract {
    /// Strict decode: unknown fields and out-of-bounds sections are rejected.
    pub fn from_json(json: &str) -> Result<Self, ChipError> {
        let contract: Self = serde_json::from_str(json)?;
        check_sections(&contract.sections)?;
        Ok(contract)
    }
}

/// Shape of the generator reply.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChipReply {
    sections: Vec<ChipSection>,
}

fn check_sections(sections: &[ChipSection]) -> Result<(), ChipError> {
    if !(2..=3).contains(&sections.len()) {
        return Err(ChipError::SectionCount(sections.len()));
    }
    if let Some(empty) = sections.iter().find(|s| s.chips.iter().all(|c| c.trim().is_empty())) {
        return Err(ChipError::EmptySection(empty.key.clone()));
    }
    Ok(())
}

/// Source of the current time.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

struct CacheEntry {
    contract: ChipContract,
    expires_at: DateTime<Utc>,
}

/// Clarify chip provider with a TTL cache.
pub struct ClarifyChips {
    config: ClarifyConfig,
    generator: Option<Arc<GeneratorService>>,
    cache: DashMap<String, CacheEntry>,
    clock: Clock,
}

impl ClarifyChips {
    pub fn new(config: ClarifyConfig) -> Self {
        Self {
            config,
            generator: None,
            cache: DashMap::new(),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_generator(mut self, generator: Arc<GeneratorService>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Cache key of a request.
    pub fn cache_key(&self, intent: &str, domain: &str, lang: Locale, days: u32) -> String {
        let material = format!(
            "{}|{}|{}|{}|{}",
            self.config.prompt_version,
            domain,
            normalize(intent),
            lang.as_str(),
            days
        );
        compute_hash(material.as_bytes())
    }

    /// Chips for an intent. `bypass` skips the cache read but still stores
    /// a fresh generated set.
    pub async fn chips(
        &self,
        intent: &str,
        domain: &str,
        lang: Locale,
        days: u32,
        bypass: bool,
    ) -> ChipContract {
        let key = self.cache_key(intent, domain, lang, days);
        let now = (self.clock)();

        if !bypass {
            if let Some(entry) = self.cache.get(&key) {
                if entry.expires_at > now {
                    debug!(domain, "Clarify chips cache hit");
                    let mut contract = entry.contract.clone();
                    contract.trace = ChipTrace {
                        cache: CacheTrace::Hit,
                        fallback: false,
                    };
                    return contract;
                }
            }
        }

        let cache = if bypass { CacheTrace::Bypass } else { CacheTrace::Miss };
        match self.generate(intent, domain, lang, days).await {
            Some(sections) => {
                let contract = ChipContract {
                    template_key: format!("generated:{}", domain),
                    prompt_version: self.config.prompt_version.clone(),
                    lang: lang.as_str().to_string(),
                    days,
                    sections,
                    trace: ChipTrace {
                        cache,
                        fallback: false,
                    },
                };
                self.cache.insert(
                    key,
                    CacheEntry {
                        contract: contract.clone(),
                        expires_at: now + Duration::days(self.config.ttl_days),
                    },
                );
                contract
            }
            None => ChipContract {
                template_key: format!("fallback:{}", lang.as_str()),
                prompt_version: self.config.prompt_version.clone(),
                lang: lang.as_str().to_string(),
                days,
                sections: fallback_sections(lang),
                trace: ChipTrace {
                    cache,
                    fallback: true,
                },
            },
        }
    }

    async fn generate(&self, intent: &str, domain: &str, lang: Locale, days: u32) -> Option<Vec<ChipSection>> {
        let generator = self.generator.as_ref()?;
        let task = GenerationTask::ClarifyChips;
        let request = GeneratorService::request_for(
            task,
            PromptAssembler::clarify_prompt(&self.config.prompt_version, lang.as_str()),
            json!({"intent": intent, "domain": domain, "days": days}).to_string(),
        );

        let value = match generator.generate_json(task, request).await {
            Ok((value, _)) => value,
            Err(e) => {
                warn!(domain, error = %e, "Clarify chips generation failed");
                return None;
            }
        };
        let parsed = serde_json::from_value::<ChipReply>(value)
            .map_err(ChipError::from)
            .and_then(|reply| check_sections(&reply.sections).map(|_| reply.sections));
        match parsed {
            Ok(sections) => Some(sections),
            Err(e) => {
                warn!(domain, error = %e, "Clarify chips reply rejected");
                None
            }
        }
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = (self.clock)();
        let mut purged = 0;
        self.cache.retain(|_, entry| {
            let live = entry.expires_at > now;
            if !live {
                purged += 1;
            }
            live
        });
        purged
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

fn section(key: &str, title: &str, chips: &[&str]) -> ChipSection {
    ChipSection {
        key: key.to_string(),
        title: title.to_string(),
        chips: chips.iter().map(|c| (*c).to_string()).collect(),
    }
}

fn fallback_sections(lang: Locale) -> Vec<ChipSection> {
    match lang {
        Locale::En => vec![
            section("level", "Your level", &["Beginner", "Intermediate", "Advanced"]),
            section("focus", "Focus", &["Understand the basics", "Practice", "Build a habit"]),
            section("rhythm", "Rhythm", &["5 min a day", "10 min a day", "A few times a week"]),
        ],
        Locale::Fr => vec![
            section("level", "Ton niveau", &["Débutant", "Intermédiaire", "Avancé"]),
            section("focus", "Objectif", &["Comprendre les bases", "Pratiquer", "Prendre une habitude"]),
            section("rhythm", "Rythme", &["5 min par jour", "10 min par jour", "Quelques fois par semaine"]),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ritual_agent::MockBackend;
    use std::sync::Mutex;

    const REPLY: &str = r#"{"sections": [
        {"key": "instrument", "title": "Instrument", "chips": ["Acoustic", "Electric"]},
        {"key": "style", "title": "Style", "chips": ["Folk", "Rock"]}
    ]}"#;

    fn chips_with(reply: &str) -> (Arc<MockBackend>, ClarifyChips) {
        let backend = Arc::new(MockBackend::default().with_response(reply));
        let generator = Arc::new(GeneratorService::new(vec![backend.clone()]));
        (backend, ClarifyChips::new(ClarifyConfig::default()).with_generator(generator))
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let (backend, chips) = chips_with(REPLY);

        let first = chips.chips("Learn guitar", "music", Locale::En, 30, false).await;
        assert_eq!(first.trace.cache, CacheTrace::Miss);
        assert!(!first.trace.fallback);
        assert_eq!(first.sections.len(), 2);

        let second = chips.chips("  learn GUITAR ", "music", Locale::En, 30, false).await;
        assert_eq!(second.trace.cache, CacheTrace::Hit);
        assert_eq!(second.sections, first.sections);
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_key_varies_with_days_and_lang() {
        let (backend, chips) = chips_with(REPLY);
        chips.chips("Learn guitar", "music", Locale::En, 30, false).await;
        chips.chips("Learn guitar", "music", Locale::En, 60, false).await;
        chips.chips("Learn guitar", "music", Locale::Fr, 30, false).await;
        assert_eq!(backend.call_count(), 3);
        assert_eq!(chips.len(), 3);
    }

    #[tokio::test]
    async fn test_bypass_refreshes() {
        let (backend, chips) = chips_with(REPLY);
        chips.chips("Learn guitar", "music", Locale::En, 30, false).await;
        let bypassed = chips.chips("Learn guitar", "music", Locale::En, 30, true).await;
        assert_eq!(bypassed.trace.cache, CacheTrace::Bypass);
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_invalid_reply_falls_back_uncached() {
        let (backend, chips) = chips_with(r#"{"sections": [{"key": "a", "title": "A", "chips": ["x"]}]}"#);

        let first = chips.chips("Learn guitar", "music", Locale::Fr, 30, false).await;
        assert!(first.trace.fallback);
        assert_eq!(first.template_key, "fallback:fr");
        assert_eq!(first.sections[0].title, "Ton niveau");
        assert!(chips.is_empty());

        chips.chips("Learn guitar", "music", Locale::Fr, 30, false).await;
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_fields_rejected() {
        let (_, chips) = chips_with(
            r#"{"sections": [
                {"key": "a", "title": "A", "chips": ["x"], "emoji": "🎸"},
                {"key": "b", "title": "B", "chips": ["y"]}
            ]}"#,
        );
        assert!(chips.chips("Learn guitar", "music", Locale::En, 30, false).await.trace.fallback);
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let now = Arc::new(Mutex::new(Utc::now()));
        let clock_now = Arc::clone(&now);
        let (backend, chips) = chips_with(REPLY);
        let chips = chips.with_clock(Arc::new(move || *clock_now.lock().unwrap()));

        chips.chips("Learn guitar", "music", Locale::En, 30, false).await;
        *now.lock().unwrap() += Duration::days(8);

        let again = chips.chips("Learn guitar", "music", Locale::En, 30, false).await;
        assert_eq!(again.trace.cache, CacheTrace::Miss);
        assert_eq!(backend.call_count(), 2);

        *now.lock().unwrap() += Duration::days(8);
        assert_eq!(chips.purge_expired(), 1);
    }

    #[tokio::test]
    async fn test_purge_counts_only_expired_entries() {
        let now = Arc::new(Mutex::new(Utc::now()));
        let clock_now = Arc::clone(&now);
        let (_, chips) = chips_with(REPLY);
        let chips = chips.with_clock(Arc::new(move || *clock_now.lock().unwrap()));

        chips.chips("Learn guitar", "music", Locale::En, 30, false).await;
        *now.lock().unwrap() += Duration::days(4);
        chips.chips("Learn piano", "music", Locale::En, 30, false).await;
        *now.lock().unwrap() += Duration::days(4);

        assert_eq!(chips.purge_expired(), 1);
        assert_eq!(chips.len(), 1);
        assert_eq!(chips.purge_expired(), 0);
    }

    #[test]
    fn test_contract_from_json_is_strict() {
        let contract = ChipContract {
            template_key: "fallback:en".into(),
            prompt_version: "chips-v1".into(),
            lang: "en".into(),
            days: 30,
            sections: fallback_sections(Locale::En),
            trace: ChipTrace {
                cache: CacheTrace::Miss,
                fallback: true,
            },
        };
        let json = serde_json::to_string(&contract).unwrap();
        assert_eq!(ChipContract::from_json(&json).unwrap(), contract);

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["extra"] = serde_json::json!(1);
        assert!(ChipContract::from_json(&value.to_string()).is_err());
    }
}
