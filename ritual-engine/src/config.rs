//! Configuration for the ritual engine.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use ritual_agent::{ContentGenerator, GeneratorService, OpenAiBackend, ServiceConfig};

/// Configuration for the whole engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Decision pipeline configuration
    pub orchestrator: OrchestratorConfig,
    /// Realism thresholds
    pub realism: RealismConfig,
    /// Plan generation configuration
    pub plan: PlanConfig,
    /// Mission content configuration
    pub mission: MissionConfig,
    /// Clarify chips configuration
    pub clarify: ClarifyConfig,
    /// Content generator configuration
    pub generator: GeneratorConfig,
}

impl EngineConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Decision pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Intent length ceiling (characters)
    pub max_intent_chars: usize,
    /// Longest accepted ritual duration (days)
    pub max_days: u32,
    /// Accepted locale tags
    pub supported_locales: Vec<String>,
    /// Ask the generator about sensitive but inconclusive intents
    pub llm_safety_escalation: bool,
    /// Ask the generator when the keyword classifier is unsure
    pub domain_llm_fallback: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_intent_chars: 280,
            max_days: 365,
            supported_locales: vec!["en".to_string(), "fr".to_string()],
            llm_safety_escalation: false,
            domain_llm_fallback: true,
        }
    }
}

/// Realism thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealismConfig {
    /// Minimum days for a fluency claim in a language
    pub language_days: u32,
    /// Minimum days for an expert claim on an instrument
    pub music_days: u32,
    /// Minimum days for an expert claim in a sport
    pub sport_days: u32,
    /// Kilograms per week
    pub kg_per_week: f32,
    /// Days per book
    pub days_per_book: u32,
    /// Days per marathon
    pub days_per_marathon: u32,
    /// Days per language
    pub days_per_language: u32,
    /// Connectives tolerated alongside an action verb
    pub max_connectives: usize,
}

impl Default for RealismConfig {
    fn default() -> Self {
        Self {
            language_days: 60,
            music_days: 90,
            sport_days: 90,
            kg_per_week: 1.0,
            days_per_book: 3,
            days_per_marathon: 30,
            days_per_language: 90,
            max_connectives: 1,
        }
    }
}

impl RealismConfig {
    /// Level-claim threshold for a domain, if the domain has one.
    pub fn level_threshold(&self, domain_id: &str) -> Option<u32> {
        match domain_id {
            "language" => Some(self.language_days),
            "music" => Some(self.music_days),
            "sport" => Some(self.sport_days),
            _ => None,
        }
    }
}

/// Plan generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// Attempts before giving up
    pub max_attempts: u32,
    /// Token the summary must start with
    pub marker: String,
    /// Raw output kept in a failure (characters)
    pub excerpt_chars: usize,
    pub min_minutes: u32,
    pub max_minutes: u32,
    pub min_steps_per_level: usize,
    pub max_steps_per_level: usize,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            marker: "[ritual:v1]".to_string(),
            excerpt_chars: 400,
            min_minutes: 5,
            max_minutes: 10,
            min_steps_per_level: 4,
            max_steps_per_level: 5,
        }
    }
}

impl PlanConfig {
    /// Number of levels for a ritual of `days` days.
    pub fn levels_for(&self, days: u32) -> usize {
        match days {
            0..=14 => 2,
            15..=30 => 3,
            _ => 4,
        }
    }
}

/// Mission content configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    /// Blocks kept per mission
    pub max_blocks: usize,
    /// Consecutive fail/partial outcomes before a step fails
    pub max_remediation_rounds: u8,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            max_blocks: 4,
            max_remediation_rounds: 3,
        }
    }
}

/// Clarify chips configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClarifyConfig {
    /// Cache entry lifetime (days)
    pub ttl_days: i64,
    /// Version of the chips prompt, part of the cache key
    pub prompt_version: String,
}

impl Default for ClarifyConfig {
    fn default() -> Self {
        Self {
            ttl_days: 7,
            prompt_version: "chips-v1".to_string(),
        }
    }
}

/// Content generator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// OpenAI-compatible endpoint
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    /// Per-call timeout (ms)
    pub timeout_ms: u64,
    pub ledger_enabled: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            model: "llama3.1".to_string(),
            api_key_env: None,
            timeout_ms: 30_000,
            ledger_enabled: true,
        }
    }
}

impl GeneratorConfig {
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            timeout_ms: self.timeout_ms,
            ledger_enabled: self.ledger_enabled,
        }
    }

    /// Build a generator service backed by the configured endpoint.
    pub fn build_service(&self) -> GeneratorService {
        let api_key = self
            .api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok());
        let backend: Arc<dyn ContentGenerator> =
            Arc::new(OpenAiBackend::new(&self.base_url, &self.model, api_key));
        GeneratorService::new(vec![backend]).with_config(self.service_config())
    }
}
