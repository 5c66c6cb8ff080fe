//! Generation tasks.
//!
//! Every call into a content generator is made on behalf of one task. The
//! task fixes the default token budget, the temperature and whether the
//! reply must be JSON, and is the key of the usage ledger.

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Kinds of generation the ritual engine performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "kebab-case")]
pub enum GenerationTask {
    /// Learning path and mission stubs
    PlanGeneration,
    /// Blocks of one mission
    MissionContent,
    /// Single domain label for low-confidence classifications
    DomainLabel,
    /// Whether a goal depends on the learner's own actions
    ControllabilityCheck,
    /// Escalation for sensitive but possibly legitimate goals
    SafetyClassification,
    /// Clarification chips for vague goals
    ClarifyChips,
}

impl GenerationTask {
    pub fn all() -> [Self; 6] {
        [
            Self::PlanGeneration,
            Self::MissionContent,
            Self::DomainLabel,
            Self::ControllabilityCheck,
            Self::SafetyClassification,
            Self::ClarifyChips,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlanGeneration => "plan-generation",
            Self::MissionContent => "mission-content",
            Self::DomainLabel => "domain-label",
            Self::ControllabilityCheck => "controllability-check",
            Self::SafetyClassification => "safety-classification",
            Self::ClarifyChips => "clarify-chips",
        }
    }

    /// Default token budget.
    pub fn default_max_tokens(&self) -> u32 {
        match self {
            Self::PlanGeneration => 4096,
            Self::MissionContent => 1200,
            Self::ClarifyChips => 600,
            Self::ControllabilityCheck | Self::SafetyClassification => 200,
            Self::DomainLabel => 16,
        }
    }

    /// Default temperature. Classification tasks run cold.
    pub fn default_temperature(&self) -> f32 {
        match self {
            Self::PlanGeneration | Self::MissionContent => 0.7,
            Self::ClarifyChips => 0.5,
            Self::DomainLabel | Self::ControllabilityCheck | Self::SafetyClassification => 0.0,
        }
    }

    /// Whether the reply must be a JSON object.
    pub fn expects_json(&self) -> bool {
        !matches!(self, Self::DomainLabel)
    }

    /// Whether a failure can be absorbed by a neutral fallback.
    pub fn is_optional(&self) -> bool {
        !matches!(self, Self::PlanGeneration)
    }
}

impl std::fmt::Display for GenerationTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_serialization() {
        let json = serde_json::to_string(&GenerationTask::ControllabilityCheck).unwrap();
        assert_eq!(json, "\"controllability-check\"");

        for task in GenerationTask::all() {
            let json = serde_json::to_string(&task).unwrap();
            assert_eq!(json, format!("\"{}\"", task.as_str()));
        }
    }

    #[test]
    fn test_only_plan_generation_is_mandatory() {
        let mandatory: Vec<_> = GenerationTask::all()
            .into_iter()
            .filter(|t| !t.is_optional())
            .collect();
        assert_eq!(mandatory, vec![GenerationTask::PlanGeneration]);
        assert!(!GenerationTask::DomainLabel.expects_json());
    }
}
