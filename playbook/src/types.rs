//! Core types for domain playbooks.
//!
//! A playbook is the policy bundle attached to one learning domain: which
//! kinds of effort a generated plan may ask for, how those efforts are
//! weighted, which tone the copy should take and how remediation content is
//! simplified when a learner struggles.
//!
//! With the `typescript` feature enabled, these types can be exported to
//! TypeScript using ts-rs for consistency with the client.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Maximum number of resources a mission may reference.
pub const MAX_RESOURCES_PER_MISSION: u8 = 3;

/// The kind of effort a step asks of the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum EffortType {
    /// Reading an article, a page, a chapter
    Read,
    /// Watching a short video or demonstration
    Watch,
    /// Listening to audio (podcast, music, native speakers)
    Listen,
    /// Deliberate repetition of a skill
    Practice,
    /// Producing something new
    Create,
    /// Journaling or thinking back on what was done
    Reflect,
    /// Noticing details in the environment or in a model
    Observe,
    /// Physical activity
    Move,
}

impl EffortType {
    /// All effort types in declaration order.
    pub fn all() -> [Self; 8] {
        [
            Self::Read,
            Self::Watch,
            Self::Listen,
            Self::Practice,
            Self::Create,
            Self::Reflect,
            Self::Observe,
            Self::Move,
        ]
    }

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Watch => "watch",
            Self::Listen => "listen",
            Self::Practice => "practice",
            Self::Create => "create",
            Self::Reflect => "reflect",
            Self::Observe => "observe",
            Self::Move => "move",
        }
    }

    /// Parse a wire name.
    pub fn parse(value: &str) -> Option<Self> {
        Self::all()
            .into_iter()
            .find(|e| e.as_str() == value.trim().to_lowercase())
    }

    /// The learning axis this effort naturally exercises.
    pub fn default_axis(&self) -> Axis {
        match self {
            Self::Read | Self::Watch => Axis::Understand,
            Self::Practice | Self::Create | Self::Move => Axis::Do,
            Self::Listen | Self::Observe => Axis::Perceive,
            Self::Reflect => Axis::Consolidate,
        }
    }
}

/// Learning axis of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Understand,
    Do,
    Perceive,
    Consolidate,
}

impl Axis {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Understand => "understand",
            Self::Do => "do",
            Self::Perceive => "perceive",
            Self::Consolidate => "consolidate",
        }
    }

    /// Parse a wire name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "understand" => Some(Self::Understand),
            "do" => Some(Self::Do),
            "perceive" => Some(Self::Perceive),
            "consolidate" => Some(Self::Consolidate),
            _ => None,
        }
    }
}

/// A domain playbook.
///
/// Playbooks are immutable once registered; a change produces a new version
/// inside a new registry snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct DomainPlaybook {
    /// Domain identifier (e.g. `language`)
    pub id: String,
    /// Semantic version
    pub version: String,
    /// Human-readable profile label copied into generated paths
    pub profile_label: String,
    /// Effort types a plan in this domain may use
    pub allowed_effort_types: Vec<EffortType>,
    /// Relative weighting of effort types (keys must be allowed)
    pub weights: BTreeMap<EffortType, f32>,
    /// Tone constraints for generated copy
    pub tone_rules: Vec<ToneRule>,
    /// How remediation content differs from first-pass content
    pub remediation_rules: Vec<RemediationRule>,
    /// Resource limits
    pub resource_policy: ResourcePolicy,
}

impl DomainPlaybook {
    /// Whether an effort type is permitted in this domain.
    pub fn allows(&self, effort: EffortType) -> bool {
        self.allowed_effort_types.contains(&effort)
    }

    /// The domain lock for this playbook.
    pub fn lock(&self) -> DomainLock {
        DomainLock {
            domain_id: self.id.clone(),
            domain_profile_label: self.profile_label.clone(),
            domain_version: self.version.clone(),
        }
    }

    /// Effort types sorted by descending weight.
    pub fn ranked_efforts(&self) -> Vec<(EffortType, f32)> {
        let mut ranked: Vec<(EffortType, f32)> = self
            .allowed_effort_types
            .iter()
            .map(|e| (*e, self.weights.get(e).copied().unwrap_or(0.0)))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }
}

/// A tone constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ToneRule {
    pub id: String,
    pub statement: String,
}

/// A remediation rule applied when a step is retried after fail/partial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct RemediationRule {
    pub id: String,
    pub statement: String,
}

/// Resource limits for missions of a domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ResourcePolicy {
    /// Maximum resources per mission (never above 3)
    pub max_resources: u8,
    /// Whether resources may carry external links
    pub allow_external_links: bool,
}

impl Default for ResourcePolicy {
    fn default() -> Self {
        Self {
            max_resources: MAX_RESOURCES_PER_MISSION,
            allow_external_links: false,
        }
    }
}

/// Domain metadata locked by the resolver and copied verbatim into a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct DomainLock {
    pub domain_id: String,
    pub domain_profile_label: String,
    pub domain_version: String,
}

/// Builder helpers shared by the built-in domain providers.
pub(crate) fn rules(prefix: &str, statements: &[&str]) -> Vec<ToneRule> {
    statements
        .iter()
        .enumerate()
        .map(|(i, s)| ToneRule {
            id: format!("{}-tone-{}", prefix, i + 1),
            statement: (*s).to_string(),
        })
        .collect()
}

pub(crate) fn remediation(prefix: &str, statements: &[&str]) -> Vec<RemediationRule> {
    statements
        .iter()
        .enumerate()
        .map(|(i, s)| RemediationRule {
            id: format!("{}-remediation-{}", prefix, i + 1),
            statement: (*s).to_string(),
        })
        .collect()
}

pub(crate) fn weights(pairs: &[(EffortType, f32)]) -> BTreeMap<EffortType, f32> {
    pairs.iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effort_roundtrip_names() {
        for effort in EffortType::all() {
            assert_eq!(EffortType::parse(effort.as_str()), Some(effort));
        }
        assert_eq!(EffortType::parse(" Practice "), Some(EffortType::Practice));
        assert_eq!(EffortType::parse("sing"), None);
    }

    #[test]
    fn test_default_axis() {
        assert_eq!(EffortType::Read.default_axis(), Axis::Understand);
        assert_eq!(EffortType::Move.default_axis(), Axis::Do);
        assert_eq!(EffortType::Listen.default_axis(), Axis::Perceive);
        assert_eq!(EffortType::Reflect.default_axis(), Axis::Consolidate);
    }

    #[test]
    fn test_effort_type_serde_name() {
        let json = serde_json::to_string(&EffortType::Practice).unwrap();
        assert_eq!(json, "\"practice\"");
    }
}
