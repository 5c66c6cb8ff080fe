//! Learning path and mission stub types.

use serde::{Deserialize, Serialize};

use playbook::{Axis, DomainLock, EffortType};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// How often the learner is expected to show up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum RitualMode {
    Daily,
    Flexible,
}

/// How completion of a mission is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// A quiz is scored
    Automatic,
    /// The learner ticks a checklist
    SelfReport,
    /// Showing up is enough; scoring is not allowed
    Presence,
}

impl ValidationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::SelfReport => "self_report",
            Self::Presence => "presence",
        }
    }
}

/// Whether steps unlock in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum GatingMode {
    /// Locked steps cannot be opened
    Strict,
    /// Locked steps are shown as locked but can be opened
    Soft,
    /// Any step can be opened
    #[serde(rename = "none")]
    Open,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Competency {
    pub id: String,
    pub title: String,
}

/// One step of a level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Step {
    pub id: String,
    pub index: u32,
    pub title: String,
    pub competency_id: String,
    pub axis: Axis,
    pub effort_type: EffortType,
    pub duration_minutes: u32,
    #[serde(default = "default_required")]
    pub required: bool,
    pub mission_id: String,
}

fn default_required() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Level {
    pub id: String,
    pub index: u32,
    pub title: String,
    pub steps: Vec<Step>,
}

/// A generated learning path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct LearningPath {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub description: String,
    pub feasibility_note: String,
    pub ritual_mode: RitualMode,
    pub validation_mode: ValidationMode,
    pub gating_mode: GatingMode,
    /// Copied verbatim from the resolver
    pub domain: DomainLock,
    pub competencies: Vec<Competency>,
    pub levels: Vec<Level>,
}

impl LearningPath {
    /// Steps in path order.
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.levels.iter().flat_map(|l| l.steps.iter())
    }

    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps().find(|s| s.id == step_id)
    }

    pub fn step_count(&self) -> usize {
        self.levels.iter().map(|l| l.steps.len()).sum()
    }

    pub fn has_competency(&self, id: &str) -> bool {
        self.competencies.iter().any(|c| c.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Resource {
    pub title: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Short description of the mission behind a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct MissionStub {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub angle: String,
    pub action_verb: String,
    pub effort_type: EffortType,
    pub competency_id: String,
    pub estimated_minutes: u32,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// Shape of a plan reply once normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDocument {
    pub path: LearningPath,
    pub missions: Vec<MissionStub>,
}
