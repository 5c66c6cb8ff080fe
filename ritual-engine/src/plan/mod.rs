//! Learning path generation.
//!
//! Raw generator replies go through three separate stages: [`normalize`]
//! repairs what is safe to repair, serde decodes into [`schema`] types and
//! [`validate`] checks the structural and editorial rules.

pub mod generator;
pub mod normalize;
pub mod schema;
pub mod validate;

pub use generator::{AttemptFeedback, AttemptLoop, GeneratedPlan, PlanFailure, PlanGenerator};
pub use normalize::MappingDiagnostic;
pub use schema::{
    Competency, GatingMode, LearningPath, Level, MissionStub, PlanDocument, Resource, RitualMode,
    Step, ValidationMode,
};
pub use validate::{strip_marker, ValidationIssue, INVALID_MISSION_STUBS};
