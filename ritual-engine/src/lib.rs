//! Ritual Engine - from a free-text learning goal to a daily ritual
//!
//! Turns a learner's intent into either a clarification request, a refusal
//! or a generated learning path, then tracks progress through it:
//!
//! - **Decision pipeline**: actionability, safety, realism, controllability, domain
//! - **Plan generation**: bounded retries with normalization and validation
//! - **Missions**: content filled on demand, simplified on remediation
//! - **Progression**: step states recomputed from an append-only log
//! - **Clarify chips**: cached narrowing suggestions for broad intents
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        RitualService                         │
//! │                                                              │
//! │  ┌──────────────┐   ┌───────────────┐   ┌────────────────┐   │
//! │  │ Orchestrator │──▶│ PlanGenerator │──▶│ Progression    │   │
//! │  │  (gates)     │   │ (retry loop)  │   │ Machine        │   │
//! │  └──────┬───────┘   └───────┬───────┘   └────────────────┘   │
//! │         │                   │                                │
//! │  ┌──────▼───────┐   ┌───────▼───────┐                        │
//! │  │DomainResolver│   │MissionAdapter │                        │
//! │  └──────────────┘   └───────────────┘                        │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod clarify;
pub mod config;
pub mod gates;
pub mod mission;
pub mod orchestrator;
pub mod plan;
pub mod progression;
pub mod resolver;
pub mod ritual;
pub mod types;

// Re-export main types
pub use clarify::{CacheTrace, ChipContract, ChipSection, ChipTrace, ClarifyChips};
pub use config::EngineConfig;
pub use mission::{Block, MissionAdapter, MissionFull};
pub use orchestrator::{InputError, Orchestrator};
pub use plan::{GeneratedPlan, LearningPath, PlanFailure, PlanGenerator};
pub use progression::{
    ProgressEvent, ProgressOutcome, ProgressionError, ProgressionMachine, QuizAnswer, StepState, StepView,
};
pub use resolver::{DomainResolver, Resolution};
pub use ritual::{
    InMemoryProgressSink, ProgressDetails, ProgressSink, RitualService, RitualStatus, RitualStatusView,
    SubmitOutcome, SubmitRequest,
};
pub use types::*;
