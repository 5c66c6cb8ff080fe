//! Ritual Agent - content generation for ritual planning
//!
//! Provides the infrastructure the ritual engine uses to talk to text
//! generation backends:
//! - Trait-based content generators (OpenAI-compatible, scripted mock)
//! - Generation tasks with per-task token budgets and temperatures
//! - Timeouts, backend fallback and JSON extraction
//! - A usage ledger of every call
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          GeneratorService               │
//! │  (timeouts, fallback, JSON extraction)  │
//! └────────────────┬────────────────────────┘
//!                  │
//!      ┌───────────┴───────────┐
//!      ▼                       ▼
//! ┌─────────────────┐   ┌─────────────┐
//! │ContentGenerator │   │ UsageLedger │
//! │ (OpenAI / Mock) │   │             │
//! └─────────────────┘   └─────────────┘
//! ```

pub mod audit;
pub mod backend;
pub mod json;
pub mod service;
pub mod task;
pub mod types;

// Re-export main types for convenience
pub use audit::{CallOutcome, LedgerEntry, LedgerStats, UsageLedger};
pub use backend::traits::{
    ContentGenerator, FinishReason, GenerationRequest, GenerationResponse, GeneratorError,
    ResponseFormat, Usage,
};
pub use backend::{MockBackend, MockReply, OpenAiBackend};
pub use json::{excerpt, extract_json};
pub use service::{GeneratorService, ServiceConfig, ServiceError};
pub use task::GenerationTask;
pub use types::*;
