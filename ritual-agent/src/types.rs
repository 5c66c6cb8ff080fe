//! Common types for the ritual-agent crate.

use serde::{Deserialize, Serialize};

use crate::backend::traits::{FinishReason, Usage};
use crate::task::GenerationTask;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Cost information for one generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct GenerationCost {
    /// Number of input tokens processed
    pub input_tokens: u32,
    /// Number of output tokens generated
    pub output_tokens: u32,
    /// Wall-clock time in milliseconds
    pub processing_time_ms: u64,
}

impl GenerationCost {
    pub fn from_usage(usage: Usage, processing_time_ms: u64) -> Self {
        Self {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            processing_time_ms,
        }
    }
}

/// Successful result of a service call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub task: GenerationTask,
    /// Backend that served the call
    pub backend_id: String,
    /// Raw content as returned by the backend
    pub content: String,
    pub finish_reason: FinishReason,
    pub cost: GenerationCost,
}

impl GenerationOutcome {
    /// Whether the backend stopped on its token budget.
    pub fn truncated(&self) -> bool {
        self.finish_reason == FinishReason::Length
    }
}
