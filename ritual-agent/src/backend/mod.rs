//! Content generator abstraction layer.
//!
//! Provides a trait-based interface over text-generation backends:
//! - OpenAI-compatible (vLLM, Ollama, OpenAI, etc.)
//! - Scripted mock backend for testing

pub mod mock;
pub mod openai;
pub mod traits;

pub use mock::{MockBackend, MockReply};
pub use openai::OpenAiBackend;
pub use traits::{
    ContentGenerator, FinishReason, GenerationRequest, GenerationResponse, GeneratorError,
    ModelCapabilities, ResponseFormat, Usage,
};
