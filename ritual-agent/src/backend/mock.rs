//! Mock content generator for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::traits::*;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this content
    Content(String),
    /// Fail with a request error
    Fail(String),
    /// Sleep for this long before replying with the default content
    Stall(Duration),
}

/// Mock backend for testing.
///
/// Replies are taken from a script in order; once the script is exhausted
/// every call gets the default response. Every request is recorded.
pub struct MockBackend {
    model_id: String,
    available: AtomicBool,
    capabilities: ModelCapabilities,
    response_content: String,
    script: Mutex<VecDeque<MockReply>>,
    delay: Option<Duration>,
    requests: Mutex<Vec<GenerationRequest>>,
    call_count: AtomicU32,
}

impl MockBackend {
    /// Create a new mock backend.
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            available: AtomicBool::new(true),
            capabilities: ModelCapabilities {
                supports_json_mode: true,
                ..Default::default()
            },
            response_content: "Mock response".to_string(),
            script: Mutex::new(VecDeque::new()),
            delay: None,
            requests: Mutex::new(Vec::new()),
            call_count: AtomicU32::new(0),
        }
    }

    /// Set the default response content.
    pub fn with_response(mut self, content: impl Into<String>) -> Self {
        self.response_content = content.into();
        self
    }

    /// Queue scripted replies.
    pub fn with_script(self, replies: impl IntoIterator<Item = MockReply>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.extend(replies);
        }
        self
    }

    /// Delay every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Set availability.
    pub fn with_available(self, available: bool) -> Self {
        self.available.store(available, Ordering::SeqCst);
        self
    }

    /// Get the number of times generate was called.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn next_reply(&self) -> Option<MockReply> {
        self.script.lock().ok().and_then(|mut s| s.pop_front())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new("mock-model")
    }
}

#[async_trait]
impl ContentGenerator for MockBackend {
    fn id(&self) -> &str {
        &self.model_id
    }

    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, GeneratorError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        if !self.available.load(Ordering::SeqCst) {
            return Err(GeneratorError::Unavailable("Mock backend disabled".to_string()));
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let content = match self.next_reply() {
            Some(MockReply::Content(content)) => content,
            Some(MockReply::Fail(message)) => return Err(GeneratorError::RequestFailed(message)),
            Some(MockReply::Stall(duration)) => {
                tokio::time::sleep(duration).await;
                self.response_content.clone()
            }
            None => self.response_content.clone(),
        };

        let completion_tokens = content.len() as u32 / 4;
        Ok(GenerationResponse {
            content,
            finish_reason: FinishReason::Stop,
            usage: Usage {
                prompt_tokens: request.estimated_prompt_tokens(),
                completion_tokens,
            },
        })
    }

    fn capabilities(&self) -> &ModelCapabilities {
        &self.capabilities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_backend() {
        let backend = MockBackend::new("test-model").with_response("Hello, world!");

        assert!(backend.is_available().await);
        assert_eq!(backend.call_count(), 0);

        let response = backend
            .generate(GenerationRequest::new("sys", "Hi"))
            .await
            .unwrap();

        assert_eq!(response.content, "Hello, world!");
        assert_eq!(backend.call_count(), 1);
        assert_eq!(backend.requests()[0].user_payload, "Hi");
    }

    #[tokio::test]
    async fn test_script_then_default() {
        let backend = MockBackend::default()
            .with_response("fallback")
            .with_script([MockReply::Content("first".into()), MockReply::Fail("boom".into())]);

        let first = backend.generate(GenerationRequest::new("", "")).await.unwrap();
        assert_eq!(first.content, "first");

        let second = backend.generate(GenerationRequest::new("", "")).await;
        assert!(matches!(second, Err(GeneratorError::RequestFailed(m)) if m == "boom"));

        let third = backend.generate(GenerationRequest::new("", "")).await.unwrap();
        assert_eq!(third.content, "fallback");
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_unavailable() {
        let backend = MockBackend::new("test-model").with_available(false);

        assert!(!backend.is_available().await);

        let result = backend.generate(GenerationRequest::new("", "Hi")).await;
        assert!(result.is_err());
    }
}
