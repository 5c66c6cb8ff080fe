//! GeneratorService - main entry point for content generation.
//!
//! Selects an available backend, applies per-task defaults, bounds every
//! call with a timeout and records each call in the usage ledger.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::audit::{CallOutcome, LedgerEntry, UsageLedger};
use crate::backend::traits::{ContentGenerator, GenerationRequest, GeneratorError};
use crate::json::{excerpt, extract_json};
use crate::task::GenerationTask;
use crate::types::{GenerationCost, GenerationOutcome};

/// Characters of raw output kept in malformed-output errors.
const ERROR_EXCERPT_CHARS: usize = 400;

/// Error types for the service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// No backend available
    #[error("No content generator available")]
    NoBackendAvailable,

    /// Backend error
    #[error("Backend error: {0}")]
    BackendError(#[from] GeneratorError),

    /// Call exceeded its time budget
    #[error("{task} timed out after {timeout_ms}ms")]
    Timeout { task: GenerationTask, timeout_ms: u64 },

    /// Output did not contain the expected JSON object
    #[error("{task} returned malformed output: {excerpt}")]
    MalformedOutput { task: GenerationTask, excerpt: String },
}

impl ServiceError {
    /// Whether the failure is infrastructure rather than content.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NoBackendAvailable | Self::Timeout { .. } => true,
            Self::BackendError(e) => e.is_transient(),
            Self::MalformedOutput { .. } => false,
        }
    }
}

/// Configuration for the GeneratorService.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Timeout applied to every call (ms)
    pub timeout_ms: u64,
    /// Whether to record calls in the ledger
    pub ledger_enabled: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            ledger_enabled: true,
        }
    }
}

/// Main entry point for content generation.
pub struct GeneratorService {
    config: ServiceConfig,
    /// Backends in preference order
    backends: Vec<Arc<dyn ContentGenerator>>,
    ledger: Arc<UsageLedger>,
}

impl GeneratorService {
    /// Create a new service with the given backends.
    pub fn new(backends: Vec<Arc<dyn ContentGenerator>>) -> Self {
        Self {
            config: ServiceConfig::default(),
            backends,
            ledger: Arc::new(UsageLedger::new()),
        }
    }

    /// Create with configuration.
    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }

    pub fn ledger(&self) -> Arc<UsageLedger> {
        Arc::clone(&self.ledger)
    }

    /// A request with the task's default budget, temperature and format.
    pub fn request_for(
        task: GenerationTask,
        system_instructions: impl Into<String>,
        user_payload: impl Into<String>,
    ) -> GenerationRequest {
        let request = GenerationRequest::new(system_instructions, user_payload)
            .with_max_tokens(task.default_max_tokens())
            .with_temperature(task.default_temperature());
        if task.expects_json() {
            request.with_json_output()
        } else {
            request
        }
    }

    /// Run one generation.
    pub async fn generate(
        &self,
        task: GenerationTask,
        request: GenerationRequest,
    ) -> Result<GenerationOutcome, ServiceError> {
        let backend = match self.select_backend().await {
            Ok(backend) => backend,
            Err(e) => {
                self.record(LedgerEntry::new(task, CallOutcome::Failed).with_error(e.to_string()))
                    .await;
                return Err(e);
            }
        };

        debug!(task = %task, backend = backend.id(), "Dispatching generation");
        let start = Instant::now();
        let result = tokio::time::timeout(self.timeout(), backend.generate(request)).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match result {
            Err(_) => {
                warn!(task = %task, backend = backend.id(), timeout_ms = self.config.timeout_ms, "Generation timed out");
                self.record(
                    LedgerEntry::new(task, CallOutcome::TimedOut)
                        .with_backend(backend.id())
                        .with_cost(GenerationCost {
                            processing_time_ms: elapsed_ms,
                            ..Default::default()
                        }),
                )
                .await;
                Err(ServiceError::Timeout {
                    task,
                    timeout_ms: self.config.timeout_ms,
                })
            }
            Ok(Err(e)) => {
                warn!(task = %task, backend = backend.id(), error = %e, "Generation failed");
                self.record(
                    LedgerEntry::new(task, CallOutcome::Failed)
                        .with_backend(backend.id())
                        .with_error(e.to_string()),
                )
                .await;
                Err(ServiceError::BackendError(e))
            }
            Ok(Ok(response)) => {
                let cost = GenerationCost::from_usage(response.usage, elapsed_ms);
                self.record(
                    LedgerEntry::new(task, CallOutcome::Succeeded)
                        .with_backend(backend.id())
                        .with_cost(cost.clone()),
                )
                .await;
                Ok(GenerationOutcome {
                    task,
                    backend_id: backend.id().to_string(),
                    content: response.content,
                    finish_reason: response.finish_reason,
                    cost,
                })
            }
        }
    }

    /// Run one generation and extract the JSON object from its output.
    pub async fn generate_json(
        &self,
        task: GenerationTask,
        request: GenerationRequest,
    ) -> Result<(serde_json::Value, GenerationOutcome), ServiceError> {
        let outcome = self.generate(task, request).await?;
        match extract_json(&outcome.content) {
            Some(value) => Ok((value, outcome)),
            None => Err(ServiceError::MalformedOutput {
                task,
                excerpt: excerpt(&outcome.content, ERROR_EXCERPT_CHARS),
            }),
        }
    }

    /// Select the first available backend.
    async fn select_backend(&self) -> Result<Arc<dyn ContentGenerator>, ServiceError> {
        for backend in &self.backends {
            if backend.is_available().await {
                return Ok(Arc::clone(backend));
            }
        }
        Err(ServiceError::NoBackendAvailable)
    }

    async fn record(&self, entry: LedgerEntry) {
        if self.config.ledger_enabled {
            self.ledger.record(entry).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockReply};

    #[tokio::test]
    async fn test_generate_json_from_fenced_output() {
        let backend = Arc::new(MockBackend::default().with_response("```json\n{\"controllable\": true}\n```"));
        let service = GeneratorService::new(vec![backend.clone()]);

        let request = GeneratorService::request_for(GenerationTask::ControllabilityCheck, "sys", "goal");
        let (value, outcome) = service
            .generate_json(GenerationTask::ControllabilityCheck, request)
            .await
            .unwrap();

        assert_eq!(value["controllable"], true);
        assert_eq!(outcome.backend_id, "mock-model");
        assert_eq!(backend.requests()[0].temperature, Some(0.0));
        assert_eq!(service.ledger().stats().await.succeeded, 1);
    }

    #[tokio::test]
    async fn test_falls_through_unavailable_backend() {
        let down = Arc::new(MockBackend::new("down").with_available(false));
        let up = Arc::new(MockBackend::new("up").with_response("music"));
        let service = GeneratorService::new(vec![down.clone(), up]);

        let outcome = service
            .generate(GenerationTask::DomainLabel, GenerationRequest::new("", "piano"))
            .await
            .unwrap();

        assert_eq!(outcome.backend_id, "up");
        assert_eq!(down.call_count(), 0);
    }

    #[tokio::test]
    async fn test_no_backend() {
        let service = GeneratorService::new(vec![]);
        let result = service
            .generate(GenerationTask::MissionContent, GenerationRequest::new("", ""))
            .await;
        assert!(matches!(result, Err(ServiceError::NoBackendAvailable)));
        assert_eq!(service.ledger().stats().await.failed, 1);
    }

    #[tokio::test]
    async fn test_timeout_is_reported_and_recorded() {
        let backend = Arc::new(
            MockBackend::default().with_script([MockReply::Stall(Duration::from_millis(500))]),
        );
        let service = GeneratorService::new(vec![backend]).with_config(ServiceConfig {
            timeout_ms: 20,
            ledger_enabled: true,
        });

        let err = service
            .generate(GenerationTask::ClarifyChips, GenerationRequest::new("", ""))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Timeout { timeout_ms: 20, .. }));
        assert!(err.is_transient());
        assert_eq!(service.ledger().stats().await.timed_out, 1);
    }

    #[tokio::test]
    async fn test_malformed_output() {
        let backend = Arc::new(MockBackend::default().with_response("I cannot do that."));
        let service = GeneratorService::new(vec![backend]);

        let err = service
            .generate_json(GenerationTask::PlanGeneration, GenerationRequest::new("", ""))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::MalformedOutput { ref excerpt, .. } if excerpt == "I cannot do that."));
        assert!(!err.is_transient());
    }
}
