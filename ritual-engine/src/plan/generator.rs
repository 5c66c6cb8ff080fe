//! Plan generation with bounded retries.
//!
//! Each attempt asks the generator for a full plan, normalizes the raw JSON,
//! decodes it and validates it. Failed attempts feed their issues back into
//! the next request. A wrong number of missions is never repaired; it
//! consumes an attempt like any other failure.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use playbook::{DomainLock, DomainPlaybook, PlanTargets, PromptAssembler};
use ritual_agent::{excerpt, extract_json, GenerationTask, GeneratorService};

use crate::config::PlanConfig;
use crate::plan::normalize::{normalize, MappingDiagnostic};
use crate::plan::schema::{LearningPath, MissionStub, PlanDocument};
use crate::plan::validate::{final_code, strip_marker, validate, ValidationIssue};
use crate::types::Locale;

/// Issues of one failed attempt, sent back with the next request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptFeedback {
    pub attempt: u32,
    pub code: String,
    pub issues: Vec<String>,
}

/// Generation gave up after its last attempt.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code} after {attempts} attempts")]
pub struct PlanFailure {
    pub code: String,
    /// Issues of the last attempt
    pub issues: Vec<String>,
    /// Start of the last raw reply
    pub excerpt: String,
    pub attempts: u32,
}

/// Retry state: attempt counter, bound and feedback accumulator.
#[derive(Debug, Clone)]
pub struct AttemptLoop {
    attempt: u32,
    max_attempts: u32,
    feedback: Vec<AttemptFeedback>,
}

impl AttemptLoop {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_attempts.max(1),
            feedback: Vec::new(),
        }
    }

    /// Start the next attempt. `None` once the bound is reached.
    pub fn next(&mut self) -> Option<u32> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        self.attempt += 1;
        Some(self.attempt)
    }

    /// Record the failure of the current attempt.
    pub fn fail(&mut self, code: impl Into<String>, issues: Vec<String>) {
        self.feedback.push(AttemptFeedback {
            attempt: self.attempt,
            code: code.into(),
            issues,
        });
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn feedback(&self) -> &[AttemptFeedback] {
        &self.feedback
    }

    fn last(&self) -> Option<&AttemptFeedback> {
        self.feedback.last()
    }
}

/// A validated plan.
#[derive(Debug, Clone)]
pub struct GeneratedPlan {
    pub path: LearningPath,
    pub stubs: Vec<MissionStub>,
    /// Repairs applied to the accepted reply
    pub diagnostics: Vec<MappingDiagnostic>,
    pub attempts: u32,
}

enum AttemptError {
    Rejected {
        code: &'static str,
        issues: Vec<String>,
        raw: String,
    },
    Transport(String),
}

/// Generates learning paths.
pub struct PlanGenerator {
    generator: Arc<GeneratorService>,
    config: PlanConfig,
}

impl PlanGenerator {
    pub fn new(generator: Arc<GeneratorService>, config: PlanConfig) -> Self {
        Self { generator, config }
    }

    pub fn targets(&self, days: u32) -> PlanTargets {
        PlanTargets {
            levels: self.config.levels_for(days),
            min_steps_per_level: self.config.min_steps_per_level,
            max_steps_per_level: self.config.max_steps_per_level,
            min_minutes: self.config.min_minutes,
            max_minutes: self.config.max_minutes,
        }
    }

    /// Generate a plan for an accepted intent.
    pub async fn generate(
        &self,
        goal: &str,
        days: u32,
        locale: Locale,
        lock: &DomainLock,
        playbook: &DomainPlaybook,
        hints: &[String],
    ) -> Result<GeneratedPlan, PlanFailure> {
        let targets = self.targets(days);
        let system = PromptAssembler::plan_prompt(playbook, lock, &targets, &self.config.marker);
        let mut attempts = AttemptLoop::new(self.config.max_attempts);
        let mut last_raw = String::new();

        while let Some(attempt) = attempts.next() {
            let payload = json!({
                "goal": goal,
                "days": days,
                "locale": locale.as_str(),
                "hints": hints,
                "previous_attempts": attempts.feedback(),
            });

            match self.attempt(&system, payload.to_string(), lock, playbook, &targets).await {
                Ok((doc, diagnostics)) => {
                    info!(
                        attempt,
                        domain = %lock.domain_id,
                        steps = doc.path.step_count(),
                        repairs = diagnostics.len(),
                        "Plan accepted"
                    );
                    let mut path = doc.path;
                    path.summary = strip_marker(&path.summary, &self.config.marker);
                    return Ok(GeneratedPlan {
                        path,
                        stubs: doc.missions,
                        diagnostics,
                        attempts: attempt,
                    });
                }
                Err(AttemptError::Rejected { code, issues, raw }) => {
                    info!(attempt, code, issues = issues.len(), "Plan attempt rejected");
                    last_raw = raw;
                    attempts.fail(code, issues);
                }
                Err(AttemptError::Transport(error)) => {
                    warn!(attempt, error = %error, "Plan attempt failed");
                    attempts.fail("generator_unavailable", vec![error]);
                }
            }
        }

        let (code, issues) = attempts
            .last()
            .map(|f| (f.code.clone(), f.issues.clone()))
            .unwrap_or_else(|| ("invalid_plan".to_string(), Vec::new()));
        warn!(code = %code, attempts = attempts.attempt(), "Plan generation exhausted");

        Err(PlanFailure {
            code,
            issues,
            excerpt: excerpt(&last_raw, self.config.excerpt_chars),
            attempts: attempts.attempt(),
        })
    }

    async fn attempt(
        &self,
        system: &str,
        payload: String,
        lock: &DomainLock,
        playbook: &DomainPlaybook,
        targets: &PlanTargets,
    ) -> Result<(PlanDocument, Vec<MappingDiagnostic>), AttemptError> {
        let task = GenerationTask::PlanGeneration;
        let request = GeneratorService::request_for(task, system, payload);
        let outcome = self
            .generator
            .generate(task, request)
            .await
            .map_err(|e| AttemptError::Transport(e.to_string()))?;
        if outcome.truncated() {
            warn!(backend = %outcome.backend_id, "Plan reply hit the token limit");
        }
        let raw = outcome.content;

        let Some(value) = extract_json(&raw) else {
            return Err(AttemptError::Rejected {
                code: "invalid_json",
                issues: vec!["reply contains no JSON object".to_string()],
                raw,
            });
        };

        let (value, diagnostics) = normalize(value, lock);
        let doc: PlanDocument = match serde_json::from_value(value) {
            Ok(doc) => doc,
            Err(e) => {
                return Err(AttemptError::Rejected {
                    code: "invalid_schema",
                    issues: vec![e.to_string()],
                    raw,
                })
            }
        };

        let issues = validate(&doc, playbook, targets, &self.config.marker);
        if issues.is_empty() {
            Ok((doc, diagnostics))
        } else {
            Err(AttemptError::Rejected {
                code: final_code(&issues),
                issues: issues.into_iter().map(describe).collect(),
                raw,
            })
        }
    }

}

fn describe(issue: ValidationIssue) -> String {
    format!("{}: {}", issue.code, issue.message)
}


#[cfg(test)]
mod tests {
    use super::fixtures::plan_json;
    use super::*;
    use playbook::domains::LanguageDomain;
    use playbook::DomainProvider;
    use ritual_agent::{MockBackend, MockReply};

    fn setup(backend: MockBackend) -> (Arc<MockBackend>, PlanGenerator) {
        let backend = Arc::new(backend);
        let service = Arc::new(GeneratorService::new(vec![backend.clone()]));
        (backend, PlanGenerator::new(service, PlanConfig::default()))
    }

    async fn run(generator: &PlanGenerator) -> Result<GeneratedPlan, PlanFailure> {
        let playbook = LanguageDomain.default_playbook();
        generator
            .generate("Improve my Spanish vocabulary", 14, Locale::En, &playbook.lock(), &playbook, &[])
            .await
    }

    #[test]
    fn test_attempt_loop_bound() {
        let mut attempts = AttemptLoop::new(2);
        assert_eq!(attempts.next(), Some(1));
        attempts.fail("level_count", vec![]);
        assert_eq!(attempts.next(), Some(2));
        assert_eq!(attempts.next(), None);
        assert_eq!(attempts.feedback().len(), 1);
    }

    #[tokio::test]
    async fn test_first_attempt_accepted() {
        let (backend, generator) = setup(MockBackend::default().with_response(plan_json(2, 4).to_string()));
        let plan = run(&generator).await.unwrap();

        assert_eq!(plan.attempts, 1);
        assert_eq!(plan.path.levels.len(), 2);
        assert_eq!(plan.stubs.len(), 8);
        assert_eq!(plan.path.summary, "Ten new words every day.");
        assert_eq!(plan.path.domain.domain_id, "language");
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_retry_sends_feedback() {
        let mut short = plan_json(2, 4);
        short["missions"].as_array_mut().unwrap().pop();

        let (backend, generator) = setup(
            MockBackend::default()
                .with_script([MockReply::Content(short.to_string())])
                .with_response(plan_json(2, 4).to_string()),
        );
        let plan = run(&generator).await.unwrap();

        assert_eq!(plan.attempts, 2);
        let requests = backend.requests();
        assert!(requests[1].user_payload.contains("invalid_mission_stubs"));
        assert!(!requests[0].user_payload.contains("invalid_mission_stubs"));
    }

    #[tokio::test]
    async fn test_repeated_step_ids_are_retried() {
        let mut restarted = plan_json(2, 4);
        for (s, step) in restarted["path"]["levels"][1]["steps"]
            .as_array_mut()
            .unwrap()
            .iter_mut()
            .enumerate()
        {
            step["id"] = json!(format!("s1-{}", s + 1));
        }

        let (backend, generator) = setup(
            MockBackend::default()
                .with_script([MockReply::Content(restarted.to_string())])
                .with_response(plan_json(2, 4).to_string()),
        );
        let plan = run(&generator).await.unwrap();

        assert_eq!(plan.attempts, 2);
        assert!(backend.requests()[1].user_payload.contains("duplicate_step_id"));
        assert!(plan.path.steps().any(|s| s.id == "s2-1"));
    }

    #[tokio::test]
    async fn test_transport_error_consumes_attempt() {
        let (_, generator) = setup(
            MockBackend::default()
                .with_script([MockReply::Fail("connection reset".into())])
                .with_response(plan_json(2, 4).to_string()),
        );
        assert_eq!(run(&generator).await.unwrap().attempts, 2);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_last_failure() {
        let (backend, generator) = setup(MockBackend::default().with_response(format!(
            "Sure! Here is a plan: {}",
            plan_json(3, 4)
        )));
        let failure = run(&generator).await.unwrap_err();

        assert_eq!(failure.code, "level_count");
        assert_eq!(failure.attempts, 2);
        assert!(failure.excerpt.chars().count() <= 400);
        assert!(failure.excerpt.starts_with("Sure!"));
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_invalid_schema() {
        let mut broken = plan_json(2, 4);
        broken["path"]["ritual_mode"] = json!("weekly");
        let (_, generator) = setup(MockBackend::default().with_response(broken.to_string()));
        assert_eq!(run(&generator).await.unwrap_err().code, "invalid_schema");
    }
}
