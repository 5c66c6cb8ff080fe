//! Controllability check.
//!
//! Goals like "win the tournament" or "get hired at X" depend on other
//! people. A keyword pre-filter decides whether the generator is asked at all.

use std::sync::Arc;

use playbook::{Confidence, PromptAssembler};
use ritual_agent::{GenerationTask, GeneratorService};
use serde::Deserialize;
use tracing::warn;

use crate::gates::{patterns, Gate, GateInput};
use crate::types::{Choice, GateName, GateVerdict};

#[derive(Debug, Deserialize)]
struct ControllabilityReply {
    controllable: bool,
    #[serde(default)]
    confidence: Option<String>,
    #[serde(default)]
    reframe: Option<String>,
}

/// Generator-backed controllability gate.
pub struct ControllabilityGate {
    generator: Arc<GeneratorService>,
}

impl ControllabilityGate {
    pub fn new(generator: Arc<GeneratorService>) -> Self {
        Self { generator }
    }

    /// Whether the intent looks outcome-dependent enough to ask.
    pub fn needs_check(&self, input: &GateInput) -> bool {
        patterns::outcome_dependency(&input.normalized)
    }
}

#[async_trait::async_trait]
impl Gate for ControllabilityGate {
    fn name(&self) -> GateName {
        GateName::Controllability
    }

    async fn evaluate(&self, input: &GateInput) -> GateVerdict {
        let task = GenerationTask::ControllabilityCheck;
        let request = GeneratorService::request_for(
            task,
            PromptAssembler::controllability_prompt(),
            input.text.clone(),
        );

        let value = match self.generator.generate_json(task, request).await {
            Ok((value, _)) => value,
            Err(e) => {
                warn!(error = %e, "Controllability check failed");
                return GateVerdict::degraded(GateName::Controllability, e.to_string());
            }
        };

        let reply: ControllabilityReply = match serde_json::from_value(value) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Controllability reply has the wrong shape");
                return GateVerdict::degraded(GateName::Controllability, e.to_string());
            }
        };

        let confidence = reply
            .confidence
            .as_deref()
            .and_then(Confidence::parse)
            .unwrap_or(Confidence::Low);

        if reply.controllable || confidence < Confidence::Medium {
            return GateVerdict::ok(GateName::Controllability)
                .with_meta("controllable", reply.controllable)
                .with_meta("confidence", confidence.as_str());
        }

        let mut verdict = GateVerdict::clarify(GateName::Controllability, "outside_control")
            .with_meta("confidence", confidence.as_str());
        if let Some(reframe) = reply.reframe.filter(|r| !r.trim().is_empty()) {
            let label = input
                .locale
                .pick("Focus on what you control", "Se concentrer sur ce qui dépend de toi");
            verdict = verdict.with_choice(Choice::new("reframe", label, reframe.trim()));
        }
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Locale, VerdictStatus};
    use ritual_agent::MockBackend;

    fn gate(reply: &str) -> ControllabilityGate {
        let backend = Arc::new(MockBackend::default().with_response(reply));
        ControllabilityGate::new(Arc::new(GeneratorService::new(vec![backend])))
    }

    fn input(text: &str) -> GateInput {
        GateInput::new(text, 30, Locale::En)
    }

    #[test]
    fn test_prefilter() {
        let gate = gate("{}");
        assert!(gate.needs_check(&input("Win the club chess tournament")));
        assert!(!gate.needs_check(&input("Practice chess openings")));
    }

    #[tokio::test]
    async fn test_outside_control_offers_reframe() {
        let gate = gate(
            r#"{"controllable": false, "confidence": "high", "reframe": "Play 3 rated games a week"}"#,
        );
        let verdict = gate.evaluate(&input("Win the club chess tournament")).await;
        assert_eq!(verdict.status, VerdictStatus::NeedsClarification);
        assert_eq!(verdict.reason_code.as_deref(), Some("outside_control"));
        assert_eq!(verdict.choices[0].intent, "Play 3 rated games a week");
    }

    #[tokio::test]
    async fn test_low_confidence_passes() {
        let gate = gate(r#"{"controllable": false, "confidence": "low"}"#);
        let verdict = gate.evaluate(&input("Get hired as a barista")).await;
        assert!(verdict.is_ok());
        assert!(!verdict.degraded);
    }

    #[tokio::test]
    async fn test_malformed_reply_degrades() {
        let verdict = gate("maybe?").evaluate(&input("Win a medal")).await;
        assert!(verdict.is_ok());
        assert!(verdict.degraded);
        assert_eq!(verdict.meta_str("tone"), Some("default"));

        let verdict = gate(r#"{"confidence": "high"}"#).evaluate(&input("Win a medal")).await;
        assert!(verdict.degraded);
    }
}
