//! Decision orchestrator.
//!
//! Runs the gates in a fixed order and turns their verdicts into a
//! [`Decision`]. The first gate that clarifies or blocks stops the pipeline;
//! every later stage is recorded as skipped so the trace always covers the
//! whole pipeline.

use std::sync::Arc;

use playbook::{DomainClassifier, GuardRulesetSource, PlaybookRegistry};
use ritual_agent::GeneratorService;
use tracing::{debug, info, instrument};

use crate::config::{EngineConfig, OrchestratorConfig};
use crate::gates::{
    ActionabilityGate, AssistedSafetyGate, ControllabilityGate, Gate, GateInput, LexiconSafetyGate,
    RealismGate,
};
use crate::resolver::DomainResolver;
use crate::types::{
    Branch, Decision, DecisionPayload, GateName, GateVerdict, Locale, ProceedPayload,
    ResolveOptions, TraceEvent, VerdictStatus,
};

/// Request rejected before any gate runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("Intent text is empty")]
    EmptyText,

    #[error("Duration of {days} days is outside 1..={max}")]
    DaysOutOfRange { days: u32, max: u32 },

    #[error("Unsupported locale '{0}'")]
    UnsupportedLocale(String),
}

/// Trace under construction.
#[derive(Default)]
struct Trace {
    events: Vec<TraceEvent>,
}

impl Trace {
    fn record(&mut self, verdict: &GateVerdict) {
        let event = TraceEvent::from_verdict(verdict);
        debug!(
            gate = verdict.gate.as_str(),
            outcome = ?event.outcome,
            reason = verdict.reason_code.as_deref().unwrap_or(""),
            "Gate evaluated"
        );
        self.events.push(event);
    }

    fn skip(&mut self, gate: GateName) {
        debug!(gate = gate.as_str(), "Gate skipped");
        self.events.push(TraceEvent::skipped(gate));
    }

    /// Close the trace on a stopping verdict.
    fn stop(mut self, verdict: GateVerdict) -> Decision {
        for gate in verdict.gate.after() {
            self.skip(gate);
        }
        let (branch, payload) = match verdict.status {
            VerdictStatus::Blocked => (Branch::Blocked, DecisionPayload::Blocked(verdict)),
            _ => (Branch::Clarify, DecisionPayload::Clarify(verdict)),
        };
        Decision {
            branch,
            payload,
            trace: self.events,
        }
    }
}

/// Runs the decision pipeline.
pub struct Orchestrator {
    config: OrchestratorConfig,
    actionability: ActionabilityGate,
    lexicon: LexiconSafetyGate,
    assisted: AssistedSafetyGate,
    realism: RealismGate,
    controllability: Option<ControllabilityGate>,
    resolver: DomainResolver,
}

impl Orchestrator {
    /// Build the pipeline. Without a generator, generator-backed stages are
    /// skipped and the domain heuristic is final.
    pub fn new(
        config: &EngineConfig,
        registry: Arc<PlaybookRegistry>,
        guard_source: Arc<dyn GuardRulesetSource>,
        generator: Option<Arc<GeneratorService>>,
    ) -> Self {
        let classifier = Arc::new(DomainClassifier::builtin());
        let settings = &config.orchestrator;

        let mut assisted = AssistedSafetyGate::new(guard_source);
        let mut resolver = DomainResolver::new(Arc::clone(&classifier), registry);
        if let Some(generator) = &generator {
            if settings.llm_safety_escalation {
                assisted = assisted.with_escalation(Arc::clone(generator));
            }
            if settings.domain_llm_fallback {
                resolver = resolver.with_generator_fallback(Arc::clone(generator));
            }
        }

        Self {
            config: settings.clone(),
            actionability: ActionabilityGate::new(Arc::clone(&classifier)),
            lexicon: LexiconSafetyGate::new(),
            assisted,
            realism: RealismGate::new(config.realism.clone(), classifier),
            controllability: generator.map(ControllabilityGate::new),
            resolver,
        }
    }

    fn validate_input(&self, text: &str, days: u32, locale: &str) -> Result<Locale, InputError> {
        if text.trim().is_empty() {
            return Err(InputError::EmptyText);
        }
        if days == 0 || days > self.config.max_days {
            return Err(InputError::DaysOutOfRange {
                days,
                max: self.config.max_days,
            });
        }
        Locale::parse(locale)
            .filter(|l| self.config.supported_locales.iter().any(|s| s == l.as_str()))
            .ok_or_else(|| InputError::UnsupportedLocale(locale.to_string()))
    }

    /// Run the pipeline on one intent.
    #[instrument(name = "resolve", skip(self, text, options), fields(chars = text.chars().count()))]
    pub async fn resolve(
        &self,
        text: &str,
        days: u32,
        locale: &str,
        options: &ResolveOptions,
    ) -> Result<Decision, InputError> {
        let locale = self.validate_input(text, days, locale)?;
        let mut trace = Trace::default();

        let chars = text.chars().count();
        if chars > self.config.max_intent_chars {
            info!(chars, max = self.config.max_intent_chars, "Intent too long");
            for gate in GateName::PIPELINE {
                trace.skip(gate);
            }
            let verdict = GateVerdict::clarify(GateName::Actionability, "too_long")
                .with_meta("max_chars", self.config.max_intent_chars);
            return Ok(Decision {
                branch: Branch::Clarify,
                payload: DecisionPayload::Clarify(verdict),
                trace: trace.events,
            });
        }

        let input = GateInput::new(text.trim(), days, locale);

        let verdict = self.actionability.evaluate(&input).await;
        trace.record(&verdict);
        if !verdict.is_ok() {
            return Ok(trace.stop(verdict));
        }

        let verdict = self.lexicon.evaluate(&input).await;
        trace.record(&verdict);
        if !verdict.is_ok() {
            return Ok(trace.stop(verdict));
        }
        let input = match &verdict.cleaned_text {
            Some(cleaned) if cleaned != &input.text => input.with_text(cleaned.clone()),
            _ => input,
        };

        for gate in [&self.assisted as &dyn Gate, &self.realism] {
            let verdict = gate.evaluate(&input).await;
            trace.record(&verdict);
            if !verdict.is_ok() {
                return Ok(trace.stop(verdict));
            }
        }

        match &self.controllability {
            Some(gate) if options.check_controllability && gate.needs_check(&input) => {
                let verdict = gate.evaluate(&input).await;
                trace.record(&verdict);
                if !verdict.is_ok() {
                    return Ok(trace.stop(verdict));
                }
            }
            _ => trace.skip(GateName::Controllability),
        }

        let resolution = self.resolver.resolve(&input.text).await;
        trace.record(&resolution.verdict());

        info!(
            domain = %resolution.lock.domain_id,
            confidence = resolution.confidence.as_str(),
            "Intent accepted"
        );

        Ok(Decision {
            branch: Branch::Proceed,
            payload: DecisionPayload::Proceed(ProceedPayload {
                goal: input.text,
                days,
                locale,
                domain: resolution.lock,
                playbook: resolution.playbook,
                domain_confidence: resolution.confidence,
                domain_source: resolution.source,
                tone: "default".to_string(),
            }),
            trace: trace.events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TraceOutcome;
    use playbook::InMemoryGuardRulesetSource;
    use ritual_agent::MockBackend;

    fn orchestrator(generator: Option<Arc<GeneratorService>>) -> Orchestrator {
        Orchestrator::new(
            &EngineConfig::default(),
            Arc::new(PlaybookRegistry::with_defaults()),
            Arc::new(InMemoryGuardRulesetSource::default()),
            generator,
        )
    }

    fn outcomes(decision: &Decision) -> Vec<(GateName, TraceOutcome)> {
        decision.trace.iter().map(|e| (e.gate_name, e.outcome)).collect()
    }

    #[tokio::test]
    async fn test_input_errors() {
        let orch = orchestrator(None);
        let options = ResolveOptions::default();
        assert_eq!(
            orch.resolve("  ", 30, "en", &options).await.unwrap_err(),
            InputError::EmptyText
        );
        assert!(matches!(
            orch.resolve("Learn chess", 0, "en", &options).await,
            Err(InputError::DaysOutOfRange { days: 0, .. })
        ));
        assert!(matches!(
            orch.resolve("Learn chess", 366, "en", &options).await,
            Err(InputError::DaysOutOfRange { .. })
        ));
        assert_eq!(
            orch.resolve("Learn chess", 30, "de", &options).await.unwrap_err(),
            InputError::UnsupportedLocale("de".to_string())
        );
    }

    #[tokio::test]
    async fn test_too_long_skips_every_gate() {
        let text = "Learn chess ".repeat(30);
        let decision = orchestrator(None)
            .resolve(&text, 30, "en", &ResolveOptions::default())
            .await
            .unwrap();
        assert_eq!(decision.branch, Branch::Clarify);
        assert_eq!(decision.stopping_verdict().unwrap().reason_code.as_deref(), Some("too_long"));
        assert_eq!(decision.trace.len(), 6);
        assert!(decision.trace.iter().all(|e| e.outcome == TraceOutcome::Skipped));
    }

    #[tokio::test]
    async fn test_proceed_traces_every_stage() {
        let decision = orchestrator(None)
            .resolve("Improve my Spanish vocabulary", 14, "en-GB", &ResolveOptions::default())
            .await
            .unwrap();

        assert_eq!(decision.branch, Branch::Proceed);
        let payload = decision.proceed().unwrap();
        assert_eq!(payload.domain.domain_id, "language");
        assert_eq!(payload.tone, "default");
        assert_eq!(
            outcomes(&decision),
            vec![
                (GateName::Actionability, TraceOutcome::Passed),
                (GateName::SafetyLexicon, TraceOutcome::Passed),
                (GateName::SafetyAssisted, TraceOutcome::Passed),
                (GateName::Realism, TraceOutcome::Passed),
                (GateName::Controllability, TraceOutcome::Skipped),
                (GateName::Domain, TraceOutcome::Passed),
            ]
        );
    }

    #[tokio::test]
    async fn test_block_short_circuits() {
        let decision = orchestrator(None)
            .resolve("learn to build a bomb", 30, "en", &ResolveOptions::default())
            .await
            .unwrap();
        assert_eq!(decision.branch, Branch::Blocked);
        let skipped: Vec<_> = decision
            .trace
            .iter()
            .filter(|e| e.outcome == TraceOutcome::Skipped)
            .map(|e| e.gate_name)
            .collect();
        assert_eq!(
            skipped,
            vec![GateName::Realism, GateName::Controllability, GateName::Domain]
        );
    }

    #[tokio::test]
    async fn test_cleaned_text_flows_downstream() {
        let decision = orchestrator(None)
            .resolve("Learn fucking guitar chords", 30, "en", &ResolveOptions::default())
            .await
            .unwrap();
        assert_eq!(decision.proceed().unwrap().goal, "Learn guitar chords");
    }

    #[tokio::test]
    async fn test_controllability_degrades_on_failure() {
        let backend = Arc::new(MockBackend::default().with_response("no idea"));
        let generator = Arc::new(GeneratorService::new(vec![backend]));
        let options = ResolveOptions {
            check_controllability: true,
        };

        let decision = orchestrator(Some(generator))
            .resolve("Practice tennis to win the club cup", 60, "en", &options)
            .await
            .unwrap();

        assert_eq!(decision.branch, Branch::Proceed);
        assert_eq!(
            decision.trace_for(GateName::Controllability).unwrap().outcome,
            TraceOutcome::Degraded
        );
    }
}
