//! Safety gate.
//!
//! Two layers. The lexicon layer is pure pattern matching and also cleans
//! insults out of an otherwise valid goal. The assisted layer checks the
//! cleaned text against the admin-editable guard ruleset and, when enabled,
//! asks the generator about sensitive but inconclusive intents.

use std::sync::Arc;

use playbook::{GuardRulesetSource, LexiconGuard, PromptAssembler};
use ritual_agent::{GenerationTask, GeneratorService};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::gates::{patterns, Gate, GateInput};
use crate::types::{Choice, GateName, GateVerdict, Locale};

/// Lexicon layer of the safety gate.
#[derive(Debug, Default)]
pub struct LexiconSafetyGate;

impl LexiconSafetyGate {
    pub fn new() -> Self {
        Self
    }
}

fn vague_choices(locale: Locale) -> Vec<Choice> {
    let choices: [(&str, &str, &str); 4] = match locale {
        Locale::En => [
            ("skill", "Learn a new skill", "Learn the basics of a new skill"),
            ("health", "Take care of myself", "Build a 10-minute daily wellbeing routine"),
            ("create", "Create something", "Start drawing for 10 minutes a day"),
            ("language", "Speak another language", "Learn the basics of a new language"),
        ],
        Locale::Fr => [
            ("skill", "Apprendre une compétence", "Apprendre les bases d'une nouvelle compétence"),
            ("health", "Prendre soin de moi", "Créer une routine bien-être de 10 minutes par jour"),
            ("create", "Créer quelque chose", "Commencer à dessiner 10 minutes par jour"),
            ("language", "Parler une autre langue", "Apprendre les bases d'une nouvelle langue"),
        ],
    };
    choices
        .iter()
        .map(|(id, label, intent)| Choice::new(*id, *label, *intent))
        .collect()
}

#[async_trait::async_trait]
impl Gate for LexiconSafetyGate {
    fn name(&self) -> GateName {
        GateName::SafetyLexicon
    }

    async fn evaluate(&self, input: &GateInput) -> GateVerdict {
        let normalized = input.normalized.as_str();

        if !patterns::has_letters(&input.text) || patterns::is_greeting_only(normalized) {
            return GateVerdict::clarify(GateName::SafetyLexicon, "not_a_goal").with_meta(
                "hint",
                input.locale.pick(
                    "Tell me what you would like to learn or practice.",
                    "Dis-moi ce que tu aimerais apprendre ou pratiquer.",
                ),
            );
        }

        if patterns::has_sexual_content(normalized) {
            return GateVerdict::blocked(GateName::SafetyLexicon, "sexual_non_goal");
        }

        let insults = patterns::insult_tokens(normalized);
        if !insults.is_empty() && !patterns::has_action_verb(normalized) {
            return GateVerdict::blocked(GateName::SafetyLexicon, "insult_or_abuse");
        }

        if patterns::is_vague(normalized) {
            let mut verdict = GateVerdict::clarify(GateName::SafetyLexicon, "vague");
            for choice in vague_choices(input.locale) {
                verdict = verdict.with_choice(choice);
            }
            return verdict;
        }

        let cleaned = if insults.is_empty() {
            input.text.trim().to_string()
        } else {
            debug!(count = insults.len(), "Stripping insult tokens");
            patterns::strip_insults(&input.text)
        };

        let mut verdict = GateVerdict::ok(GateName::SafetyLexicon).with_cleaned_text(cleaned);
        if !insults.is_empty() {
            verdict = verdict.with_meta("insults_stripped", insults.len());
        }
        if patterns::has_sensitive_terms(normalized) {
            verdict = verdict.with_meta("inconclusive", true);
        }
        verdict
    }
}

/// Assisted layer of the safety gate.
pub struct AssistedSafetyGate {
    source: Arc<dyn GuardRulesetSource>,
    /// Last compiled ruleset, reused while the source version is unchanged
    compiled: RwLock<Option<Arc<LexiconGuard>>>,
    escalation: Option<Arc<GeneratorService>>,
}

impl AssistedSafetyGate {
    pub fn new(source: Arc<dyn GuardRulesetSource>) -> Self {
        Self {
            source,
            compiled: RwLock::new(None),
            escalation: None,
        }
    }

    /// Escalate inconclusive intents to the generator.
    pub fn with_escalation(mut self, generator: Arc<GeneratorService>) -> Self {
        self.escalation = Some(generator);
        self
    }

    /// Current guard, recompiled when the published version changes.
    async fn guard(&self) -> Option<Arc<LexiconGuard>> {
        let ruleset = match self.source.load().await {
            Ok(ruleset) => ruleset,
            Err(e) => {
                warn!(error = %e, "Guard ruleset unavailable, no additional safety signal");
                return None;
            }
        };

        if let Some(guard) = self.compiled.read().await.as_ref() {
            if guard.version() == ruleset.version {
                return Some(Arc::clone(guard));
            }
        }

        match LexiconGuard::compile(&ruleset) {
            Ok(guard) => {
                let guard = Arc::new(guard);
                *self.compiled.write().await = Some(Arc::clone(&guard));
                debug!(version = %ruleset.version, "Guard ruleset compiled");
                Some(guard)
            }
            Err(e) => {
                warn!(error = %e, version = %ruleset.version, "Guard ruleset rejected");
                None
            }
        }
    }

    async fn escalate(&self, generator: &GeneratorService, input: &GateInput) -> GateVerdict {
        let task = GenerationTask::SafetyClassification;
        let request =
            GeneratorService::request_for(task, PromptAssembler::safety_prompt(), input.text.clone());

        match generator.generate_json(task, request).await {
            Ok((value, _)) => match value.get("allowed").and_then(|v| v.as_bool()) {
                Some(true) => GateVerdict::ok(GateName::SafetyAssisted).with_meta("escalated", true),
                Some(false) => {
                    let reason = value
                        .get("reason_code")
                        .and_then(|v| v.as_str())
                        .filter(|s| !s.trim().is_empty())
                        .unwrap_or("unsafe_goal");
                    GateVerdict::blocked(GateName::SafetyAssisted, reason).with_meta("escalated", true)
                }
                None => GateVerdict::degraded(GateName::SafetyAssisted, "missing 'allowed' field"),
            },
            Err(e) => {
                warn!(error = %e, "Safety escalation failed");
                GateVerdict::degraded(GateName::SafetyAssisted, e.to_string())
            }
        }
    }
}

#[async_trait::async_trait]
impl Gate for AssistedSafetyGate {
    fn name(&self) -> GateName {
        GateName::SafetyAssisted
    }

    async fn evaluate(&self, input: &GateInput) -> GateVerdict {
        let guard = self.guard().await;

        if let Some(guard) = &guard {
            if let Some(hit) = guard.check(&input.text, input.locale.as_str()) {
                return GateVerdict::blocked(GateName::SafetyAssisted, hit.reason_code)
                    .with_meta("rule_id", hit.rule_id)
                    .with_meta("ruleset_version", hit.ruleset_version);
            }
        }

        if let Some(generator) = &self.escalation {
            if patterns::has_sensitive_terms(&input.normalized) {
                return self.escalate(generator, input).await;
            }
        }

        match guard {
            Some(guard) => {
                GateVerdict::ok(GateName::SafetyAssisted).with_meta("ruleset_version", guard.version())
            }
            None => GateVerdict::ok(GateName::SafetyAssisted).with_meta("ruleset", "unavailable"),
        }
    }
}
