//! Core types for the ritual engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use playbook::{Confidence, DomainLock, DomainPlaybook};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Supported request locales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    Fr,
}

impl Locale {
    /// Parse a locale tag. Region subtags are ignored (`fr-CA` is `fr`).
    pub fn parse(tag: &str) -> Option<Self> {
        let primary = tag
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_lowercase();
        match primary.as_str() {
            "en" => Some(Self::En),
            "fr" => Some(Self::Fr),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Fr => "fr",
        }
    }

    /// Pick the string for this locale.
    pub fn pick<'a>(&self, en: &'a str, fr: &'a str) -> &'a str {
        match self {
            Self::En => en,
            Self::Fr => fr,
        }
    }
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum GateName {
    Actionability,
    SafetyLexicon,
    SafetyAssisted,
    Realism,
    Controllability,
    Domain,
}

impl GateName {
    pub const PIPELINE: [GateName; 6] = [
        GateName::Actionability,
        GateName::SafetyLexicon,
        GateName::SafetyAssisted,
        GateName::Realism,
        GateName::Controllability,
        GateName::Domain,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Actionability => "actionability",
            Self::SafetyLexicon => "safety_lexicon",
            Self::SafetyAssisted => "safety_assisted",
            Self::Realism => "realism",
            Self::Controllability => "controllability",
            Self::Domain => "domain",
        }
    }

    /// Gates that run after this one.
    pub fn after(&self) -> impl Iterator<Item = GateName> + '_ {
        Self::PIPELINE.into_iter().filter(move |g| g > self)
    }
}

/// Status of a gate verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Ok,
    NeedsClarification,
    Blocked,
}

/// A choice offered to the user alongside a clarification.
///
/// `intent` is the text to resubmit when the choice is picked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Choice {
    pub id: String,
    pub label: String,
    pub intent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
}

impl Choice {
    pub fn new(id: impl Into<String>, label: impl Into<String>, intent: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            intent: intent.into(),
            days: None,
        }
    }

    pub fn with_days(mut self, days: u32) -> Self {
        self.days = Some(days);
        self
    }
}

/// Verdict produced by one gate. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateVerdict {
    pub gate: GateName,
    pub status: VerdictStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    /// Text with insults stripped, set by the safety lexicon
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaned_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// A generator-backed sub-step failed and a neutral verdict was used
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

impl GateVerdict {
    fn with_status(gate: GateName, status: VerdictStatus, reason_code: Option<String>) -> Self {
        Self {
            gate,
            status,
            reason_code,
            cleaned_text: None,
            choices: Vec::new(),
            metadata: BTreeMap::new(),
            degraded: false,
        }
    }

    pub fn ok(gate: GateName) -> Self {
        Self::with_status(gate, VerdictStatus::Ok, None)
    }

    pub fn clarify(gate: GateName, reason_code: impl Into<String>) -> Self {
        Self::with_status(gate, VerdictStatus::NeedsClarification, Some(reason_code.into()))
    }

    pub fn blocked(gate: GateName, reason_code: impl Into<String>) -> Self {
        Self::with_status(gate, VerdictStatus::Blocked, Some(reason_code.into()))
    }

    /// Neutral verdict used when a generator-backed step could not run.
    pub fn degraded(gate: GateName, error: impl Into<String>) -> Self {
        let mut verdict = Self::ok(gate)
            .with_meta("confidence", Confidence::Medium.as_str())
            .with_meta("tone", "default")
            .with_meta("error", error.into());
        verdict.degraded = true;
        verdict
    }

    pub fn with_choice(mut self, choice: Choice) -> Self {
        self.choices.push(choice);
        self
    }

    pub fn with_cleaned_text(mut self, text: impl Into<String>) -> Self {
        self.cleaned_text = Some(text.into());
        self
    }

    pub fn with_meta(mut self, key: &str, value: impl Serialize) -> Self {
        self.metadata.insert(
            key.to_string(),
            serde_json::to_value(value).unwrap_or_default(),
        );
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == VerdictStatus::Ok
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

/// Outcome recorded in the trace for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum TraceOutcome {
    Passed,
    Clarify,
    Blocked,
    Skipped,
    Degraded,
}

/// One entry of the decision trace. Observability only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub gate_name: GateName,
    pub outcome: TraceOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl TraceEvent {
    pub fn skipped(gate_name: GateName) -> Self {
        Self {
            gate_name,
            outcome: TraceOutcome::Skipped,
            reason_code: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn from_verdict(verdict: &GateVerdict) -> Self {
        let outcome = match verdict.status {
            VerdictStatus::Ok if verdict.degraded => TraceOutcome::Degraded,
            VerdictStatus::Ok => TraceOutcome::Passed,
            VerdictStatus::NeedsClarification => TraceOutcome::Clarify,
            VerdictStatus::Blocked => TraceOutcome::Blocked,
        };
        Self {
            gate_name: verdict.gate,
            outcome,
            reason_code: verdict.reason_code.clone(),
            metadata: verdict.metadata.clone(),
        }
    }
}

/// Top-level branch of a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    Proceed,
    Clarify,
    Blocked,
}

/// Where the domain label came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainSource {
    Heuristic,
    Generator,
}

/// Everything plan generation needs once the gates have passed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProceedPayload {
    /// Cleaned intent text (insults stripped)
    pub goal: String,
    pub days: u32,
    pub locale: Locale,
    pub domain: DomainLock,
    /// Playbook the lock was taken from
    pub playbook: DomainPlaybook,
    pub domain_confidence: Confidence,
    pub domain_source: DomainSource,
    pub tone: String,
}

/// Decision payload by branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "branch", rename_all = "snake_case")]
pub enum DecisionPayload {
    Proceed(ProceedPayload),
    Clarify(GateVerdict),
    Blocked(GateVerdict),
}

/// Result of running the decision pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub branch: Branch,
    pub payload: DecisionPayload,
    pub trace: Vec<TraceEvent>,
}

impl Decision {
    pub fn proceed(&self) -> Option<&ProceedPayload> {
        match &self.payload {
            DecisionPayload::Proceed(p) => Some(p),
            _ => None,
        }
    }

    /// The verdict that stopped the pipeline, if any.
    pub fn stopping_verdict(&self) -> Option<&GateVerdict> {
        match &self.payload {
            DecisionPayload::Clarify(v) | DecisionPayload::Blocked(v) => Some(v),
            DecisionPayload::Proceed(_) => None,
        }
    }

    pub fn trace_for(&self, gate: GateName) -> Option<&TraceEvent> {
        self.trace.iter().find(|e| e.gate_name == gate)
    }
}

/// Per-request options for the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// Run the controllability check when its pre-filter fires
    pub check_controllability: bool,
}

/// Error types for the ritual engine.
#[derive(Debug, thiserror::Error)]
pub enum RitualError {
    /// Request rejected before any gate ran
    #[error("Invalid input: {0}")]
    Input(#[from] crate::orchestrator::InputError),

    /// Plan generation exhausted its attempts
    #[error("Plan generation failed: {0}")]
    Plan(#[from] crate::plan::PlanFailure),

    /// Progression rejected the operation
    #[error("Progression error: {0}")]
    Progression(#[from] crate::progression::ProgressionError),

    /// No ritual with this id
    #[error("Ritual not found: {0}")]
    NotFound(String),

    /// The ritual has no plan yet
    #[error("Ritual not ready: {0}")]
    NotReady(String),

    /// Playbook error
    #[error("Playbook error: {0}")]
    Playbook(#[from] playbook::PlaybookError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Progress sink rejected a write
    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// What a user is told about a failure. Internals stay in `Display`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum UserFacingError {
    /// The user can fix it by rephrasing or changing a parameter
    Clarify,
    /// Nothing the user can do
    CannotHelp,
    /// Generation failed; trying again may work
    RetryablePlanFailure,
}

impl RitualError {
    pub fn user_facing(&self) -> UserFacingError {
        use crate::progression::ProgressionError;

        match self {
            Self::Input(_) => UserFacingError::Clarify,
            Self::Plan(_) => UserFacingError::RetryablePlanFailure,
            Self::Progression(ProgressionError::StepLocked(_) | ProgressionError::NotOpenable { .. }) => {
                UserFacingError::Clarify
            }
            Self::Progression(_)
            | Self::NotFound(_)
            | Self::NotReady(_)
            | Self::Playbook(_)
            | Self::Config(_)
            | Self::Persistence(_) => UserFacingError::CannotHelp,
        }
    }
}

pub type Result<T> = std::result::Result<T, RitualError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_parse() {
        assert_eq!(Locale::parse("fr-CA"), Some(Locale::Fr));
        assert_eq!(Locale::parse(" EN "), Some(Locale::En));
        assert_eq!(Locale::parse("de"), None);
        assert_eq!(Locale::parse(""), None);
    }

    #[test]
    fn test_gates_after() {
        let after: Vec<_> = GateName::Realism.after().collect();
        assert_eq!(after, vec![GateName::Controllability, GateName::Domain]);
        assert_eq!(GateName::Domain.after().count(), 0);
    }

    #[test]
    fn test_degraded_verdict_traces_as_degraded() {
        let verdict = GateVerdict::degraded(GateName::Controllability, "timeout");
        assert!(verdict.is_ok());
        assert_eq!(verdict.meta_str("confidence"), Some("medium"));
        assert_eq!(verdict.meta_str("tone"), Some("default"));
        assert_eq!(TraceEvent::from_verdict(&verdict).outcome, TraceOutcome::Degraded);
    }

    #[test]
    fn test_user_facing_mapping() {
        let err = RitualError::Input(crate::orchestrator::InputError::EmptyText);
        assert_eq!(err.user_facing(), UserFacingError::Clarify);
        assert_eq!(
            RitualError::NotFound("r1".into()).user_facing(),
            UserFacingError::CannotHelp
        );
    }
}
