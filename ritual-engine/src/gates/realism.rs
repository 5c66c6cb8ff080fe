//! Realism gate.
//!
//! Flags implausible levels, scopes and timeframes and proposes three
//! template reformulations. The intent itself is never rewritten.

use std::sync::Arc;

use playbook::DomainClassifier;
use tracing::debug;

use crate::config::RealismConfig;
use crate::gates::patterns::{self, ClaimKind, ScopeMarker, ScopeUnit};
use crate::gates::{Gate, GateInput};
use crate::types::{Choice, GateName, GateVerdict, Locale};

/// Why an intent was judged unrealistic.
#[derive(Debug, Clone, PartialEq)]
enum Trigger {
    Claim(ClaimKind),
    Scope(ScopeMarker),
    OverScoped(usize),
}

impl Trigger {
    fn code(&self) -> &'static str {
        match self {
            Self::Claim(kind) => kind.as_str(),
            Self::Scope(_) => "numeric_scope",
            Self::OverScoped(_) => "over_scoped",
        }
    }
}

/// Gate flagging implausible goals.
pub struct RealismGate {
    config: RealismConfig,
    classifier: Arc<DomainClassifier>,
}

impl RealismGate {
    pub fn new(config: RealismConfig, classifier: Arc<DomainClassifier>) -> Self {
        Self { config, classifier }
    }

    fn scope_exceeded(&self, marker: &ScopeMarker, days: u32) -> bool {
        let days = days as f32;
        let allowed = match marker.unit {
            ScopeUnit::Kilograms => self.config.kg_per_week * days / 7.0,
            ScopeUnit::Books => (days / self.config.days_per_book.max(1) as f32).max(1.0),
            ScopeUnit::Marathons => (days / self.config.days_per_marathon.max(1) as f32).max(1.0),
            ScopeUnit::Languages => (days / self.config.days_per_language.max(1) as f32).max(1.0),
        };
        marker.amount > allowed
    }

    fn find_trigger(&self, judged: &str, domain_id: &str, effective_days: u32) -> Option<Trigger> {
        match patterns::level_claim(judged) {
            Some(ClaimKind::Fame) => return Some(Trigger::Claim(ClaimKind::Fame)),
            Some(ClaimKind::Level) => {
                if let Some(threshold) = self.config.level_threshold(domain_id) {
                    if effective_days <= threshold {
                        return Some(Trigger::Claim(ClaimKind::Level));
                    }
                }
            }
            None => {}
        }

        if let Some(marker) = patterns::numeric_scope(judged)
            .into_iter()
            .find(|m| self.scope_exceeded(m, effective_days))
        {
            return Some(Trigger::Scope(marker));
        }

        let connectives = patterns::connective_count(judged);
        if connectives > self.config.max_connectives && patterns::has_action_verb(judged) {
            return Some(Trigger::OverScoped(connectives));
        }

        None
    }
}

/// The three deterministic reformulations of `goal`.
pub fn reformulation_choices(goal: &str, locale: Locale) -> Vec<Choice> {
    let goal = goal.trim().trim_end_matches(['.', '!', '?', ',']).trim();
    let templates: [(&str, &str, &str, u32); 3] = match locale {
        Locale::En => [
            ("recommended", "Steady progress (30 days)", "make steady progress in 30 days", 30),
            ("mini", "A first small win (7 days)", "reach a first milestone in 7 days", 7),
            ("ambitious", "Ambitious (90 days)", "reach a solid level in 90 days", 90),
        ],
        Locale::Fr => [
            ("recommended", "Progresser régulièrement (30 jours)", "progresser régulièrement en 30 jours", 30),
            ("mini", "Une première victoire (7 jours)", "franchir une première étape en 7 jours", 7),
            ("ambitious", "Ambitieux (90 jours)", "atteindre un bon niveau en 90 jours", 90),
        ],
    };
    templates
        .iter()
        .map(|(id, label, template, days)| {
            Choice::new(*id, *label, format!("{} → {}", goal, template)).with_days(*days)
        })
        .collect()
}

#[async_trait::async_trait]
impl Gate for RealismGate {
    fn name(&self) -> GateName {
        GateName::Realism
    }

    async fn evaluate(&self, input: &GateInput) -> GateVerdict {
        let (goal, judged) = patterns::split_arrow(&input.text)
            .unwrap_or((input.text.as_str(), input.text.as_str()));
        let judged = patterns::normalize(judged);

        let domain = self.classifier.classify(&input.text).domain_id;
        let effective_days = patterns::timeframe_days(&judged)
            .map_or(input.days, |stated| stated.min(input.days));

        let Some(trigger) = self.find_trigger(&judged, &domain, effective_days) else {
            return GateVerdict::ok(GateName::Realism).with_meta("effective_days", effective_days);
        };

        debug!(trigger = trigger.code(), domain = %domain, effective_days, "Realism violation");

        let mut verdict = GateVerdict::clarify(GateName::Realism, "needs_reformulation")
            .with_meta("trigger", trigger.code())
            .with_meta("domain", &domain)
            .with_meta("effective_days", effective_days);
        match &trigger {
            Trigger::Scope(marker) => {
                verdict = verdict
                    .with_meta("unit", marker.unit.as_str())
                    .with_meta("amount", marker.amount);
            }
            Trigger::OverScoped(count) => verdict = verdict.with_meta("connectives", count),
            Trigger::Claim(_) => {}
        }
        for choice in reformulation_choices(goal, input.locale) {
            verdict = verdict.with_choice(choice);
        }
        verdict
    }
}
