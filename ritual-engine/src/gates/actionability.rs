//! Actionability gate.
//!
//! Decides whether the intent names something the learner can act on.
//! Heuristic only, the generator is never called here.

use std::sync::Arc;

use playbook::{DomainClassifier, GENERAL_DOMAIN_ID};
use tracing::debug;

use crate::gates::{patterns, Gate, GateInput};
use crate::types::{Choice, GateName, GateVerdict, Locale};

/// Intents of at least this many words without a verb are borderline.
const BORDERLINE_MIN_WORDS: usize = 4;

/// How actionable an intent is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionabilityClass {
    Actionable,
    /// A single corrective hint is enough
    NotActionableInline,
    /// Close to a goal: explain and offer reformulations
    Borderline,
}

impl ActionabilityClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Actionable => "actionable",
            Self::NotActionableInline => "not_actionable_inline",
            Self::Borderline => "borderline",
        }
    }
}

/// Gate checking for an action verb or a usable skill keyword.
pub struct ActionabilityGate {
    classifier: Arc<DomainClassifier>,
}

impl ActionabilityGate {
    pub fn new(classifier: Arc<DomainClassifier>) -> Self {
        Self { classifier }
    }

    fn actionable(reason: &str) -> GateVerdict {
        GateVerdict::ok(GateName::Actionability)
            .with_meta("class", ActionabilityClass::Actionable.as_str())
            .with_meta("rule", reason)
    }

    fn borderline(keyword: Option<&str>, locale: Locale) -> GateVerdict {
        let hint = locale.pick(
            "This sounds like a topic rather than a goal. Say what you want to do with it.",
            "Cela ressemble à un thème plus qu'à un objectif. Dis ce que tu veux en faire.",
        );
        let mut verdict = GateVerdict::clarify(
            GateName::Actionability,
            ActionabilityClass::Borderline.as_str(),
        )
        .with_meta("class", ActionabilityClass::Borderline.as_str())
        .with_meta("hint", hint);

        if let Some(keyword) = keyword {
            verdict = verdict.with_meta("keyword", keyword);
            for choice in reformulations(keyword, locale) {
                verdict = verdict.with_choice(choice);
            }
        }
        verdict
    }

    fn not_actionable(locale: Locale) -> GateVerdict {
        let hint = locale.pick(
            "Start with a verb, for example: \"Learn the basics of chess\".",
            "Commence par un verbe, par exemple : « Apprendre les bases des échecs ».",
        );
        GateVerdict::clarify(
            GateName::Actionability,
            ActionabilityClass::NotActionableInline.as_str(),
        )
        .with_meta("class", ActionabilityClass::NotActionableInline.as_str())
        .with_meta("hint", hint)
    }
}

fn reformulations(keyword: &str, locale: Locale) -> Vec<Choice> {
    let templates: [(&str, &str, &str); 3] = match locale {
        Locale::En => [
            ("start", "Start from scratch", "Learn the basics of {}"),
            ("practice", "Practice regularly", "Practice {} for 10 minutes a day"),
            ("deepen", "Go further", "Improve my {} skills"),
        ],
        Locale::Fr => [
            ("start", "Partir de zéro", "Apprendre les bases de {}"),
            ("practice", "Pratiquer régulièrement", "Pratiquer {} 10 minutes par jour"),
            ("deepen", "Aller plus loin", "Améliorer mon niveau en {}"),
        ],
    };
    templates
        .iter()
        .map(|(id, label, intent)| Choice::new(*id, *label, intent.replace("{}", keyword)))
        .collect()
}

#[async_trait::async_trait]
impl Gate for ActionabilityGate {
    fn name(&self) -> GateName {
        GateName::Actionability
    }

    async fn evaluate(&self, input: &GateInput) -> GateVerdict {
        // The pre-arrow part was chosen in an earlier round.
        if patterns::split_arrow(&input.text).is_some() {
            return Self::actionable("arrow");
        }

        let normalized = input.normalized.as_str();
        if !patterns::has_letters(&input.text)
            || patterns::is_greeting_only(normalized)
            || patterns::is_vague(normalized)
        {
            debug!("Actionability deferred to safety lexicon");
            return GateVerdict::ok(GateName::Actionability).with_meta("deferred", true);
        }

        if patterns::has_action_verb(normalized) {
            return Self::actionable("action_verb");
        }

        let classification = self.classifier.classify(&input.text);
        if classification.domain_id != GENERAL_DOMAIN_ID {
            return Self::borderline(classification.matched.first().map(String::as_str), input.locale);
        }

        if patterns::word_count(normalized) >= BORDERLINE_MIN_WORDS {
            return Self::borderline(None, input.locale);
        }

        Self::not_actionable(input.locale)
    }
}
