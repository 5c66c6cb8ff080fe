//! Language learning domain.
//!
//! Vocabulary, grammar, pronunciation and conversation practice. Fluency
//! claims in this domain are checked against the realism thresholds.

use crate::domains::DomainProvider;
use crate::types::{remediation, rules, weights, DomainPlaybook, EffortType, ResourcePolicy};

/// Provider for the language domain.
pub struct LanguageDomain;

impl DomainProvider for LanguageDomain {
    fn id(&self) -> &'static str {
        "language"
    }

    fn default_playbook(&self) -> DomainPlaybook {
        DomainPlaybook {
            id: "language".to_string(),
            version: "1.2.0".to_string(),
            profile_label: "Language learning".to_string(),
            allowed_effort_types: vec![
                EffortType::Read,
                EffortType::Listen,
                EffortType::Practice,
                EffortType::Create,
                EffortType::Reflect,
                EffortType::Watch,
            ],
            weights: weights(&[
                (EffortType::Practice, 0.35),
                (EffortType::Listen, 0.25),
                (EffortType::Read, 0.15),
                (EffortType::Create, 0.1),
                (EffortType::Watch, 0.1),
                (EffortType::Reflect, 0.05),
            ]),
            tone_rules: rules(
                "language",
                &[
                    "Encourage speaking out loud, even imperfectly.",
                    "Give every new word inside a short example sentence.",
                    "Never promise fluency within the ritual duration.",
                ],
            ),
            remediation_rules: remediation(
                "language",
                &[
                    "Halve the number of new words and reuse words already seen.",
                    "Replace free production with guided fill-in-the-blank practice.",
                ],
            ),
            resource_policy: ResourcePolicy {
                max_resources: 3,
                allow_external_links: true,
            },
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        &[
            "spanish", "espagnol", "english", "anglais", "french", "francais", "german",
            "allemand", "italian", "italien", "japanese", "japonais", "chinese", "chinois",
            "mandarin", "portuguese", "portugais", "korean", "coreen", "arabic", "arabe",
            "russian", "russe", "dutch", "neerlandais", "vocabulary", "vocabulaire", "grammar",
            "grammaire", "language", "langue", "conjugation", "conjugaison", "pronunciation",
            "prononciation", "toefl", "toeic", "ielts", "delf",
        ]
    }

    fn prompt_fragment(&self) -> String {
        r#"## LANGUAGE DOMAIN

Steps alternate input (listening, reading) and output (speaking, writing).
Every mission must be doable without a conversation partner.
Fluency is never the promised outcome; comprehension and confidence are."#
            .to_string()
    }
}
