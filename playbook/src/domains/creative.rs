//! Visual arts, writing and crafts domain.

use crate::domains::DomainProvider;
use crate::types::{remediation, rules, weights, DomainPlaybook, EffortType, ResourcePolicy};

/// Provider for the creative domain.
pub struct CreativeDomain;

impl DomainProvider for CreativeDomain {
    fn id(&self) -> &'static str {
        "creative"
    }

    fn default_playbook(&self) -> DomainPlaybook {
        DomainPlaybook {
            id: "creative".to_string(),
            version: "1.0.1".to_string(),
            profile_label: "Creative practice".to_string(),
            allowed_effort_types: vec![
                EffortType::Observe,
                EffortType::Create,
                EffortType::Practice,
                EffortType::Watch,
                EffortType::Reflect,
            ],
            weights: weights(&[
                (EffortType::Create, 0.4),
                (EffortType::Practice, 0.25),
                (EffortType::Observe, 0.2),
                (EffortType::Watch, 0.1),
                (EffortType::Reflect, 0.05),
            ]),
            tone_rules: rules(
                "creative",
                &[
                    "Value quantity of attempts over polish.",
                    "Never grade the learner's taste.",
                ],
            ),
            remediation_rules: remediation(
                "creative",
                &["Shrink the subject to a single object and allow five minutes only."],
            ),
            resource_policy: ResourcePolicy::default(),
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        &[
            "draw", "drawing", "dessin", "dessiner", "paint", "painting", "peinture", "peindre",
            "novel", "roman", "poetry", "poesie", "poem", "photo", "photography",
            "photographie", "sketch", "croquis", "calligraphy", "calligraphie", "knit",
            "tricot", "pottery", "poterie", "illustration", "watercolor", "aquarelle",
            "writing", "ecriture",
        ]
    }

    fn prompt_fragment(&self) -> String {
        r#"## CREATIVE DOMAIN

Observation then making. Finished beats perfect."#
            .to_string()
    }
}
