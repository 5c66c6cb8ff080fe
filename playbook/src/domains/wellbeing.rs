//! Wellbeing and habits domain.
//!
//! Meditation, sleep, stress routines. Copy in this domain must never take
//! a clinical tone or suggest a diagnosis.

use crate::domains::DomainProvider;
use crate::types::{remediation, rules, weights, DomainPlaybook, EffortType, ResourcePolicy};

/// Provider for the wellbeing domain.
pub struct WellbeingDomain;

impl DomainProvider for WellbeingDomain {
    fn id(&self) -> &'static str {
        "wellbeing"
    }

    fn default_playbook(&self) -> DomainPlaybook {
        DomainPlaybook {
            id: "wellbeing".to_string(),
            version: "1.1.0".to_string(),
            profile_label: "Wellbeing routine".to_string(),
            allowed_effort_types: vec![
                EffortType::Reflect,
                EffortType::Practice,
                EffortType::Observe,
                EffortType::Move,
                EffortType::Listen,
            ],
            weights: weights(&[
                (EffortType::Practice, 0.3),
                (EffortType::Reflect, 0.3),
                (EffortType::Observe, 0.2),
                (EffortType::Move, 0.1),
                (EffortType::Listen, 0.1),
            ]),
            tone_rules: rules(
                "wellbeing",
                &[
                    "Use invitational language, never injunctions.",
                    "Do not use medical or diagnostic vocabulary.",
                ],
            ),
            remediation_rules: remediation(
                "wellbeing",
                &["Offer a two-minute version of the same practice."],
            ),
            resource_policy: ResourcePolicy {
                max_resources: 1,
                allow_external_links: false,
            },
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        &[
            "meditation", "mediter", "meditate", "sleep", "sommeil", "dormir", "stress",
            "mindfulness", "breathing", "respiration", "journaling", "gratitude", "habit",
            "habitude", "anxiety", "anxiete", "calm", "calme", "relax", "routine",
        ]
    }

    fn prompt_fragment(&self) -> String {
        r#"## WELLBEING DOMAIN

Gentle, invitational copy. Missions are short rituals, not treatments."#
            .to_string()
    }
}
