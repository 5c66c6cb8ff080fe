//! Sport and physical training domain.
//!
//! Missions here must stay safe for an untrained adult: no maximal efforts,
//! progressive load, explicit rest.

use crate::domains::DomainProvider;
use crate::types::{remediation, rules, weights, DomainPlaybook, EffortType, ResourcePolicy};

/// Provider for the sport domain.
pub struct SportDomain;

impl DomainProvider for SportDomain {
    fn id(&self) -> &'static str {
        "sport"
    }

    fn default_playbook(&self) -> DomainPlaybook {
        DomainPlaybook {
            id: "sport".to_string(),
            version: "1.0.3".to_string(),
            profile_label: "Physical training".to_string(),
            allowed_effort_types: vec![
                EffortType::Move,
                EffortType::Practice,
                EffortType::Watch,
                EffortType::Reflect,
            ],
            weights: weights(&[
                (EffortType::Move, 0.6),
                (EffortType::Practice, 0.2),
                (EffortType::Watch, 0.1),
                (EffortType::Reflect, 0.1),
            ]),
            tone_rules: rules(
                "sport",
                &[
                    "State a warm-up before every physical mission.",
                    "Never push to exhaustion; stop at the first sharp pain.",
                    "Use effort scales rather than absolute performance targets.",
                ],
            ),
            remediation_rules: remediation(
                "sport",
                &[
                    "Cut volume by half and add a rest interval.",
                    "Replace the movement with its easiest regression.",
                ],
            ),
            resource_policy: ResourcePolicy {
                max_resources: 1,
                allow_external_links: false,
            },
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        &[
            "run", "running", "courir", "jogging", "marathon", "swim", "swimming",
            "nager", "natation", "tennis", "football", "soccer", "basketball", "climbing",
            "escalade", "cycling", "velo", "fitness", "musculation", "pushup", "pompes",
            "squat", "stretching", "etirement", "boxing", "boxe", "sport", "workout",
            "entrainement", "abdos", "plank", "gainage", "5k", "10k",
        ]
    }

    fn prompt_fragment(&self) -> String {
        r#"## SPORT DOMAIN

Progressive load, warm-up first, rest days respected.
Missions describe effort on a 1-10 perceived exertion scale."#
            .to_string()
    }
}
