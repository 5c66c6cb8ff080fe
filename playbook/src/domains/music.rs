//! Instrument and voice practice domain.

use crate::domains::DomainProvider;
use crate::types::{remediation, rules, weights, DomainPlaybook, EffortType, ResourcePolicy};

/// Provider for the music domain.
pub struct MusicDomain;

impl DomainProvider for MusicDomain {
    fn id(&self) -> &'static str {
        "music"
    }

    fn default_playbook(&self) -> DomainPlaybook {
        DomainPlaybook {
            id: "music".to_string(),
            version: "1.1.0".to_string(),
            profile_label: "Instrument practice".to_string(),
            allowed_effort_types: vec![
                EffortType::Listen,
                EffortType::Practice,
                EffortType::Watch,
                EffortType::Observe,
                EffortType::Reflect,
            ],
            weights: weights(&[
                (EffortType::Practice, 0.5),
                (EffortType::Listen, 0.2),
                (EffortType::Watch, 0.15),
                (EffortType::Observe, 0.1),
                (EffortType::Reflect, 0.05),
            ]),
            tone_rules: rules(
                "music",
                &[
                    "Favor slow tempo and accuracy over speed.",
                    "Mention posture and relaxation before any technical drill.",
                ],
            ),
            remediation_rules: remediation(
                "music",
                &[
                    "Reduce the passage to two bars and lower the tempo.",
                    "Swap the drill for listening and air-practice of the same passage.",
                ],
            ),
            resource_policy: ResourcePolicy {
                max_resources: 2,
                allow_external_links: true,
            },
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        &[
            "guitar", "guitare", "piano", "violin", "violon", "drum", "batterie", "ukulele",
            "bass", "basse", "saxophone", "saxo", "flute", "trumpet", "trompette", "sing",
            "singing", "chanter", "chant", "music", "musique", "solfege", "chord", "accord",
            "cello", "violoncelle", "harmonica", "scales", "gammes",
        ]
    }

    fn prompt_fragment(&self) -> String {
        r#"## MUSIC DOMAIN

Short, focused practice blocks with a metronome mindset.
One technical point per mission. No performance promises."#
            .to_string()
    }
}
