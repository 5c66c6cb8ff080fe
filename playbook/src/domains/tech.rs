//! Programming and digital tools domain.

use crate::domains::DomainProvider;
use crate::types::{remediation, rules, weights, DomainPlaybook, EffortType, ResourcePolicy};

pub struct TechDomain;

impl DomainProvider for TechDomain {
    fn id(&self) -> &'static str {
        "tech"
    }

    fn default_playbook(&self) -> DomainPlaybook {
        DomainPlaybook {
            id: "tech".to_string(),
            version: "1.0.0".to_string(),
            profile_label: "Technical skills".to_string(),
            allowed_effort_types: vec![
                EffortType::Read,
                EffortType::Watch,
                EffortType::Practice,
                EffortType::Create,
                EffortType::Reflect,
            ],
            weights: weights(&[
                (EffortType::Practice, 0.4),
                (EffortType::Create, 0.25),
                (EffortType::Read, 0.2),
                (EffortType::Watch, 0.1),
                (EffortType::Reflect, 0.05),
            ]),
            tone_rules: rules(
                "tech",
                &[
                    "Each mission ends with something that runs or can be checked.",
                    "Prefer tiny working examples over theory.",
                ],
            ),
            remediation_rules: remediation(
                "tech",
                &["Provide a partially written example to complete instead of a blank page."],
            ),
            resource_policy: ResourcePolicy {
                max_resources: 3,
                allow_external_links: true,
            },
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        &[
            "code", "coding", "programming", "programmer", "programmation", "python",
            "javascript", "typescript", "rust", "java", "sql", "excel", "html", "css",
            "developer", "developpeur", "algorithm", "algorithme", "linux", "git", "database",
            "spreadsheet", "tableur", "website", "react",
        ]
    }

    fn prompt_fragment(&self) -> String {
        r#"## TECH DOMAIN

Hands-on first. Every mission produces a runnable or checkable artifact."#
            .to_string()
    }
}
