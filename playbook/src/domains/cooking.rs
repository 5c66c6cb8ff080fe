//! Cooking and baking domain.

use crate::domains::DomainProvider;
use crate::types::{remediation, rules, weights, DomainPlaybook, EffortType, ResourcePolicy};

/// Provider for the cooking domain.
pub struct CookingDomain;

impl DomainProvider for CookingDomain {
    fn id(&self) -> &'static str {
        "cooking"
    }

    fn default_playbook(&self) -> DomainPlaybook {
        DomainPlaybook {
            id: "cooking".to_string(),
            version: "1.0.0".to_string(),
            profile_label: "Home cooking".to_string(),
            allowed_effort_types: vec![
                EffortType::Read,
                EffortType::Watch,
                EffortType::Practice,
                EffortType::Create,
                EffortType::Observe,
            ],
            weights: weights(&[
                (EffortType::Practice, 0.4),
                (EffortType::Create, 0.2),
                (EffortType::Observe, 0.15),
                (EffortType::Watch, 0.15),
                (EffortType::Read, 0.1),
            ]),
            tone_rules: rules(
                "cooking",
                &[
                    "Mention food safety when heat or raw ingredients are involved.",
                    "Use ingredients found in an ordinary supermarket.",
                ],
            ),
            remediation_rules: remediation(
                "cooking",
                &["Fall back to a single technique on one ingredient."],
            ),
            resource_policy: ResourcePolicy {
                max_resources: 2,
                allow_external_links: true,
            },
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        &[
            "cook", "cooking", "cuisine", "cuisiner", "recipe", "recette", "bake", "baking",
            "patisserie", "bread", "vegetarian", "vegetarien", "meal", "repas", "knife",
            "couteau", "sauce", "pastry",
        ]
    }

    fn prompt_fragment(&self) -> String {
        "## COOKING DOMAIN\n\nOne technique per mission, ten minutes of hands-on time at most."
            .to_string()
    }
}
