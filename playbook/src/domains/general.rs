//! Fallback domain used when no keyword scores.

use crate::domains::{DomainProvider, GENERAL_DOMAIN_ID};
use crate::types::{remediation, rules, weights, DomainPlaybook, EffortType, ResourcePolicy};

pub struct GeneralDomain;

impl DomainProvider for GeneralDomain {
    fn id(&self) -> &'static str {
        GENERAL_DOMAIN_ID
    }

    fn default_playbook(&self) -> DomainPlaybook {
        DomainPlaybook {
            id: GENERAL_DOMAIN_ID.to_string(),
            version: "1.0.0".to_string(),
            profile_label: "General skill".to_string(),
            allowed_effort_types: EffortType::all().to_vec(),
            weights: weights(&[
                (EffortType::Practice, 0.3),
                (EffortType::Read, 0.15),
                (EffortType::Create, 0.15),
                (EffortType::Reflect, 0.15),
                (EffortType::Watch, 0.1),
                (EffortType::Observe, 0.1),
                (EffortType::Listen, 0.05),
            ]),
            tone_rules: rules("general", &["Concrete, friendly, second person."]),
            remediation_rules: remediation("general", &["Make the action smaller and more concrete."]),
            resource_policy: ResourcePolicy::default(),
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        &[]
    }

    fn prompt_fragment(&self) -> String {
        "## GENERAL DOMAIN\n\nConcrete daily actions of five to ten minutes.".to_string()
    }
}
