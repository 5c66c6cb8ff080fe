//! Invariant checks applied to every playbook before it enters a snapshot.
//!
//! Built-in playbooks pass these checks by construction; overrides are
//! rejected as a whole when any playbook in the set fails.

use std::collections::HashSet;

use crate::domains::builtin_providers;
use crate::types::{DomainPlaybook, MAX_RESOURCES_PER_MISSION};

/// Check one playbook, returning every issue found.
pub fn validate_playbook(playbook: &DomainPlaybook) -> Vec<String> {
    let mut issues = Vec::new();

    if playbook.id.trim().is_empty() {
        issues.push("id is empty".to_string());
    } else if !builtin_providers().iter().any(|p| p.id() == playbook.id) {
        issues.push(format!("unknown domain id '{}'", playbook.id));
    }

    if !is_semver(&playbook.version) {
        issues.push(format!("version '{}' is not MAJOR.MINOR.PATCH", playbook.version));
    }

    if playbook.profile_label.trim().is_empty() {
        issues.push("profile_label is empty".to_string());
    }

    if playbook.allowed_effort_types.is_empty() {
        issues.push("allowed_effort_types is empty".to_string());
    }
    let mut seen = HashSet::new();
    for effort in &playbook.allowed_effort_types {
        if !seen.insert(*effort) {
            issues.push(format!("effort type '{}' listed twice", effort.as_str()));
        }
    }

    let mut total = 0.0f32;
    for (effort, weight) in &playbook.weights {
        if !playbook.allows(*effort) {
            issues.push(format!("weight given for disallowed effort '{}'", effort.as_str()));
        }
        if !weight.is_finite() || *weight < 0.0 {
            issues.push(format!("weight for '{}' must be a non-negative number", effort.as_str()));
        } else {
            total += weight;
        }
    }
    if total <= 0.0 {
        issues.push("weights must sum to a positive value".to_string());
    }

    if playbook.resource_policy.max_resources > MAX_RESOURCES_PER_MISSION {
        issues.push(format!(
            "max_resources {} exceeds {}",
            playbook.resource_policy.max_resources, MAX_RESOURCES_PER_MISSION
        ));
    }

    let mut rule_ids = HashSet::new();
    for rule in &playbook.tone_rules {
        if rule.statement.trim().is_empty() {
            issues.push(format!("tone rule '{}' has an empty statement", rule.id));
        }
        if !rule_ids.insert(rule.id.as_str()) {
            issues.push(format!("rule id '{}' used twice", rule.id));
        }
    }
    if playbook.remediation_rules.is_empty() {
        issues.push("at least one remediation rule is required".to_string());
    }
    for rule in &playbook.remediation_rules {
        if rule.statement.trim().is_empty() {
            issues.push(format!("remediation rule '{}' has an empty statement", rule.id));
        }
        if !rule_ids.insert(rule.id.as_str()) {
            issues.push(format!("rule id '{}' used twice", rule.id));
        }
    }

    issues
}

fn is_semver(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}
