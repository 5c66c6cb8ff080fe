//! Prompt assembly from domain playbooks.
//!
//! Builds the system instructions sent to the content generator for plan
//! generation, mission filling and the small classification tasks.

use crate::domains::provider_for;
use crate::types::{DomainLock, DomainPlaybook};

/// Shape the generated plan must have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanTargets {
    pub levels: usize,
    pub min_steps_per_level: usize,
    pub max_steps_per_level: usize,
    pub min_minutes: u32,
    pub max_minutes: u32,
}

/// Assembles prompts from playbooks.
pub struct PromptAssembler;

impl PromptAssembler {
    /// System instructions for plan generation.
    ///
    /// The marker token must be echoed in the path summary, ideally first, so
    /// the validator can tell a real plan from a chatty reply.
    pub fn plan_prompt(
        playbook: &DomainPlaybook,
        lock: &DomainLock,
        targets: &PlanTargets,
        marker: &str,
    ) -> String {
        let mut prompt = String::new();

        prompt.push_str("# LEARNING PATH GENERATION\n\n");
        prompt.push_str("You design short daily learning rituals. Reply with a single JSON object and nothing else.\n\n");

        prompt.push_str(&format!(
            "Domain: {} ({}), playbook version {}\n\n",
            lock.domain_id, lock.domain_profile_label, lock.domain_version
        ));

        if let Some(provider) = provider_for(&playbook.id) {
            prompt.push_str(&provider.prompt_fragment());
            prompt.push_str("\n\n");
        }

        prompt.push_str("## STRUCTURE\n\n");
        prompt.push_str(&format!("- Exactly {} levels\n", targets.levels));
        prompt.push_str(&format!(
            "- {} to {} steps per level\n",
            targets.min_steps_per_level, targets.max_steps_per_level
        ));
        prompt.push_str(&format!(
            "- Every step lasts {} to {} minutes\n",
            targets.min_minutes, targets.max_minutes
        ));
        prompt.push_str("- Exactly one mission stub per step, linked by mission_id\n");
        prompt.push_str("- axis is one of: understand, do, perceive, consolidate\n");
        prompt.push_str(&format!(
            "- The path summary starts with the token {}\n",
            marker
        ));
        prompt.push_str("- description: 2 to 5 sentences; feasibility_note: 1 to 3 sentences\n");
        prompt.push_str("- No two missions share a summary or an angle; no mission repeats the path summary\n\n");

        prompt.push_str("## EFFORT TYPES\n\n");
        prompt.push_str("Only these effort types are allowed, most important first:\n\n");
        for (effort, weight) in playbook.ranked_efforts() {
            prompt.push_str(&format!("- {} (weight {:.2})\n", effort.as_str(), weight));
        }

        prompt.push_str("\n## TONE\n\n");
        for rule in &playbook.tone_rules {
            prompt.push_str(&format!("- {}\n", rule.statement));
        }

        prompt.push_str(&format!(
            "\n## RESOURCES\n\nAt most {} resources per mission. External links {}.\n",
            playbook.resource_policy.max_resources,
            if playbook.resource_policy.allow_external_links {
                "are allowed"
            } else {
                "are not allowed"
            }
        ));

        prompt.push_str("\n## RESPONSE SHAPE\n\n");
        prompt.push_str("```json\n");
        prompt.push_str("{\n");
        prompt.push_str("  \"path\": {\"title\", \"summary\", \"description\", \"feasibility_note\", \"ritual_mode\": \"daily|flexible\",\n");
        prompt.push_str("           \"validation_mode\": \"automatic|self_report|presence\", \"gating_mode\": \"strict|soft|none\",\n");
        prompt.push_str("           \"competencies\": [{\"id\", \"title\"}],\n");
        prompt.push_str("           \"levels\": [{\"id\", \"index\", \"title\", \"steps\": [{\"id\", \"index\", \"title\", \"competency_id\",\n");
        prompt.push_str("                      \"axis\", \"effort_type\", \"duration_minutes\", \"required\", \"mission_id\"}]}]},\n");
        prompt.push_str("  \"missions\": [{\"id\", \"title\", \"summary\", \"angle\", \"action_verb\", \"effort_type\",\n");
        prompt.push_str("                \"competency_id\", \"estimated_minutes\", \"resources\": [{\"title\", \"kind\", \"url\"}]}]\n");
        prompt.push_str("}\n");
        prompt.push_str("```\n");

        prompt
    }

    /// System instructions for filling one mission with content blocks.
    pub fn mission_prompt(
        playbook: &DomainPlaybook,
        validation_mode: &str,
        remediation_round: u8,
    ) -> String {
        let mut prompt = String::new();

        prompt.push_str("# MISSION CONTENT\n\n");
        prompt.push_str("Write the content of one short mission as JSON: {\"blocks\": [...]}.\n");
        prompt.push_str("Block kinds: {\"type\": \"text\", \"body\"}, {\"type\": \"checklist\", \"items\": [..]},\n");
        prompt.push_str("{\"type\": \"quiz\", \"question\", \"choices\": [..], \"answer_index\"}.\n");
        prompt.push_str("Between 2 and 4 blocks.\n\n");

        match validation_mode {
            "automatic" => prompt.push_str("Include one quiz block the learner can answer.\n"),
            "self_report" => prompt.push_str("Include one checklist block the learner ticks off.\n"),
            "presence" => prompt.push_str("Do not include any quiz block.\n"),
            _ => {}
        }

        prompt.push_str("\n## TONE\n\n");
        for rule in &playbook.tone_rules {
            prompt.push_str(&format!("- {}\n", rule.statement));
        }

        if remediation_round > 0 {
            prompt.push_str(&format!(
                "\n## REMEDIATION (round {})\n\n",
                remediation_round
            ));
            prompt.push_str("The learner did not complete this mission last time. Use simpler wording and a smaller scope.\n");
            for rule in &playbook.remediation_rules {
                prompt.push_str(&format!("- {}\n", rule.statement));
            }
        }

        prompt
    }

    /// System instructions for the controllability classification.
    pub fn controllability_prompt() -> String {
        r#"# CONTROLLABILITY CHECK

Decide whether the goal depends mainly on the learner's own actions or on
other people and chance (winning, being chosen, being hired, being loved).
Reply with JSON only:
{"controllable": true|false, "confidence": "low|medium|high", "reframe": "<a goal the learner fully controls>"}"#
            .to_string()
    }

    /// System instructions for labeling a goal with one known domain id.
    pub fn domain_label_prompt(known_ids: &[&str]) -> String {
        format!(
            "# DOMAIN LABEL\n\nClassify the learning goal into exactly one of: {}.\nReply with the label only.",
            known_ids.join(", ")
        )
    }

    /// System instructions for the safety escalation.
    pub fn safety_prompt() -> String {
        r#"# SAFETY CLASSIFICATION

The goal mentions a sensitive subject. Decide whether helping would be
harmful (violence, weapons manufacture, illegal drugs, intrusion into
systems the learner does not own). Legitimate learning (history, safety,
hunting licence, security certification) is allowed.
Reply with JSON only:
{"allowed": true|false, "reason_code": "<short_snake_case>"}"#
            .to_string()
    }

    /// System instructions for clarify chips.
    pub fn clarify_prompt(prompt_version: &str, lang: &str) -> String {
        format!(
            "# CLARIFY CHIPS ({})\n\nThe goal is too broad. Propose 2 or 3 sections of short chips in language '{}'.\n\
             Reply with JSON only: {{\"sections\": [{{\"key\", \"title\", \"chips\": [\"..\"]}}]}}",
            prompt_version, lang
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::DomainProvider;
    use crate::domains::LanguageDomain;

    fn targets() -> PlanTargets {
        PlanTargets {
            levels: 2,
            min_steps_per_level: 4,
            max_steps_per_level: 5,
            min_minutes: 5,
            max_minutes: 10,
        }
    }

    #[test]
    fn test_plan_prompt_carries_playbook() {
        let playbook = LanguageDomain.default_playbook();
        let prompt =
            PromptAssembler::plan_prompt(&playbook, &playbook.lock(), &targets(), "[ritual:v1]");

        assert!(prompt.contains("LANGUAGE DOMAIN"));
        assert!(prompt.contains("Exactly 2 levels"));
        assert!(prompt.contains("[ritual:v1]"));
        assert!(prompt.contains("- practice (weight 0.35)"));
        assert!(!prompt.contains("- move"));
        assert!(prompt.contains("External links are allowed"));
    }

    #[test]
    fn test_mission_prompt_modes_and_remediation() {
        let playbook = LanguageDomain.default_playbook();

        let presence = PromptAssembler::mission_prompt(&playbook, "presence", 0);
        assert!(presence.contains("Do not include any quiz"));
        assert!(!presence.contains("REMEDIATION"));

        let remediation = PromptAssembler::mission_prompt(&playbook, "automatic", 2);
        assert!(remediation.contains("REMEDIATION (round 2)"));
        assert!(remediation.contains("Halve the number of new words"));
    }

    #[test]
    fn test_domain_label_prompt_lists_ids() {
        let prompt = PromptAssembler::domain_label_prompt(&["music", "general"]);
        assert!(prompt.contains("music, general"));
    }
}
