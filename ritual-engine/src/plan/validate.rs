//! Plan validation.
//!
//! Stages, all of which run so feedback to the next attempt is complete:
//! 1. structure: level count, unique ids, steps per level, durations, effort
//!    types, resources
//! 2. marker token inside the summary
//! 3. sentence bounds of the description and feasibility note
//! 4. duplicate mission summaries and angles
//! 5. competency references
//! 6. one mission stub per step

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use playbook::text::comparable;
use playbook::{DomainPlaybook, PlanTargets};

use crate::plan::schema::PlanDocument;

static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?…]+(?:\s+|$)").unwrap());

/// Code surfaced when the step/stub correspondence is broken.
pub const INVALID_MISSION_STUBS: &str = "invalid_mission_stubs";

/// One validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub code: &'static str,
    pub message: String,
}

impl ValidationIssue {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// The single code reported for a failed attempt.
pub fn final_code(issues: &[ValidationIssue]) -> &'static str {
    if issues.iter().any(|i| i.code == INVALID_MISSION_STUBS) {
        INVALID_MISSION_STUBS
    } else {
        issues.first().map_or("invalid_plan", |i| i.code)
    }
}

/// Remove every occurrence of the marker from a summary.
pub fn strip_marker(summary: &str, marker: &str) -> String {
    if marker.is_empty() {
        return summary.trim().to_string();
    }
    summary.replace(marker, " ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Count sentences by terminal punctuation. Trailing text without
/// punctuation counts as one more sentence.
pub fn sentence_count(text: &str) -> usize {
    let text = text.trim();
    if text.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut last_end = 0;
    for m in SENTENCE_END.find_iter(text) {
        if !text[last_end..m.start()].trim().is_empty() {
            count += 1;
        }
        last_end = m.end();
    }
    if !text[last_end..].trim().is_empty() {
        count += 1;
    }
    count
}

/// Validate a decoded plan.
pub fn validate(
    doc: &PlanDocument,
    playbook: &DomainPlaybook,
    targets: &PlanTargets,
    marker: &str,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    check_structure(doc, playbook, targets, &mut issues);
    check_marker(doc, marker, &mut issues);
    check_sentences(doc, &mut issues);
    check_duplicates(doc, marker, &mut issues);
    check_competencies(doc, &mut issues);
    check_correspondence(doc, &mut issues);
    issues
}

fn check_structure(
    doc: &PlanDocument,
    playbook: &DomainPlaybook,
    targets: &PlanTargets,
    issues: &mut Vec<ValidationIssue>,
) {
    let path = &doc.path;
    let minutes = targets.min_minutes..=targets.max_minutes;

    if path.title.is_empty() {
        issues.push(ValidationIssue::new("missing_title", "path title is empty"));
    }

    if path.levels.len() != targets.levels {
        issues.push(ValidationIssue::new(
            "level_count",
            format!("expected {} levels, got {}", targets.levels, path.levels.len()),
        ));
    }

    let mut level_ids = HashSet::new();
    let mut step_ids = HashSet::new();
    for level in &path.levels {
        if !level_ids.insert(level.id.as_str()) {
            issues.push(ValidationIssue::new(
                "duplicate_level_id",
                format!("level id '{}' is used more than once", level.id),
            ));
        }
        for step in &level.steps {
            if !step_ids.insert(step.id.as_str()) {
                issues.push(ValidationIssue::new(
                    "duplicate_step_id",
                    format!("step id '{}' is used more than once", step.id),
                ));
            }
        }

        let steps = level.steps.len();
        if steps < targets.min_steps_per_level || steps > targets.max_steps_per_level {
            issues.push(ValidationIssue::new(
                "steps_per_level",
                format!(
                    "level {} has {} steps, expected {} to {}",
                    level.id, steps, targets.min_steps_per_level, targets.max_steps_per_level
                ),
            ));
        }
        for step in &level.steps {
            if !minutes.contains(&step.duration_minutes) {
                issues.push(ValidationIssue::new(
                    "duration_out_of_range",
                    format!("step {} lasts {} minutes", step.id, step.duration_minutes),
                ));
            }
            if !playbook.allows(step.effort_type) {
                issues.push(ValidationIssue::new(
                    "effort_not_allowed",
                    format!("step {} uses effort '{}'", step.id, step.effort_type.as_str()),
                ));
            }
        }
    }

    let max_resources = usize::from(playbook.resource_policy.max_resources);
    for stub in &doc.missions {
        if !minutes.contains(&stub.estimated_minutes) {
            issues.push(ValidationIssue::new(
                "duration_out_of_range",
                format!("mission {} is estimated at {} minutes", stub.id, stub.estimated_minutes),
            ));
        }
        if !playbook.allows(stub.effort_type) {
            issues.push(ValidationIssue::new(
                "effort_not_allowed",
                format!("mission {} uses effort '{}'", stub.id, stub.effort_type.as_str()),
            ));
        }
        if stub.resources.len() > max_resources {
            issues.push(ValidationIssue::new(
                "too_many_resources",
                format!("mission {} lists {} resources, max {}", stub.id, stub.resources.len(), max_resources),
            ));
        }
        if !playbook.resource_policy.allow_external_links && stub.resources.iter().any(|r| r.url.is_some()) {
            issues.push(ValidationIssue::new(
                "external_link_not_allowed",
                format!("mission {} links an external resource", stub.id),
            ));
        }
    }
}

fn check_marker(doc: &PlanDocument, marker: &str, issues: &mut Vec<ValidationIssue>) {
    if !doc.path.summary.contains(marker) {
        issues.push(ValidationIssue::new(
            "missing_marker",
            format!("summary must contain {}", marker),
        ));
    }
}

fn check_sentences(doc: &PlanDocument, issues: &mut Vec<ValidationIssue>) {
    let description = sentence_count(&doc.path.description);
    if !(2..=5).contains(&description) {
        issues.push(ValidationIssue::new(
            "description_sentences",
            format!("description has {} sentences, expected 2 to 5", description),
        ));
    }
    let feasibility = sentence_count(&doc.path.feasibility_note);
    if !(1..=3).contains(&feasibility) {
        issues.push(ValidationIssue::new(
            "feasibility_sentences",
            format!("feasibility note has {} sentences, expected 1 to 3", feasibility),
        ));
    }
}

fn check_duplicates(doc: &PlanDocument, marker: &str, issues: &mut Vec<ValidationIssue>) {
    let path_summary = comparable(&strip_marker(&doc.path.summary, marker));
    let mut summaries = HashSet::new();
    let mut angles = HashSet::new();

    for stub in &doc.missions {
        let summary = comparable(&stub.summary);
        if summary == path_summary {
            issues.push(ValidationIssue::new(
                "summary_repeats_path",
                format!("mission {} repeats the path summary", stub.id),
            ));
        }
        if !summaries.insert(summary) {
            issues.push(ValidationIssue::new(
                "duplicate_summary",
                format!("mission {} duplicates another summary", stub.id),
            ));
        }
        if !angles.insert(comparable(&stub.angle)) {
            issues.push(ValidationIssue::new(
                "duplicate_angle",
                format!("mission {} duplicates another angle", stub.id),
            ));
        }
    }
}

fn check_competencies(doc: &PlanDocument, issues: &mut Vec<ValidationIssue>) {
    for step in doc.path.steps() {
        if !doc.path.has_competency(&step.competency_id) {
            issues.push(ValidationIssue::new(
                "unknown_competency",
                format!("step {} references competency '{}'", step.id, step.competency_id),
            ));
        }
    }
    for stub in &doc.missions {
        if !doc.path.has_competency(&stub.competency_id) {
            issues.push(ValidationIssue::new(
                "unknown_competency",
                format!("mission {} references competency '{}'", stub.id, stub.competency_id),
            ));
        }
    }
}

fn check_correspondence(doc: &PlanDocument, issues: &mut Vec<ValidationIssue>) {
    let steps = doc.path.step_count();
    if steps != doc.missions.len() {
        issues.push(ValidationIssue::new(
            INVALID_MISSION_STUBS,
            format!("{} steps but {} mission stubs", steps, doc.missions.len()),
        ));
    }

    let mut stub_ids: HashMap<&str, usize> = HashMap::new();
    for stub in &doc.missions {
        *stub_ids.entry(stub.id.as_str()).or_default() += 1;
    }
    for (id, count) in &stub_ids {
        if *count > 1 {
            issues.push(ValidationIssue::new(
                INVALID_MISSION_STUBS,
                format!("mission id '{}' appears {} times", id, count),
            ));
        }
    }

    let mut referenced = HashSet::new();
    for step in doc.path.steps() {
        if !referenced.insert(step.mission_id.as_str()) {
            issues.push(ValidationIssue::new(
                INVALID_MISSION_STUBS,
                format!("mission '{}' is shared by several steps", step.mission_id),
            ));
        }
        if !stub_ids.contains_key(step.mission_id.as_str()) {
            issues.push(ValidationIssue::new(
                INVALID_MISSION_STUBS,
                format!("step {} has no mission stub '{}'", step.id, step.mission_id),
            ));
        }
    }
    for stub in &doc.missions {
        if !referenced.contains(stub.id.as_str()) {
            issues.push(ValidationIssue::new(
                INVALID_MISSION_STUBS,
                format!("mission {} belongs to no step", stub.id),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::schema::*;
    use playbook::{Axis, DomainProvider, EffortType};

    const MARKER: &str = "[ritual:v1]";

    fn targets() -> PlanTargets {
        PlanTargets {
            levels: 1,
            min_steps_per_level: 2,
            max_steps_per_level: 3,
            min_minutes: 5,
            max_minutes: 10,
        }
    }

    fn playbook() -> DomainPlaybook {
        playbook::domains::LanguageDomain.default_playbook()
    }

    fn step(n: u32) -> Step {
        Step {
            id: format!("s1-{n}"),
            index: n,
            title: format!("Step {n}"),
            competency_id: "c1".into(),
            axis: Axis::Do,
            effort_type: EffortType::Practice,
            duration_minutes: 7,
            required: true,
            mission_id: format!("m1-{n}"),
        }
    }

    fn stub(n: u32) -> MissionStub {
        MissionStub {
            id: format!("m1-{n}"),
            title: format!("Mission {n}"),
            summary: format!("Practice set number {n}"),
            angle: format!("Angle {n}"),
            action_verb: "practice".into(),
            effort_type: EffortType::Practice,
            competency_id: "c1".into(),
            estimated_minutes: 6,
            resources: vec![],
        }
    }

    fn doc() -> PlanDocument {
        PlanDocument {
            path: LearningPath {
                id: "p1".into(),
                title: "Spanish words".into(),
                summary: format!("{MARKER} Ten new words a day."),
                description: "You learn words. You use them.".into(),
                feasibility_note: "Short daily sessions fit two weeks.".into(),
                ritual_mode: RitualMode::Daily,
                validation_mode: ValidationMode::SelfReport,
                gating_mode: GatingMode::Strict,
                domain: playbook().lock(),
                competencies: vec![Competency {
                    id: "c1".into(),
                    title: "Vocabulary".into(),
                }],
                levels: vec![Level {
                    id: "l1".into(),
                    index: 1,
                    title: "Start".into(),
                    steps: vec![step(1), step(2)],
                }],
            },
            missions: vec![stub(1), stub(2)],
        }
    }

    #[test]
    fn test_valid_plan() {
        assert_eq!(validate(&doc(), &playbook(), &targets(), MARKER), vec![]);
    }

    #[test]
    fn test_sentence_count() {
        assert_eq!(sentence_count("One. Two! Three?"), 3);
        assert_eq!(sentence_count("No punctuation"), 1);
        assert_eq!(sentence_count("Version 1.2 is out. Enjoy"), 2);
        assert_eq!(sentence_count("   "), 0);
    }

    #[test]
    fn test_count_mismatch_wins_final_code() {
        let mut doc = doc();
        doc.path.description = "Too short".into();
        doc.missions.pop();

        let issues = validate(&doc, &playbook(), &targets(), MARKER);
        assert_eq!(issues[0].code, "description_sentences");
        assert_eq!(final_code(&issues), INVALID_MISSION_STUBS);
    }

    #[test]
    fn test_duplicates_and_marker() {
        let mut doc = doc();
        doc.path.summary = "Ten new words a day.".into();
        doc.missions[1].summary = "practice SET number 1".into();
        doc.missions[1].angle = "angle 1".into();
        doc.missions[0].summary = "Ten new words a day".into();

        let codes: Vec<&str> = validate(&doc, &playbook(), &targets(), MARKER)
            .iter()
            .map(|i| i.code)
            .collect();
        assert!(codes.contains(&"missing_marker"));
        assert!(codes.contains(&"duplicate_angle"));
        assert!(codes.contains(&"summary_repeats_path"));
        assert!(!codes.contains(&"duplicate_summary"));
    }

    #[test]
    fn test_structure_bounds() {
        let mut doc = doc();
        doc.path.levels[0].steps[0].duration_minutes = 12;
        doc.path.levels[0].steps[1].effort_type = EffortType::Move;
        doc.missions[0].competency_id = "c9".into();

        let codes: Vec<&str> = validate(&doc, &playbook(), &targets(), MARKER)
            .iter()
            .map(|i| i.code)
            .collect();
        assert!(codes.contains(&"duration_out_of_range"));
        assert!(codes.contains(&"effort_not_allowed"));
        assert!(codes.contains(&"unknown_competency"));
    }

    #[test]
    fn test_marker_accepted_anywhere() {
        let mut doc = doc();
        doc.path.summary = format!("Ten new words {MARKER} a day.");
        assert_eq!(validate(&doc, &playbook(), &targets(), MARKER), vec![]);
        assert_eq!(strip_marker(&doc.path.summary, MARKER), "Ten new words a day.");
        assert_eq!(strip_marker(&format!("{MARKER} Words."), MARKER), "Words.");
    }

    #[test]
    fn test_repeated_step_ids_rejected() {
        let mut doc = doc();
        doc.path.levels.push(Level {
            id: "l1".into(),
            index: 2,
            title: "Again".into(),
            steps: vec![
                Step {
                    mission_id: "m2-1".into(),
                    ..step(1)
                },
                Step {
                    mission_id: "m2-2".into(),
                    ..step(2)
                },
            ],
        });
        doc.missions.extend([
            MissionStub {
                id: "m2-1".into(),
                summary: "Second set one".into(),
                angle: "Other angle 1".into(),
                ..stub(1)
            },
            MissionStub {
                id: "m2-2".into(),
                summary: "Second set two".into(),
                angle: "Other angle 2".into(),
                ..stub(2)
            },
        ]);
        let targets = PlanTargets { levels: 2, ..targets() };

        let codes: Vec<&str> = validate(&doc, &playbook(), &targets, MARKER)
            .iter()
            .map(|i| i.code)
            .collect();
        assert_eq!(codes, vec!["duplicate_level_id", "duplicate_step_id", "duplicate_step_id"]);
    }

    #[test]
    fn test_shared_mission_id() {
        let mut doc = doc();
        doc.path.levels[0].steps[1].mission_id = "m1-1".into();
        let issues = validate(&doc, &playbook(), &targets(), MARKER);
        assert_eq!(final_code(&issues), INVALID_MISSION_STUBS);
    }
}
