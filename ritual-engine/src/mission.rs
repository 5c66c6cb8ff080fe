//! Mission content.
//!
//! Fills a mission stub with content blocks on demand. Generator output is
//! parsed leniently: invalid blocks are dropped rather than failing the
//! mission. The validation mode of the path is then enforced on whatever
//! survived, so a presence-mode mission never carries a quiz.
//!
//! A mission has between two and `max_blocks` blocks. The only exception is
//! the single placeholder used when nothing usable came back.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use playbook::{DomainPlaybook, PromptAssembler};
use ritual_agent::{GenerationTask, GeneratorService};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::config::MissionConfig;
use crate::plan::{MissionStub, Step, ValidationMode};
use crate::types::Locale;

const MIN_BLOCKS: usize = 2;

/// One content block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Text {
        body: String,
    },
    Checklist {
        items: Vec<String>,
    },
    Quiz {
        question: String,
        choices: Vec<String>,
        answer_index: usize,
    },
}

impl Block {
    pub fn is_quiz(&self) -> bool {
        matches!(self, Self::Quiz { .. })
    }

    pub fn is_checklist(&self) -> bool {
        matches!(self, Self::Checklist { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text { .. })
    }

    fn is_usable(&self) -> bool {
        match self {
            Self::Text { body } => !body.trim().is_empty(),
            Self::Checklist { items } => !items.is_empty() && items.iter().all(|i| !i.trim().is_empty()),
            Self::Quiz {
                question,
                choices,
                answer_index,
            } => !question.trim().is_empty() && choices.len() >= 2 && *answer_index < choices.len(),
        }
    }
}

/// A mission with its content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct MissionFull {
    pub stub: MissionStub,
    pub blocks: Vec<Block>,
    /// 0 for first-pass content
    pub remediation_round: u8,
    /// Content came from the static placeholder
    pub placeholder: bool,
}

/// Fills missions through the content generator.
pub struct MissionAdapter {
    generator: Arc<GeneratorService>,
    config: MissionConfig,
}

impl MissionAdapter {
    pub fn new(generator: Arc<GeneratorService>, config: MissionConfig) -> Self {
        Self { generator, config }
    }

    /// Produce the content of one mission.
    ///
    /// Never fails: generator errors and unusable output fall back to a
    /// placeholder text block.
    pub async fn fill(
        &self,
        step: &Step,
        stub: &MissionStub,
        playbook: &DomainPlaybook,
        validation_mode: ValidationMode,
        remediation_round: u8,
        locale: Locale,
    ) -> MissionFull {
        let task = GenerationTask::MissionContent;
        let system = PromptAssembler::mission_prompt(playbook, validation_mode.as_str(), remediation_round);
        let payload = json!({
            "step": {"title": step.title, "axis": step.axis, "duration_minutes": step.duration_minutes},
            "mission": stub,
            "locale": locale.as_str(),
            "remediation_round": remediation_round,
        });
        let request = GeneratorService::request_for(task, system, payload.to_string());

        let mut blocks = match self.generator.generate_json(task, request).await {
            Ok((value, _)) => parse_blocks(&value),
            Err(e) => {
                warn!(mission_id = %stub.id, error = %e, "Mission content generation failed");
                Vec::new()
            }
        };
        blocks.truncate(self.config.max_blocks);

        let mut placeholder = blocks.is_empty();
        if placeholder {
            blocks.push(placeholder_block(stub, locale));
        }

        let mut blocks = self.comply(blocks, validation_mode, stub, locale);
        if blocks.is_empty() {
            placeholder = true;
            blocks.push(placeholder_block(stub, locale));
        } else if !placeholder {
            pad(&mut blocks, stub, locale);
        }
        debug!(
            mission_id = %stub.id,
            blocks = blocks.len(),
            remediation_round,
            placeholder,
            "Mission filled"
        );

        MissionFull {
            stub: stub.clone(),
            blocks,
            remediation_round,
            placeholder,
        }
    }

    /// Enforce the validation mode on a block list.
    fn comply(
        &self,
        mut blocks: Vec<Block>,
        mode: ValidationMode,
        stub: &MissionStub,
        locale: Locale,
    ) -> Vec<Block> {
        let required = match mode {
            ValidationMode::Presence => {
                blocks.retain(|b| !b.is_quiz());
                return blocks;
            }
            ValidationMode::Automatic if !blocks.iter().any(Block::is_quiz) => synthesized_quiz(stub, locale),
            ValidationMode::SelfReport if !blocks.iter().any(Block::is_checklist) => {
                synthesized_checklist(stub, locale)
            }
            _ => return blocks,
        };

        if blocks.len() >= self.config.max_blocks {
            blocks.pop();
        }
        blocks.push(required);
        blocks
    }
}

/// Bring a short block list up to the minimum without adding a quiz.
fn pad(blocks: &mut Vec<Block>, stub: &MissionStub, locale: Locale) {
    while blocks.len() < MIN_BLOCKS {
        if !blocks.iter().any(Block::is_text) {
            blocks.insert(0, placeholder_block(stub, locale));
        } else if !blocks.iter().any(Block::is_checklist) {
            blocks.push(synthesized_checklist(stub, locale));
        } else {
            blocks.push(placeholder_block(stub, locale));
        }
    }
}

/// Keep every block that decodes and is usable.
fn parse_blocks(value: &Value) -> Vec<Block> {
    let Some(items) = value.get("blocks").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| serde_json::from_value::<Block>(item.clone()).ok())
        .filter(Block::is_usable)
        .collect()
}

fn placeholder_block(stub: &MissionStub, locale: Locale) -> Block {
    let body = match locale {
        Locale::En => format!(
            "Take {} minutes to {}: {}",
            stub.estimated_minutes, stub.action_verb, stub.summary
        ),
        Locale::Fr => format!(
            "Prends {} minutes pour {} : {}",
            stub.estimated_minutes, stub.action_verb, stub.summary
        ),
    };
    Block::Text { body }
}

fn synthesized_quiz(stub: &MissionStub, locale: Locale) -> Block {
    let question = match locale {
        Locale::En => format!("What is the focus of \"{}\"?", stub.title),
        Locale::Fr => format!("Quel est l'objectif de « {} » ?", stub.title),
    };
    Block::Quiz {
        question,
        choices: vec![
            stub.summary.clone(),
            locale.pick("Nothing in particular", "Rien de particulier").to_string(),
        ],
        answer_index: 0,
    }
}

fn synthesized_checklist(stub: &MissionStub, locale: Locale) -> Block {
    Block::Checklist {
        items: vec![
            stub.title.clone(),
            match locale {
                Locale::En => format!("I spent {} minutes on it", stub.estimated_minutes),
                Locale::Fr => format!("J'y ai consacré {} minutes", stub.estimated_minutes),
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playbook::domains::LanguageDomain;
    use playbook::{Axis, DomainProvider, EffortType};
    use ritual_agent::MockBackend;

    fn step() -> Step {
        Step {
            id: "s1-1".into(),
            index: 1,
            title: "Ten words".into(),
            competency_id: "c1".into(),
            axis: Axis::Do,
            effort_type: EffortType::Practice,
            duration_minutes: 8,
            required: true,
            mission_id: "m1-1".into(),
        }
    }

    fn stub() -> MissionStub {
        MissionStub {
            id: "m1-1".into(),
            title: "Kitchen words".into(),
            summary: "Name ten objects in your kitchen".into(),
            angle: "Everyday objects".into(),
            action_verb: "practice".into(),
            effort_type: EffortType::Practice,
            competency_id: "c1".into(),
            estimated_minutes: 8,
            resources: vec![],
        }
    }

    async fn fill(reply: &str, mode: ValidationMode, round: u8) -> (Arc<MockBackend>, MissionFull) {
        let backend = Arc::new(MockBackend::default().with_response(reply));
        let service = Arc::new(GeneratorService::new(vec![backend.clone()]));
        let adapter = MissionAdapter::new(service, MissionConfig::default());
        let mission = adapter
            .fill(&step(), &stub(), &LanguageDomain.default_playbook(), mode, round, Locale::En)
            .await;
        (backend, mission)
    }

    #[tokio::test]
    async fn test_invalid_blocks_dropped() {
        let reply = json!({"blocks": [
            {"type": "text", "body": "Look around your kitchen."},
            {"type": "video", "url": "x"},
            {"type": "quiz", "question": "Q?", "choices": ["a"], "answer_index": 0},
            {"type": "checklist", "items": ["Name the fridge"]}
        ]})
        .to_string();
        let (_, mission) = fill(&reply, ValidationMode::SelfReport, 0).await;

        assert_eq!(mission.blocks.len(), 2);
        assert!(!mission.placeholder);
        assert!(mission.blocks[1].is_checklist());
    }

    #[tokio::test]
    async fn test_presence_strips_quizzes() {
        let reply = json!({"blocks": [
            {"type": "quiz", "question": "Q?", "choices": ["a", "b"], "answer_index": 1},
            {"type": "text", "body": "Just show up."}
        ]})
        .to_string();
        let (_, mission) = fill(&reply, ValidationMode::Presence, 0).await;
        assert_eq!(mission.blocks.len(), 2);
        assert_eq!(mission.blocks[0], Block::Text { body: "Just show up.".into() });
        assert!(mission.blocks[1].is_checklist());
        assert!(!mission.placeholder);
    }

    #[tokio::test]
    async fn test_single_block_padded_to_minimum() {
        let reply = json!({"blocks": [{"type": "text", "body": "Walk to the window."}]}).to_string();
        let (_, mission) = fill(&reply, ValidationMode::Presence, 0).await;
        assert_eq!(mission.blocks.len(), 2);
        assert!(!mission.blocks.iter().any(Block::is_quiz));

        let quiz_only = json!({"blocks": [
            {"type": "quiz", "question": "Q?", "choices": ["a", "b"], "answer_index": 0}
        ]})
        .to_string();
        let (_, mission) = fill(&quiz_only, ValidationMode::Automatic, 0).await;
        assert_eq!(mission.blocks.len(), 2);
        assert!(mission.blocks[0].is_text());
        assert!(mission.blocks[1].is_quiz());
    }

    #[tokio::test]
    async fn test_presence_quiz_only_becomes_placeholder() {
        let reply = json!({"blocks": [
            {"type": "quiz", "question": "Q?", "choices": ["a", "b"], "answer_index": 1}
        ]})
        .to_string();
        let (_, mission) = fill(&reply, ValidationMode::Presence, 0).await;
        assert_eq!(mission.blocks.len(), 1);
        assert!(mission.placeholder);
        assert!(mission.blocks[0].is_text());
    }

    #[tokio::test]
    async fn test_automatic_gets_quiz_within_cap() {
        let text = |n: u8| json!({"type": "text", "body": format!("Part {n}")});
        let reply = json!({"blocks": [text(1), text(2), text(3), text(4), text(5)]}).to_string();
        let (_, mission) = fill(&reply, ValidationMode::Automatic, 0).await;

        assert_eq!(mission.blocks.len(), 4);
        assert!(mission.blocks[3].is_quiz());
    }

    #[tokio::test]
    async fn test_malformed_output_uses_placeholder() {
        let (_, mission) = fill("I cannot do that.", ValidationMode::Automatic, 0).await;
        assert!(mission.placeholder);
        assert_eq!(mission.blocks.len(), 2);
        assert!(matches!(&mission.blocks[0], Block::Text { body } if body.contains("kitchen")));
        assert!(mission.blocks[1].is_quiz());
    }

    #[tokio::test]
    async fn test_remediation_prompt_carries_rules() {
        let reply = json!({"blocks": [{"type": "text", "body": "Three words only."}]}).to_string();
        let (backend, mission) = fill(&reply, ValidationMode::Presence, 2).await;

        assert_eq!(mission.remediation_round, 2);
        let request = &backend.requests()[0];
        assert!(request.system_instructions.contains("REMEDIATION (round 2)"));
        assert!(request.system_instructions.contains("Halve the number of new words"));
        assert!(request.user_payload.contains("\"remediation_round\":2"));
    }
}
