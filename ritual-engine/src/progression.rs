//! Step progression.
//!
//! Step states are never stored directly. They are recomputed from the step
//! order, the opened steps and the append-only progress log by the pure
//! [`recompute`] function, which keeps every state transition in one place.
//! The gating mode only decides which steps [`ProgressionMachine::open`]
//! accepts.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::plan::{GatingMode, LearningPath};

/// State of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Locked,
    Available,
    InProgress,
    Completed,
    /// Remediation rounds exhausted. Terminal and not satisfying.
    Failed,
    /// Skipped by the learner. Satisfying, may still be completed later.
    Skipped,
}

impl StepState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Available => "available",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Whether the step unblocks later required steps.
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }

    /// Whether no more outcomes are accepted.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for StepState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome reported for a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum ProgressOutcome {
    Success,
    Fail,
    Partial,
    Skipped,
}

impl ProgressOutcome {
    fn needs_remediation(&self) -> bool {
        matches!(self, Self::Fail | Self::Partial)
    }
}

/// Answer given to a mission quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct QuizAnswer {
    pub selected_index: usize,
    pub correct: bool,
}

/// One progress event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ProgressEvent {
    pub id: String,
    pub ritual_id: String,
    pub step_id: String,
    pub mission_id: String,
    pub outcome: ProgressOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_spent_secs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz: Option<QuizAnswer>,
    #[cfg_attr(feature = "typescript", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(
        ritual_id: impl Into<String>,
        step_id: impl Into<String>,
        mission_id: impl Into<String>,
        outcome: ProgressOutcome,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ritual_id: ritual_id.into(),
            step_id: step_id.into(),
            mission_id: mission_id.into(),
            outcome,
            score: None,
            time_spent_secs: None,
            notes: None,
            quiz: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_time_spent(mut self, seconds: u32) -> Self {
        self.time_spent_secs = Some(seconds);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_quiz(mut self, quiz: QuizAnswer) -> Self {
        self.quiz = Some(quiz);
        self
    }
}

/// Append-only log of progress events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressLog {
    events: Vec<ProgressEvent>,
}

impl ProgressLog {
    pub fn append(&mut self, event: ProgressEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[ProgressEvent] {
        &self.events
    }

    pub fn for_step<'a>(&'a self, step_id: &'a str) -> impl Iterator<Item = &'a ProgressEvent> + 'a {
        self.events.iter().filter(move |e| e.step_id == step_id)
    }

    pub fn last_for_mission(&self, mission_id: &str) -> Option<&ProgressEvent> {
        self.events.iter().rev().find(|e| e.mission_id == mission_id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// A step as seen by [`recompute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSlot {
    pub step_id: String,
    pub required: bool,
}

/// Derived view of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct StepView {
    pub step_id: String,
    pub state: StepState,
    /// Consecutive fail/partial outcomes since the last success or skip
    pub remediation_round: u8,
    /// When the step was first opened
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "typescript", ts(type = "string | null"))]
    pub opened_at: Option<DateTime<Utc>>,
}

/// Derive every step state.
///
/// `slots` must be in path order (levels, then steps). A step is available
/// when no earlier required step is unsatisfied.
pub fn recompute(
    slots: &[StepSlot],
    opened: &BTreeMap<String, DateTime<Utc>>,
    log: &ProgressLog,
    max_rounds: u8,
) -> Vec<StepView> {
    let mut views = Vec::with_capacity(slots.len());
    let mut blocked = false;

    for slot in slots {
        let mut completed = false;
        let mut skipped = false;
        let mut round: u8 = 0;
        let mut failed = false;
        let mut events = 0;

        for event in log.for_step(&slot.step_id) {
            events += 1;
            if completed || failed {
                break;
            }
            match event.outcome {
                ProgressOutcome::Success => {
                    completed = true;
                    round = 0;
                }
                ProgressOutcome::Skipped => {
                    skipped = true;
                    round = 0;
                }
                // a skipped step stays satisfied until completed
                _ if skipped => {}
                outcome if outcome.needs_remediation() => {
                    round = round.saturating_add(1);
                    if round >= max_rounds {
                        failed = true;
                    }
                }
                _ => {}
            }
        }

        let state = if completed {
            StepState::Completed
        } else if failed {
            StepState::Failed
        } else if skipped {
            StepState::Skipped
        } else if round > 0 {
            StepState::InProgress
        } else if events == 0 && opened.contains_key(&slot.step_id) {
            StepState::InProgress
        } else if !blocked {
            StepState::Available
        } else {
            StepState::Locked
        };

        if slot.required && !state.is_satisfied() {
            blocked = true;
        }
        views.push(StepView {
            step_id: slot.step_id.clone(),
            state,
            remediation_round: round,
            opened_at: opened.get(&slot.step_id).copied(),
        });
    }

    views
}

/// Result of recording an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub state: StepState,
    pub remediation_round: u8,
    /// The mission should be refilled with simpler content
    pub remediation_requested: bool,
}

/// Errors from the progression machine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgressionError {
    #[error("Unknown step: {0}")]
    UnknownStep(String),

    #[error("Step {0} is locked")]
    StepLocked(String),

    #[error("Step {step_id} is {state} and cannot be opened")]
    NotOpenable { step_id: String, state: StepState },

    #[error("Step {step_id} is {state} and accepts no more outcomes")]
    StepClosed { step_id: String, state: StepState },

    #[error("Mission {mission_id} does not belong to step {step_id}")]
    MissionMismatch { step_id: String, mission_id: String },
}

/// Persisted progression state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub path_id: String,
    /// step id -> first open
    pub opened: BTreeMap<String, DateTime<Utc>>,
    pub log: ProgressLog,
}

/// Progression of one path.
#[derive(Debug, Clone)]
pub struct ProgressionMachine {
    path_id: String,
    slots: Vec<StepSlot>,
    /// step id -> mission id
    missions: BTreeMap<String, String>,
    gating: GatingMode,
    max_rounds: u8,
    opened: BTreeMap<String, DateTime<Utc>>,
    log: ProgressLog,
}

impl ProgressionMachine {
    pub fn new(path: &LearningPath, max_rounds: u8) -> Self {
        let slots = path
            .steps()
            .map(|s| StepSlot {
                step_id: s.id.clone(),
                required: s.required,
            })
            .collect();
        let missions = path.steps().map(|s| (s.id.clone(), s.mission_id.clone())).collect();

        Self {
            path_id: path.id.clone(),
            slots,
            missions,
            gating: path.gating_mode,
            max_rounds: max_rounds.max(1),
            opened: BTreeMap::new(),
            log: ProgressLog::default(),
        }
    }

    pub fn states(&self) -> Vec<StepView> {
        recompute(&self.slots, &self.opened, &self.log, self.max_rounds)
    }

    pub fn state(&self, step_id: &str) -> Result<StepView, ProgressionError> {
        self.states()
            .into_iter()
            .find(|v| v.step_id == step_id)
            .ok_or_else(|| ProgressionError::UnknownStep(step_id.to_string()))
    }

    pub fn log(&self) -> &ProgressLog {
        &self.log
    }

    /// Open a step. Idempotent; the first open marks the start timestamp.
    ///
    /// Strict gating only opens available, in-progress and completed steps.
    /// Soft and open gating allow any.
    pub fn open(&mut self, step_id: &str) -> Result<StepView, ProgressionError> {
        let view = self.state(step_id)?;
        if self.gating == GatingMode::Strict {
            match view.state {
                StepState::Available | StepState::InProgress | StepState::Completed => {}
                StepState::Locked => return Err(ProgressionError::StepLocked(step_id.to_string())),
                state => {
                    return Err(ProgressionError::NotOpenable {
                        step_id: step_id.to_string(),
                        state,
                    })
                }
            }
        }
        if !self.opened.contains_key(step_id) {
            self.opened.insert(step_id.to_string(), Utc::now());
            debug!(path_id = %self.path_id, step_id, "Step opened");
        }
        self.state(step_id)
    }

    /// Check that an event would be accepted, without recording it.
    pub fn check(&self, event: &ProgressEvent) -> Result<StepView, ProgressionError> {
        let view = self.state(&event.step_id)?;
        if view.state.is_closed() {
            return Err(ProgressionError::StepClosed {
                step_id: event.step_id.clone(),
                state: view.state,
            });
        }
        if view.state == StepState::Locked && self.gating == GatingMode::Strict {
            return Err(ProgressionError::StepLocked(event.step_id.clone()));
        }
        if self.missions.get(&event.step_id) != Some(&event.mission_id) {
            return Err(ProgressionError::MissionMismatch {
                step_id: event.step_id.clone(),
                mission_id: event.mission_id.clone(),
            });
        }
        Ok(view)
    }

    /// Record an outcome for a step.
    pub fn record(&mut self, event: ProgressEvent) -> Result<RecordOutcome, ProgressionError> {
        self.check(&event)?;

        let step_id = event.step_id.clone();
        let outcome = event.outcome;
        self.opened.entry(step_id.clone()).or_insert(event.created_at);
        self.log.append(event);

        let view = self.state(&step_id)?;
        let remediation_requested = outcome.needs_remediation() && view.state == StepState::InProgress;
        info!(
            path_id = %self.path_id,
            step_id = %step_id,
            outcome = ?outcome,
            state = %view.state,
            remediation_round = view.remediation_round,
            "Progress recorded"
        );

        Ok(RecordOutcome {
            state: view.state,
            remediation_round: view.remediation_round,
            remediation_requested,
        })
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            path_id: self.path_id.clone(),
            opened: self.opened.clone(),
            log: self.log.clone(),
        }
    }

    /// Restore opened steps and the log. Snapshots of another path are ignored.
    pub fn restore(&mut self, snapshot: ProgressSnapshot) -> bool {
        if snapshot.path_id != self.path_id {
            return false;
        }
        self.opened = snapshot.opened;
        self.log = snapshot.log;
        true
    }
}
