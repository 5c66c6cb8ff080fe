//! Ritual service.
//!
//! Owns the lifecycle of a ritual: the intent goes through the decision
//! pipeline, an accepted intent gets a generated plan, and the learner then
//! opens steps, records outcomes and reads mission content.
//!
//! At most one generation runs per ritual id. A second submit while one is
//! in flight returns [`SubmitOutcome::InFlight`] without touching the
//! generator; clients poll [`RitualService::status`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use playbook::{compute_hash, text::normalize, DomainLock, DomainPlaybook, GuardRulesetSource, PlaybookRegistry};
use ritual_agent::GeneratorService;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::config::EngineConfig;
use crate::mission::{MissionAdapter, MissionFull};
use crate::orchestrator::Orchestrator;
use crate::plan::{LearningPath, MissionStub, PlanGenerator};
use crate::progression::{
    ProgressEvent, ProgressOutcome, ProgressSnapshot, ProgressionError, ProgressionMachine, QuizAnswer,
    RecordOutcome, StepView,
};
use crate::types::{Decision, Locale, ResolveOptions, Result, RitualError};

/// Generation status of a ritual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum RitualStatus {
    Pending,
    Ready,
    Error,
}

/// Status surface for clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct RitualStatusView {
    pub ritual_id: String,
    pub status: RitualStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepView>,
}

/// Everything known about one ritual.
#[derive(Debug, Clone)]
pub struct RitualRecord {
    pub ritual_id: String,
    /// Hash of the normalized intent text
    pub intent_digest: String,
    /// Goal as accepted by the pipeline
    pub goal: String,
    pub days: u32,
    pub locale: Locale,
    pub hints: Vec<String>,
    pub lock: DomainLock,
    pub playbook: DomainPlaybook,
    pub status: RitualStatus,
    pub last_error: Option<String>,
    pub path: Option<LearningPath>,
    pub stubs: Vec<MissionStub>,
    pub machine: Option<ProgressionMachine>,
    /// Filled missions by mission id
    pub missions: HashMap<String, MissionFull>,
    pub hidden: bool,
    pub updated_at: DateTime<Utc>,
}

impl RitualRecord {
    fn view(&self) -> RitualStatusView {
        RitualStatusView {
            ritual_id: self.ritual_id.clone(),
            status: self.status,
            last_error: self.last_error.clone(),
            path_id: self.path.as_ref().map(|p| p.id.clone()),
            steps: self.machine.as_ref().map(|m| m.states()).unwrap_or_default(),
        }
    }

    fn ready_parts(&mut self) -> Result<(&LearningPath, &mut ProgressionMachine)> {
        match (&self.path, &mut self.machine) {
            (Some(path), Some(machine)) => Ok((path, machine)),
            _ => Err(RitualError::NotReady(self.ritual_id.clone())),
        }
    }
}

/// Per-ritual generation locks.
#[derive(Debug, Clone, Default)]
pub struct GenerationLocks {
    held: Arc<DashMap<String, DateTime<Utc>>>,
}

impl GenerationLocks {
    /// Take the lock for a ritual, or `None` if a generation is running.
    pub fn try_acquire(&self, ritual_id: &str) -> Option<GenerationGuard> {
        match self.held.entry(ritual_id.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(Utc::now());
                Some(GenerationGuard {
                    held: Arc::clone(&self.held),
                    ritual_id: ritual_id.to_string(),
                })
            }
        }
    }

    pub fn is_held(&self, ritual_id: &str) -> bool {
        self.held.contains_key(ritual_id)
    }
}

/// Releases its ritual's lock when dropped.
#[derive(Debug)]
pub struct GenerationGuard {
    held: Arc<DashMap<String, DateTime<Utc>>>,
    ritual_id: String,
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        self.held.remove(&self.ritual_id);
    }
}

/// Persistence for progress.
#[async_trait::async_trait]
pub trait ProgressSink: Send + Sync {
    /// Append one event. Events are never rewritten.
    async fn append(&self, ritual_id: &str, event: &ProgressEvent) -> Result<()>;

    async fn save_snapshot(&self, ritual_id: &str, snapshot: &ProgressSnapshot) -> Result<()>;

    async fn load_snapshot(&self, ritual_id: &str) -> Result<Option<ProgressSnapshot>>;
}

/// In-memory progress sink.
#[derive(Debug, Default)]
pub struct InMemoryProgressSink {
    events: DashMap<String, Vec<ProgressEvent>>,
    snapshots: DashMap<String, ProgressSnapshot>,
}

impl InMemoryProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self, ritual_id: &str) -> Vec<ProgressEvent> {
        self.events.get(ritual_id).map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl ProgressSink for InMemoryProgressSink {
    async fn append(&self, ritual_id: &str, event: &ProgressEvent) -> Result<()> {
        self.events.entry(ritual_id.to_string()).or_default().push(event.clone());
        Ok(())
    }

    async fn save_snapshot(&self, ritual_id: &str, snapshot: &ProgressSnapshot) -> Result<()> {
        self.snapshots.insert(ritual_id.to_string(), snapshot.clone());
        Ok(())
    }

    async fn load_snapshot(&self, ritual_id: &str) -> Result<Option<ProgressSnapshot>> {
        Ok(self.snapshots.get(ritual_id).map(|s| s.clone()))
    }
}

/// A ritual request.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub text: String,
    pub days: u32,
    pub locale: String,
    /// Extra guidance for the plan, e.g. selected clarify chips
    pub hints: Vec<String>,
    pub options: ResolveOptions,
}

impl SubmitRequest {
    pub fn new(text: impl Into<String>, days: u32, locale: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            days,
            locale: locale.into(),
            hints: Vec::new(),
            options: ResolveOptions::default(),
        }
    }

    pub fn with_hints(mut self, hints: Vec<String>) -> Self {
        self.hints = hints;
        self
    }

    pub fn with_controllability_check(mut self) -> Self {
        self.options.check_controllability = true;
        self
    }
}

/// Result of a submit.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    Accepted { ritual_id: String, status: RitualStatus },
    /// The pipeline asked for clarification or blocked the intent
    Declined(Decision),
    /// Another generation for this ritual is running
    InFlight { ritual_id: String },
}

/// Outcome details reported by the client.
#[derive(Debug, Clone, Default)]
pub struct ProgressDetails {
    pub score: Option<f32>,
    pub time_spent_secs: Option<u32>,
    pub notes: Option<String>,
    pub quiz: Option<QuizAnswer>,
}

/// Ties the pipeline, plan generation, missions and progression together.
pub struct RitualService {
    config: EngineConfig,
    orchestrator: Orchestrator,
    plans: PlanGenerator,
    missions: MissionAdapter,
    sink: Arc<dyn ProgressSink>,
    rituals: DashMap<String, Arc<RwLock<RitualRecord>>>,
    locks: GenerationLocks,
}

impl RitualService {
    pub fn new(
        config: EngineConfig,
        registry: Arc<PlaybookRegistry>,
        guard_source: Arc<dyn GuardRulesetSource>,
        generator: Arc<GeneratorService>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            orchestrator: Orchestrator::new(&config, registry, guard_source, Some(Arc::clone(&generator))),
            plans: PlanGenerator::new(Arc::clone(&generator), config.plan.clone()),
            missions: MissionAdapter::new(generator, config.mission.clone()),
            sink,
            rituals: DashMap::new(),
            locks: GenerationLocks::default(),
            config,
        }
    }

    pub fn locks(&self) -> &GenerationLocks {
        &self.locks
    }

    fn entry(&self, ritual_id: &str) -> Result<Arc<RwLock<RitualRecord>>> {
        self.rituals
            .get(ritual_id)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| RitualError::NotFound(ritual_id.to_string()))
    }

    /// A copy of the stored record.
    pub async fn record(&self, ritual_id: &str) -> Result<RitualRecord> {
        Ok(self.entry(ritual_id)?.read().await.clone())
    }

    /// Run an intent through the pipeline and generate its plan.
    #[instrument(skip(self, request), fields(days = request.days))]
    pub async fn submit(&self, ritual_id: &str, request: SubmitRequest) -> Result<SubmitOutcome> {
        let Some(_guard) = self.locks.try_acquire(ritual_id) else {
            info!("Generation already in flight");
            return Ok(SubmitOutcome::InFlight {
                ritual_id: ritual_id.to_string(),
            });
        };

        let digest = compute_hash(normalize(&request.text).as_bytes());
        let existing = self.entry(ritual_id).ok();
        if let Some(existing) = &existing {
            let record = existing.read().await;
            if record.status == RitualStatus::Ready && !record.hidden && record.intent_digest == digest {
                return Ok(SubmitOutcome::Accepted {
                    ritual_id: ritual_id.to_string(),
                    status: RitualStatus::Ready,
                });
            }
        }

        let decision = self
            .orchestrator
            .resolve(&request.text, request.days, &request.locale, &request.options)
            .await?;
        let Some(proceed) = decision.proceed().cloned() else {
            info!(branch = ?decision.branch, "Intent declined");
            return Ok(SubmitOutcome::Declined(decision));
        };

        let candidate = RitualRecord {
            ritual_id: ritual_id.to_string(),
            intent_digest: digest,
            goal: proceed.goal,
            days: proceed.days,
            locale: proceed.locale,
            hints: request.hints,
            lock: proceed.domain,
            playbook: proceed.playbook,
            status: RitualStatus::Pending,
            last_error: None,
            path: None,
            stubs: Vec::new(),
            machine: None,
            missions: HashMap::new(),
            hidden: false,
            updated_at: Utc::now(),
        };

        let status = match existing {
            None => {
                let entry = Arc::new(RwLock::new(candidate));
                self.rituals.insert(ritual_id.to_string(), Arc::clone(&entry));
                self.generate_into(&entry).await?
            }
            // the stored ritual is replaced only once the new plan is ready
            Some(existing) => {
                let staged = RwLock::new(candidate);
                let result = self.generate_into(&staged).await;
                let staged = staged.into_inner();
                let mut record = existing.write().await;
                match result {
                    Ok(status) => {
                        *record = staged;
                        status
                    }
                    Err(e) => {
                        record.status = RitualStatus::Error;
                        record.last_error = staged.last_error;
                        record.updated_at = Utc::now();
                        return Err(e);
                    }
                }
            }
        };
        Ok(SubmitOutcome::Accepted {
            ritual_id: ritual_id.to_string(),
            status,
        })
    }

    /// Replace the plan with a freshly generated one. Progress restarts.
    #[instrument(skip(self))]
    pub async fn regenerate(&self, ritual_id: &str) -> Result<SubmitOutcome> {
        let entry = self.entry(ritual_id)?;
        let Some(_guard) = self.locks.try_acquire(ritual_id) else {
            return Ok(SubmitOutcome::InFlight {
                ritual_id: ritual_id.to_string(),
            });
        };

        let status = self.generate_into(&entry).await?;
        Ok(SubmitOutcome::Accepted {
            ritual_id: ritual_id.to_string(),
            status,
        })
    }

    /// Generate a plan for a record. Must be called with the ritual's lock held.
    ///
    /// On failure the previous plan, if any, is kept and the status becomes
    /// `error`.
    async fn generate_into(&self, entry: &RwLock<RitualRecord>) -> Result<RitualStatus> {
        let (ritual_id, goal, days, locale, lock, playbook, hints) = {
            let mut record = entry.write().await;
            record.status = RitualStatus::Pending;
            record.last_error = None;
            (
                record.ritual_id.clone(),
                record.goal.clone(),
                record.days,
                record.locale,
                record.lock.clone(),
                record.playbook.clone(),
                record.hints.clone(),
            )
        };

        let result = self.plans.generate(&goal, days, locale, &lock, &playbook, &hints).await;

        let mut record = entry.write().await;
        record.updated_at = Utc::now();
        match result {
            Ok(plan) => {
                let machine = ProgressionMachine::new(&plan.path, self.config.mission.max_remediation_rounds);
                self.sink.save_snapshot(&ritual_id, &machine.snapshot()).await?;
                info!(
                    ritual_id = %ritual_id,
                    path_id = %plan.path.id,
                    attempts = plan.attempts,
                    repairs = plan.diagnostics.len(),
                    "Ritual ready"
                );
                record.path = Some(plan.path);
                record.stubs = plan.stubs;
                record.machine = Some(machine);
                record.missions.clear();
                record.status = RitualStatus::Ready;
                Ok(RitualStatus::Ready)
            }
            Err(failure) => {
                warn!(ritual_id = %ritual_id, code = %failure.code, "Ritual generation failed");
                record.status = RitualStatus::Error;
                record.last_error = Some(failure.code.clone());
                Err(failure.into())
            }
        }
    }

    pub async fn status(&self, ritual_id: &str) -> Result<RitualStatusView> {
        let entry = self.entry(ritual_id)?;
        let record = entry.read().await;
        if record.hidden {
            return Err(RitualError::NotFound(ritual_id.to_string()));
        }
        Ok(record.view())
    }

    /// Restore progress saved by the sink, e.g. after a restart.
    pub async fn restore_progress(&self, ritual_id: &str) -> Result<bool> {
        let entry = self.entry(ritual_id)?;
        let Some(snapshot) = self.sink.load_snapshot(ritual_id).await? else {
            return Ok(false);
        };
        let mut record = entry.write().await;
        let (_, machine) = record.ready_parts()?;
        Ok(machine.restore(snapshot))
    }

    pub async fn open_step(&self, ritual_id: &str, step_id: &str) -> Result<StepView> {
        let entry = self.entry(ritual_id)?;
        let mut record = entry.write().await;
        let (_, machine) = record.ready_parts()?;
        let view = machine.open(step_id)?;
        let snapshot = machine.snapshot();
        self.sink.save_snapshot(ritual_id, &snapshot).await?;
        Ok(view)
    }

    /// Record an outcome for a step.
    ///
    /// The event is checked against the machine, appended to the sink and
    /// only then applied, so a sink failure leaves progression unchanged.
    #[instrument(skip(self, details))]
    pub async fn record_progress(
        &self,
        ritual_id: &str,
        step_id: &str,
        outcome: ProgressOutcome,
        details: ProgressDetails,
    ) -> Result<RecordOutcome> {
        let entry = self.entry(ritual_id)?;
        let mut record = entry.write().await;
        let (path, machine) = record.ready_parts()?;
        let mission_id = path
            .step(step_id)
            .map(|s| s.mission_id.clone())
            .ok_or_else(|| ProgressionError::UnknownStep(step_id.to_string()))?;

        let mut event = ProgressEvent::new(ritual_id, step_id, mission_id, outcome);
        if let Some(score) = details.score {
            event = event.with_score(score);
        }
        if let Some(seconds) = details.time_spent_secs {
            event = event.with_time_spent(seconds);
        }
        if let Some(notes) = details.notes {
            event = event.with_notes(notes);
        }
        if let Some(quiz) = details.quiz {
            event = event.with_quiz(quiz);
        }

        machine.check(&event)?;
        self.sink.append(ritual_id, &event).await?;
        let result = machine.record(event)?;
        let snapshot = machine.snapshot();
        record.updated_at = Utc::now();
        self.sink.save_snapshot(ritual_id, &snapshot).await?;
        Ok(result)
    }

    /// Content of a step's mission, filled on first read and refilled when
    /// the step enters a new remediation round.
    pub async fn mission_content(&self, ritual_id: &str, step_id: &str) -> Result<MissionFull> {
        let entry = self.entry(ritual_id)?;

        let (path_id, step, stub, playbook, mode, round, locale) = {
            let mut record = entry.write().await;
            let locale = record.locale;
            let playbook = record.playbook.clone();
            let (path, machine) = record.ready_parts()?;
            let path_id = path.id.clone();
            let mode = path.validation_mode;
            let step = path
                .step(step_id)
                .cloned()
                .ok_or_else(|| ProgressionError::UnknownStep(step_id.to_string()))?;
            let round = machine.state(step_id)?.remediation_round;

            if let Some(cached) = record.missions.get(&step.mission_id) {
                if cached.remediation_round == round {
                    return Ok(cached.clone());
                }
            }
            let stub = record
                .stubs
                .iter()
                .find(|s| s.id == step.mission_id)
                .cloned()
                .ok_or_else(|| RitualError::NotReady(ritual_id.to_string()))?;
            (path_id, step, stub, playbook, mode, round, locale)
        };

        let mission = self.missions.fill(&step, &stub, &playbook, mode, round, locale).await;

        let mut record = entry.write().await;
        if record.path.as_ref().map(|p| p.id.as_str()) == Some(path_id.as_str()) {
            record.missions.insert(stub.id.clone(), mission.clone());
        }
        Ok(mission)
    }

    /// Hide a ritual from status queries.
    pub async fn hide(&self, ritual_id: &str) -> Result<()> {
        let entry = self.entry(ritual_id)?;
        let mut record = entry.write().await;
        record.hidden = true;
        record.updated_at = Utc::now();
        info!(ritual_id, "Ritual hidden");
        Ok(())
    }
}
