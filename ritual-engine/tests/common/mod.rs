//! Shared helpers for the scenario tests

#![allow(dead_code)]

use std::sync::{Arc, Once};

use playbook::{InMemoryGuardRulesetSource, PlaybookRegistry};
use ritual_agent::{GeneratorService, MockBackend};
use ritual_engine::{EngineConfig, InMemoryProgressSink, RitualService};
use serde_json::{json, Value};

static TRACING: Once = Once::new();

/// Enable logs for a test run with `RUST_LOG=ritual_engine=debug`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Builder for plan replies shaped like generator output.
pub struct PlanReply {
    levels: usize,
    steps_per_level: usize,
    missions_dropped: usize,
    validation_mode: &'static str,
    minutes: u32,
}

impl PlanReply {
    pub fn new(levels: usize, steps_per_level: usize) -> Self {
        Self {
            levels,
            steps_per_level,
            missions_dropped: 0,
            validation_mode: "self_report",
            minutes: 7,
        }
    }

    /// Omit the last `n` mission stubs.
    pub fn missing_missions(mut self, n: usize) -> Self {
        self.missions_dropped = n;
        self
    }

    pub fn validation_mode(mut self, mode: &'static str) -> Self {
        self.validation_mode = mode;
        self
    }

    pub fn minutes(mut self, minutes: u32) -> Self {
        self.minutes = minutes;
        self
    }

    pub fn build(&self) -> Value {
        let mut levels = Vec::new();
        let mut missions = Vec::new();
        for l in 1..=self.levels {
            let steps: Vec<Value> = (1..=self.steps_per_level)
                .map(|s| {
                    missions.push(json!({
                        "id": format!("m{l}-{s}"),
                        "title": format!("Mission {l}.{s}"),
                        "summary": format!("Use the words of set {l}.{s} in a sentence"),
                        "angle": format!("Everyday scene {l}.{s}"),
                        "action_verb": "practice",
                        "effort_type": "practice",
                        "competency_id": "vocab",
                        "estimated_minutes": self.minutes,
                    }));
                    json!({
                        "title": format!("Words {l}.{s}"),
                        "competency_id": "vocab",
                        "effort_type": "practice",
                        "duration_minutes": self.minutes,
                        "mission_id": format!("m{l}-{s}"),
                    })
                })
                .collect();
            levels.push(json!({"title": format!("Level {l}"), "steps": steps}));
        }
        missions.truncate(missions.len().saturating_sub(self.missions_dropped));

        json!({
            "path": {
                "title": "Spanish vocabulary",
                "summary": "[ritual:v1] A handful of useful words every day.",
                "description": "Each day brings a few new words. You use them in short sentences right away.",
                "feasibility_note": "Ten minutes a day is enough for this pace.",
                "ritual_mode": "daily",
                "validation_mode": self.validation_mode,
                "gating_mode": "strict",
                "competencies": [{"id": "vocab", "title": "Vocabulary"}],
                "levels": levels,
            },
            "missions": missions,
        })
    }

    pub fn to_reply(&self) -> String {
        format!("```json\n{}\n```", self.build())
    }
}

/// A service over a scripted backend with default configuration.
pub fn service(backend: MockBackend) -> (Arc<MockBackend>, Arc<InMemoryProgressSink>, RitualService) {
    init_tracing();
    let backend = Arc::new(backend);
    let sink = Arc::new(InMemoryProgressSink::new());
    let service = RitualService::new(
        EngineConfig::default(),
        Arc::new(PlaybookRegistry::with_defaults()),
        Arc::new(InMemoryGuardRulesetSource::default()),
        Arc::new(GeneratorService::new(vec![backend.clone()])),
        sink.clone(),
    );
    (backend, sink, service)
}
