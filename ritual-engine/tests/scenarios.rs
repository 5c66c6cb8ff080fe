//! End-to-end scenarios over a scripted generator backend

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{service, PlanReply};
use playbook::{InMemoryGuardRulesetSource, PlaybookRegistry};
use ritual_agent::{MockBackend, MockReply};
use ritual_engine::{
    Block, Branch, EngineConfig, GateName, Orchestrator, ProgressDetails, ProgressOutcome, ResolveOptions,
    RitualError, RitualStatus, SubmitOutcome, SubmitRequest, TraceOutcome, UserFacingError, VerdictStatus,
};

fn orchestrator() -> Orchestrator {
    common::init_tracing();
    Orchestrator::new(
        &EngineConfig::default(),
        Arc::new(PlaybookRegistry::with_defaults()),
        Arc::new(InMemoryGuardRulesetSource::default()),
        None,
    )
}

#[tokio::test]
async fn scenario_a_vague_french_intent_gets_quick_choices() {
    let decision = orchestrator()
        .resolve("réussir ma vie", 30, "fr", &ResolveOptions::default())
        .await
        .unwrap();

    assert_eq!(decision.branch, Branch::Clarify);
    let verdict = decision.stopping_verdict().unwrap();
    assert_eq!(verdict.gate, GateName::SafetyLexicon);
    assert_eq!(verdict.status, VerdictStatus::NeedsClarification);
    assert_eq!(verdict.reason_code.as_deref(), Some("vague"));
    assert_eq!(verdict.choices.len(), 4);

    assert_eq!(decision.trace.len(), 6);
    assert_eq!(
        decision.trace_for(GateName::Domain).unwrap().outcome,
        TraceOutcome::Skipped
    );
}

#[tokio::test]
async fn scenario_b_fame_claim_needs_reformulation() {
    let decision = orchestrator()
        .resolve(
            "Learn guitar basics → become world-famous in 7 days",
            30,
            "en",
            &ResolveOptions::default(),
        )
        .await
        .unwrap();

    let verdict = decision.stopping_verdict().unwrap();
    assert_eq!(verdict.gate, GateName::Realism);
    assert_eq!(verdict.reason_code.as_deref(), Some("needs_reformulation"));
    assert_eq!(verdict.choices.len(), 3);
    assert_eq!(
        verdict.choices.iter().filter(|c| c.days == Some(90)).count(),
        1
    );
}

#[tokio::test]
async fn scenario_c_spanish_vocabulary_two_week_plan() {
    let (_, _, service) = service(MockBackend::default().with_response(PlanReply::new(2, 4).to_reply()));

    let outcome = service
        .submit("ritual-c", SubmitRequest::new("Improve my Spanish vocabulary", 14, "en"))
        .await
        .unwrap();
    assert!(matches!(outcome, SubmitOutcome::Accepted { status: RitualStatus::Ready, .. }));

    let record = service.record("ritual-c").await.unwrap();
    let path = record.path.unwrap();
    assert_eq!(record.lock.domain_id, "language");
    assert_eq!(path.domain, record.lock);
    assert_eq!(path.levels.len(), 2);
    assert!(!path.summary.contains("[ritual:v1]"));

    assert_eq!(record.stubs.len(), path.step_count());
    for step in path.steps() {
        assert_eq!(record.stubs.iter().filter(|s| s.id == step.mission_id).count(), 1);
    }
    assert!(record.stubs.iter().all(|s| (5..=10).contains(&s.estimated_minutes)));
}

#[tokio::test]
async fn scenario_d_presence_mode_never_gets_a_quiz() {
    let quiz_heavy = r#"{"blocks": [
        {"type": "quiz", "question": "Which word means apple?", "choices": ["manzana", "mesa"], "answer_index": 0},
        {"type": "text", "body": "Say each word out loud."}
    ]}"#;
    let (_, _, service) = service(
        MockBackend::default()
            .with_script([MockReply::Content(
                PlanReply::new(2, 4).validation_mode("presence").to_reply(),
            )])
            .with_response(quiz_heavy),
    );
    service
        .submit("ritual-d", SubmitRequest::new("Improve my Spanish vocabulary", 14, "en"))
        .await
        .unwrap();

    let first = service.mission_content("ritual-d", "s1-1").await.unwrap();
    assert!(!first.blocks.iter().any(Block::is_quiz));

    service
        .record_progress("ritual-d", "s1-1", ProgressOutcome::Fail, ProgressDetails::default())
        .await
        .unwrap();
    let remediated = service.mission_content("ritual-d", "s1-1").await.unwrap();
    assert_eq!(remediated.remediation_round, 1);
    assert!(!remediated.blocks.iter().any(Block::is_quiz));
}

#[tokio::test]
async fn scenario_e_mismatched_counts_fail_after_one_retry() {
    let (backend, _, service) = service(
        MockBackend::default().with_response(PlanReply::new(2, 4).missing_missions(1).to_reply()),
    );

    let err = service
        .submit("ritual-e", SubmitRequest::new("Improve my Spanish vocabulary", 14, "en"))
        .await
        .unwrap_err();

    let RitualError::Plan(failure) = &err else {
        panic!("expected a plan failure, got {err:?}");
    };
    assert_eq!(failure.code, "invalid_mission_stubs");
    assert_eq!(failure.attempts, 2);
    assert!(failure.excerpt.chars().count() <= 400);
    assert_eq!(err.user_facing(), UserFacingError::RetryablePlanFailure);

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].user_payload.contains("invalid_mission_stubs"));

    let status = service.status("ritual-e").await.unwrap();
    assert_eq!(status.status, RitualStatus::Error);
    assert!(status.path_id.is_none());
    assert!(status.steps.is_empty());
}

#[tokio::test]
async fn concurrent_submit_generates_once() {
    let (backend, _, service) = service(
        MockBackend::default()
            .with_response(PlanReply::new(2, 4).to_reply())
            .with_delay(Duration::from_millis(50)),
    );
    let request = SubmitRequest::new("Improve my Spanish vocabulary", 14, "en");

    let (first, second) = tokio::join!(
        service.submit("ritual-lock", request.clone()),
        service.submit("ritual-lock", request.clone()),
    );

    let outcomes = [first.unwrap(), second.unwrap()];
    assert_eq!(
        outcomes.iter().filter(|o| matches!(o, SubmitOutcome::InFlight { .. })).count(),
        1
    );
    assert_eq!(backend.call_count(), 1);
    assert!(!service.locks().is_held("ritual-lock"));

    assert!(matches!(
        service.submit("ritual-lock", request).await.unwrap(),
        SubmitOutcome::Accepted { status: RitualStatus::Ready, .. }
    ));
    assert_eq!(backend.call_count(), 1);
}
