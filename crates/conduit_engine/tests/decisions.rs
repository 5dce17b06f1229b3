//! Integration tests for parking units and answering their decisions.
//!
//! Covers the pending-choice registry as seen through [`Engine`]:
//! - one entry per parked unit, listed in registration order
//! - rejected submissions leave the entry in place
//! - concurrent submissions for one key resolve exactly once
//! - acting users are attributed through the agent directory
//! - shutdown hands parked units back

mod test_utils;

use std::sync::Arc;

use conduit_engine::agents::{ACTIVE_AGENT_VARIABLE, InMemoryAgents, UserId};
use conduit_engine::chain::{ChainOutcome, ChainState};
use conduit_engine::error::{ChainError, DecisionError};
use conduit_engine::jobs::MemoryJobStore;
use conduit_engine::pending::PendingKey;
use conduit_engine::unit::{Unit, UnitId, UnitKind};
use conduit_engine::Engine;
use conduit_workflow::{JobStatus, LinkId};
use test_utils::{ScriptedBackend, approval_workflow, unit_without_overrides};

fn engine(backend: Arc<ScriptedBackend>) -> Engine {
    Engine::builder(approval_workflow(), backend).build()
}

async fn park(engine: &Engine, unit: Unit) -> PendingKey {
    let result = engine.start_chain(unit, &"ingest".into()).await.unwrap();
    assert_eq!(result.state(), ChainState::AwaitingDecision);
    assert_eq!(result.links_executed, 2);
    result.pending_key().cloned().unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration and listing
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn parked_unit_is_listed_once() {
    let backend = Arc::new(ScriptedBackend::new());
    let engine = engine(backend.clone());
    let (_dir, unit) = unit_without_overrides();
    let unit_id = unit.id();

    let key = park(&engine, unit).await;

    assert_eq!(key, PendingKey::new(LinkId::from("approve"), unit_id));
    let listed = engine.list_pending();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].key, key);
    assert_eq!(listed[0].link_description, "Approve transfer");
    assert_eq!(listed[0].chain_id.as_str(), "ingest");
    let offered: Vec<_> = listed[0].choices.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(offered, ["store", "reject"]);
    assert_eq!(backend.executed(), ["check_transfer"]);
}

#[tokio::test]
async fn listing_follows_registration_order() {
    let engine = engine(Arc::new(ScriptedBackend::new()));
    let (_a, first) = unit_without_overrides();
    let (_b, second) = unit_without_overrides();

    let first_key = park(&engine, first).await;
    let second_key = park(&engine, second).await;

    let keys: Vec<_> = engine.list_pending().into_iter().map(|v| v.key).collect();
    assert_eq!(keys, [first_key.clone(), second_key]);
    assert_eq!(engine.lookup(&first_key).unwrap().key, first_key);
}

#[tokio::test]
async fn parking_twice_at_the_same_key_is_rejected() {
    let jobs = Arc::new(MemoryJobStore::new());
    let engine = Engine::builder(approval_workflow(), Arc::new(ScriptedBackend::new()))
        .with_job_store(Arc::clone(&jobs) as _)
        .build();
    let (_dir, unit) = unit_without_overrides();
    let twin = unit.clone();

    let key = park(&engine, unit).await;
    let err = engine.start_chain(twin, &"ingest".into()).await.unwrap_err();

    assert!(matches!(err, ChainError::DuplicateRegistration(k) if k == key));
    assert_eq!(engine.pending().len(), 1);

    let statuses: Vec<_> = jobs
        .jobs_for_link("approve")
        .iter()
        .map(|job| jobs.status(&job.id))
        .collect();
    assert_eq!(statuses, [JobStatus::AwaitingDecision, JobStatus::Failed]);
}

#[tokio::test]
async fn xml_listing_names_every_offered_chain() {
    let engine = engine(Arc::new(ScriptedBackend::new()));
    let (_dir, unit) = unit_without_overrides();
    let key = park(&engine, unit).await;

    let xml = engine.render_pending_xml().unwrap();
    assert!(xml.starts_with("<choicesAvailableForUnits>"));
    assert!(xml.contains(&format!("<pendingKey>{key}</pendingKey>")));
    assert!(xml.contains("<chainAvailable>store</chainAvailable>"));
    assert!(xml.contains("<description>Reject transfer</description>"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Submission
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn valid_choice_starts_the_selected_chain() {
    let backend = Arc::new(ScriptedBackend::new());
    let engine = engine(backend.clone());
    let (_dir, unit) = unit_without_overrides();
    let key = park(&engine, unit).await;

    let result = engine.submit_decision(&key, "reject", None).await.unwrap();

    assert_eq!(result.state(), ChainState::Completed);
    assert_eq!(result.links_executed, 1);
    assert_eq!(backend.executed(), ["check_transfer", "remove_transfer"]);
    assert!(engine.list_pending().is_empty());
}

#[tokio::test]
async fn invalid_choice_leaves_the_entry_parked() {
    let engine = engine(Arc::new(ScriptedBackend::new()));
    let (_dir, unit) = unit_without_overrides();
    let key = park(&engine, unit).await;

    let err = engine
        .submit_decision(&key, "delete_everything", None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DecisionError::InvalidChoice { ref selector, .. } if selector == "delete_everything"
    ));
    assert!(engine.pending().contains(&key));

    // The entry still answers a valid choice afterwards.
    let result = engine.submit_decision(&key, "store", None).await.unwrap();
    assert_eq!(result.state(), ChainState::Completed);
}

#[tokio::test]
async fn unknown_key_is_not_found() {
    let engine = engine(Arc::new(ScriptedBackend::new()));
    let key = PendingKey::new(LinkId::from("approve"), UnitId::new_v4());

    let err = engine.submit_decision(&key, "store", None).await.unwrap_err();
    assert!(matches!(err, DecisionError::NotFound(k) if k == key));
}

#[tokio::test]
async fn second_submission_is_not_found() {
    let engine = engine(Arc::new(ScriptedBackend::new()));
    let (_dir, unit) = unit_without_overrides();
    let key = park(&engine, unit).await;

    engine.submit_decision(&key, "store", None).await.unwrap();
    let err = engine.submit_decision(&key, "reject", None).await.unwrap_err();
    assert!(matches!(err, DecisionError::NotFound(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_resolve_once() {
    let backend = Arc::new(ScriptedBackend::new());
    let engine = engine(backend.clone());
    let (_dir, unit) = unit_without_overrides();
    let key = park(&engine, unit).await;

    let submit = |selector: &'static str| {
        let engine = engine.clone();
        let key = key.clone();
        tokio::spawn(async move { engine.submit_decision(&key, selector, None).await })
    };
    let (a, b, c) = futures::join!(submit("store"), submit("reject"), submit("store"));
    let results = [a.unwrap(), b.unwrap(), c.unwrap()];

    let winners = results.iter().filter(|r| r.is_ok()).count();
    let losers = results
        .iter()
        .filter(|r| matches!(r, Err(DecisionError::NotFound(_))))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(losers, 2);

    // Exactly one follow-up chain ran.
    let executed = backend.executed();
    assert_eq!(executed.len(), 2);
    assert_eq!(executed[0], "check_transfer");
    assert!(engine.list_pending().is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Agent attribution
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn acting_user_is_recorded_as_active_agent() {
    let agents = InMemoryAgents::new().with_agent(UserId(7), "Archivist Agent 7");
    let engine = Engine::builder(approval_workflow(), Arc::new(ScriptedBackend::new()))
        .with_agents(Arc::new(agents))
        .build();
    let (_dir, unit) = unit_without_overrides();
    let key = park(&engine, unit).await;

    let result = engine
        .submit_decision(&key, "store", Some(UserId(7)))
        .await
        .unwrap();

    let ChainOutcome::Completed(unit) = result.outcome else {
        panic!("chain did not complete");
    };
    let agent = unit.variable(ACTIVE_AGENT_VARIABLE).unwrap();
    assert_eq!(agent.value.as_deref(), Some("Archivist Agent 7"));
}

#[tokio::test]
async fn unknown_user_keeps_the_entry_parked() {
    let engine = engine(Arc::new(ScriptedBackend::new()));
    let (_dir, unit) = unit_without_overrides();
    let key = park(&engine, unit).await;

    let err = engine
        .submit_decision(&key, "store", Some(UserId(99)))
        .await
        .unwrap_err();

    assert!(matches!(err, DecisionError::UnknownUser(UserId(99))));
    assert!(engine.pending().contains(&key));
}

#[tokio::test]
async fn anonymous_decision_sets_no_agent() {
    let engine = engine(Arc::new(ScriptedBackend::new()));
    let (_dir, unit) = unit_without_overrides();
    let key = park(&engine, unit).await;

    let result = engine.submit_decision(&key, "store", None).await.unwrap();
    let unit = result.unit().unwrap();
    assert!(unit.variable(ACTIVE_AGENT_VARIABLE).is_none());
}

// ─────────────────────────────────────────────────────────────────────────────
// Shutdown
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn shutdown_returns_parked_units() {
    let engine = engine(Arc::new(ScriptedBackend::new()));
    let (_a, first) = unit_without_overrides();
    let second = Unit::new(UnitKind::Sip, "sip", "/nonexistent/sip/");
    let ids = [first.id(), second.id()];

    let first_key = park(&engine, first).await;
    park(&engine, second).await;

    let units = engine.shutdown();
    let returned: Vec<_> = units.iter().map(Unit::id).collect();
    assert_eq!(returned, ids);
    assert!(engine.pending().is_empty());

    let err = engine
        .submit_decision(&first_key, "store", None)
        .await
        .unwrap_err();
    assert!(matches!(err, DecisionError::NotFound(_)));
}
