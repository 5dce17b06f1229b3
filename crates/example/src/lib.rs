//! Demo wiring for Conduit.
//!
//! A transfer goes through a small workflow with one chain choice and one
//! replacement-dictionary choice:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  approve_transfer                                             │
//! │                                                               │
//! │  ┌──────────┐   ┌─────────────────┐                           │
//! │  │ validate │──▶│ approve (chain) │──┬──▶ normalize ──────┐   │
//! │  └──────────┘   └─────────────────┘  │                    │   │
//! │                                      └──▶ reject          │   │
//! │                                                           ▼   │
//! │              ┌──────────────────────────────┐   ┌──────────┐  │
//! │              │ select_normalization (dict)  │──▶│ normalize│  │
//! │              └──────────────────────────────┘   └──────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tasks are not executed; [`LoggingBackend`] logs each request and reports
//! success. Decisions are answered by [`run_unit`], which always picks the
//! first option on behalf of the demo operator.

use async_trait::async_trait;
use conduit_engine::Engine;
use conduit_engine::agents::UserId;
use conduit_engine::backend::{ExecutionBackend, TaskRequest};
use conduit_engine::chain::{ChainOutcome, ChainResult};
use conduit_engine::error::{BackendError, DecisionError};
use conduit_engine::unit::Unit;
use conduit_workflow::{
    Chain, ChainId, ExitCode, ExitRoute, JobStatus, Link, ReplacementItem, Workflow,
};

/// Chain the demo starts units in.
pub const START_CHAIN: &str = "approve_transfer";

/// Builds the demo workflow.
#[must_use]
pub fn demo_workflow() -> Workflow {
    let done = ExitRoute::end(JobStatus::CompletedSuccessfully);
    let normalizations = [
        ("preservation", "Normalize for preservation"),
        ("access", "Normalize for access"),
    ]
    .into_iter()
    .map(|(id, description)| ReplacementItem {
        id: id.to_owned(),
        description: description.to_owned(),
        items: [("normalizeType".to_owned(), id.to_owned())].into_iter().collect(),
    })
    .collect();

    Workflow::builder()
        .chain(Chain::new(START_CHAIN, "Approve transfer", "validate"))
        .chain(Chain::new("normalize", "Normalize", "select_normalization"))
        .chain(Chain::new("reject", "Reject transfer", "remove"))
        .link(
            Link::task("validate", "validate_transfer")
                .with_arguments("%SIPDirectory%")
                .on_exit(0, "approve"),
        )
        .link(
            Link::chain_choice("approve", ["normalize", "reject"])
                .with_description("Approve standard transfer"),
        )
        .link(
            Link::replacement_choice("select_normalization", normalizations)
                .with_description("Select normalization")
                .on_exit(0, "run_normalization"),
        )
        .link(
            Link::task("run_normalization", "normalize")
                .with_arguments("--type %normalizeType% --sip %SIPUUID%")
                .with_exit_code(0, done.clone()),
        )
        .link(
            Link::task("remove", "remove_transfer")
                .with_arguments("%SIPDirectory%")
                .with_exit_code(0, done),
        )
        .build()
}

/// Backend that logs each task and reports success.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingBackend;

#[async_trait]
impl ExecutionBackend for LoggingBackend {
    async fn execute(&self, request: TaskRequest) -> Result<ExitCode, BackendError> {
        tracing::info!(
            job = %request.job_id,
            execute = %request.execute,
            arguments = ?request.arguments,
            "running task"
        );
        Ok(0)
    }
}

/// Runs `unit` from `chain` to the end, answering every decision with its
/// first option as `operator`.
///
/// # Errors
///
/// Returns [`DecisionError`] if the chain cannot start or a decision is
/// rejected.
pub async fn run_unit(
    engine: &Engine,
    unit: Unit,
    chain: &ChainId,
    operator: UserId,
) -> Result<ChainResult, DecisionError> {
    let mut result = engine.start_chain(unit, chain).await?;

    while let ChainOutcome::AwaitingDecision(key) = &result.outcome {
        let key = key.clone();
        let view = engine.lookup(&key).map_err(|_| DecisionError::NotFound(key.clone()))?;
        match view.to_xml() {
            Ok(xml) => tracing::info!(%key, listing = %xml, "awaiting decision"),
            Err(err) => tracing::warn!(%key, error = %err, "could not render decision"),
        }

        let Some(first) = view.choices.first() else {
            tracing::warn!(%key, "nothing to choose from, leaving unit parked");
            break;
        };
        tracing::info!(%key, choice = %first.description, "operator decides");
        result = engine.submit_decision(&key, &first.id, Some(operator)).await?;
    }

    Ok(result)
}
