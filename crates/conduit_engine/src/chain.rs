//! The job chain driver.
//!
//! [`ChainDriver`] advances one unit through the workflow until the chain
//! completes, fails, or parks at a choice point. Each call is one *run*:
//!
//! ```text
//!            ┌──────────── exit code routed / chain started ───────────┐
//!            ▼                                                         │
//!  start ─► Running ── manager step ──┬── no next link ──► Completed   │
//!                                     ├── failure ────────► Failed      │
//!                                     ├── no answer ──────► AwaitingDecision
//!                                     └─────────────────────────────────┘
//! ```
//!
//! Parking does not block: the unit moves into the pending-choice registry
//! and the run returns. A later decision resumes at the parked link on the
//! caller's task.

use core::time::Duration;
use std::sync::Arc;
use std::time::Instant;

use conduit_core::EngineConfig;
use conduit_workflow::{ChainId, ExitCode, JobStatus, Link, LinkConfig, LinkId, Workflow};
use tracing::Instrument;

use crate::availability::ChoiceAvailability;
use crate::backend::ExecutionBackend;
use crate::error::{ChainError, FailureReason};
use crate::hooks::{ChainEvent, ChainHooks};
use crate::jobs::{Job, JobStore};
use crate::manager::{
    ChainChoiceManager, ChoiceManager, PendingChoice, ReplacementChoiceManager, Resume, Step, task,
    variables,
};
use crate::pending::{PendingChoices, PendingKey};
use crate::preconfigured::ChoiceResolver;
use crate::unit::Unit;

// ─────────────────────────────────────────────────────────────────────────────
// Results
// ─────────────────────────────────────────────────────────────────────────────

/// State of a unit's chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainState {
    /// Links are executing.
    Running,
    /// Parked until an operator decides.
    AwaitingDecision,
    /// The chain ended normally.
    Completed,
    /// The chain ended in failure.
    Failed,
}

/// How a run ended.
#[derive(Debug)]
pub enum ChainOutcome {
    /// The chain completed; the unit is handed back.
    Completed(Unit),
    /// The unit is parked under this key.
    AwaitingDecision(PendingKey),
    /// The chain failed; the unit is handed back.
    Failed {
        /// The unit.
        unit: Unit,
        /// The link where the chain failed.
        link_id: LinkId,
        /// Why.
        reason: FailureReason,
    },
}

/// Result of one driver run.
#[derive(Debug)]
pub struct ChainResult {
    /// How the run ended.
    pub outcome: ChainOutcome,
    /// Links executed during this run.
    pub links_executed: usize,
    /// Duration of this run.
    pub duration: Duration,
}

impl ChainResult {
    /// The state the run ended in.
    #[must_use]
    pub fn state(&self) -> ChainState {
        match self.outcome {
            ChainOutcome::Completed(_) => ChainState::Completed,
            ChainOutcome::AwaitingDecision(_) => ChainState::AwaitingDecision,
            ChainOutcome::Failed { .. } => ChainState::Failed,
        }
    }

    /// The pending key if the unit was parked.
    #[must_use]
    pub fn pending_key(&self) -> Option<&PendingKey> {
        match &self.outcome {
            ChainOutcome::AwaitingDecision(key) => Some(key),
            _ => None,
        }
    }

    /// The unit if the run ended with it in hand.
    #[must_use]
    pub fn unit(&self) -> Option<&Unit> {
        match &self.outcome {
            ChainOutcome::Completed(unit) | ChainOutcome::Failed { unit, .. } => Some(unit),
            ChainOutcome::AwaitingDecision(_) => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Driver
// ─────────────────────────────────────────────────────────────────────────────

/// Where a run begins.
enum Cursor {
    /// Execute this link.
    Link(LinkId),
    /// Route an exit code from a job that already ran.
    Exit { job: Job, code: ExitCode },
}

/// Advances units through the workflow.
pub struct ChainDriver {
    workflow: Arc<Workflow>,
    config: Arc<EngineConfig>,
    backend: Arc<dyn ExecutionBackend>,
    availability: Arc<dyn ChoiceAvailability>,
    job_store: Arc<dyn JobStore>,
    hooks: Arc<ChainHooks>,
    pending: Arc<PendingChoices>,
    resolver: ChoiceResolver,
}

impl ChainDriver {
    pub(crate) fn new(
        workflow: Arc<Workflow>,
        config: Arc<EngineConfig>,
        backend: Arc<dyn ExecutionBackend>,
        availability: Arc<dyn ChoiceAvailability>,
        job_store: Arc<dyn JobStore>,
        hooks: Arc<ChainHooks>,
        pending: Arc<PendingChoices>,
        resolver: ChoiceResolver,
    ) -> Self {
        Self {
            workflow,
            config,
            backend,
            availability,
            job_store,
            hooks,
            pending,
            resolver,
        }
    }

    /// Runs `unit` from the first link of `chain_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Workflow`] if the chain does not exist and
    /// [`ChainError::DuplicateRegistration`] if the unit parks at a key that
    /// is already taken.
    pub async fn start(&self, unit: Unit, chain_id: &ChainId) -> Result<ChainResult, ChainError> {
        let chain = self.workflow.get_chain(chain_id)?;
        let span = tracing::info_span!("chain_run", unit = %unit.id(), chain = %chain.id);
        self.hooks.emit(&ChainEvent::ChainStart {
            unit_id: unit.id(),
            chain_id: chain.id.clone(),
        });
        self.drive(unit, chain.id.clone(), Cursor::Link(chain.link_id.clone()))
            .instrument(span)
            .await
    }

    /// Continues a unit after its decision was applied.
    pub(crate) async fn resume(
        &self,
        unit: Unit,
        job: Job,
        resume: Resume,
    ) -> Result<ChainResult, ChainError> {
        match resume {
            Resume::StartChain(chain_id) => {
                self.set_status(&job, JobStatus::CompletedSuccessfully).await;
                self.start(unit, &chain_id).await
            }
            Resume::Exit(code) => {
                let chain_id = job.chain_id.clone();
                let span = tracing::info_span!("chain_run", unit = %unit.id(), chain = %chain_id);
                self.drive(unit, chain_id, Cursor::Exit { job, code })
                    .instrument(span)
                    .await
            }
        }
    }

    async fn drive(
        &self,
        mut unit: Unit,
        mut chain_id: ChainId,
        cursor: Cursor,
    ) -> Result<ChainResult, ChainError> {
        let started = Instant::now();
        let mut links_executed = 0;

        let mut current = match cursor {
            Cursor::Link(link_id) => link_id,
            Cursor::Exit { job, code } => {
                let link = match self.workflow.get_link(&job.link_id) {
                    Ok(link) => link,
                    Err(err) => {
                        return Ok(self.fail(unit, job.link_id, err.into(), 0, started));
                    }
                };
                match self.route(&job, link, code).await {
                    Ok(Some(next)) => next,
                    Ok(None) => return Ok(self.complete(unit, 0, started)),
                    Err(reason) => return Ok(self.fail(unit, job.link_id, reason, 0, started)),
                }
            }
        };

        loop {
            if let Some(limit) = self.config.max_links_per_run
                && links_executed >= limit
            {
                let reason = FailureReason::LinkLimitExceeded {
                    chain: chain_id,
                    limit,
                };
                return Ok(self.fail(unit, current, reason, links_executed, started));
            }

            let link = match self.workflow.get_link(&current) {
                Ok(link) => link,
                Err(err) => {
                    return Ok(self.fail(unit, current, err.into(), links_executed, started));
                }
            };
            links_executed += 1;

            let job = Job::new(unit.id(), link.id.clone(), chain_id.clone());
            self.record(&job).await;
            tracing::debug!(
                link = %link.id,
                manager = link.config.manager_name(),
                "executing link"
            );
            self.hooks.emit(&ChainEvent::LinkStart {
                unit_id: unit.id(),
                link_id: link.id.clone(),
                manager: link.config.manager_name(),
            });

            match self.run_link(&job, link, &mut unit).await {
                Step::Exit(code) => match self.route(&job, link, code).await {
                    Ok(Some(next)) => current = next,
                    Ok(None) => return Ok(self.complete(unit, links_executed, started)),
                    Err(reason) => {
                        return Ok(self.fail(unit, current, reason, links_executed, started));
                    }
                },
                Step::StartChain(next_chain) => {
                    self.finish_job(&job, &unit, JobStatus::CompletedSuccessfully)
                        .await;
                    let chain = match self.workflow.get_chain(&next_chain) {
                        Ok(chain) => chain,
                        Err(err) => {
                            let reason = err.into();
                            return Ok(self.fail(unit, current, reason, links_executed, started));
                        }
                    };
                    tracing::info!(chain = %chain.id, "starting chain");
                    self.hooks.emit(&ChainEvent::ChainStart {
                        unit_id: unit.id(),
                        chain_id: chain.id.clone(),
                    });
                    chain_id = chain.id.clone();
                    current = chain.link_id.clone();
                }
                Step::GoTo(next) => {
                    self.finish_job(&job, &unit, JobStatus::CompletedSuccessfully)
                        .await;
                    current = next;
                }
                Step::Complete => {
                    self.finish_job(&job, &unit, JobStatus::CompletedSuccessfully)
                        .await;
                    return Ok(self.complete(unit, links_executed, started));
                }
                Step::Park(manager) => {
                    let key = self.park(job, link, unit, manager).await?;
                    return Ok(ChainResult {
                        outcome: ChainOutcome::AwaitingDecision(key),
                        links_executed,
                        duration: started.elapsed(),
                    });
                }
                Step::Fail(reason) => {
                    self.finish_job(&job, &unit, JobStatus::Failed).await;
                    return Ok(self.fail(unit, current, reason, links_executed, started));
                }
            }
        }
    }

    /// Runs the manager for `link`.
    async fn run_link(&self, job: &Job, link: &Link, unit: &mut Unit) -> Step {
        match &link.config {
            LinkConfig::Task(config) => {
                let request = task::build_request(job, unit, link, config, &self.config);
                task::run(self.backend.as_ref(), request).await
            }
            LinkConfig::ChainChoice(config) => {
                let manager = ChainChoiceManager::new(
                    link,
                    config,
                    &self.workflow,
                    self.availability.as_ref(),
                );
                match self.resolver.chain_choice(unit, link).await {
                    Some(chain_id) => Step::StartChain(chain_id),
                    None => Step::Park(ChoiceManager::Chain(manager)),
                }
            }
            LinkConfig::ReplacementChoice(config) => {
                let manager = match ReplacementChoiceManager::new(link.id.clone(), config) {
                    Ok(manager) => manager,
                    Err(err) => return Step::Fail(err.into()),
                };
                if manager.choices().is_empty()
                    && let Some(dict) = self.resolver.stored_settings(link).await
                {
                    tracing::debug!(link = %link.id, "found stored settings, proceeding");
                    unit.merge_pass_var(&dict);
                    return Step::Exit(0);
                }
                if let Some(dict) = self.resolver.replacement_choice(unit, link).await {
                    unit.merge_pass_var(&dict);
                    return Step::Exit(0);
                }
                Step::Park(ChoiceManager::Replacement(manager))
            }
            LinkConfig::SetUnitVariable(config) => variables::set(unit, config),
            LinkConfig::UnitVariableLinkPull(config) => variables::pull(unit, config),
        }
    }

    /// Routes an exit code and records the route's job status.
    ///
    /// Returns the next link, `None` when the chain completes, or the reason
    /// the chain fails.
    async fn route(
        &self,
        job: &Job,
        link: &Link,
        code: ExitCode,
    ) -> Result<Option<LinkId>, FailureReason> {
        let route = link.route(code);
        self.set_status(job, route.job_status).await;
        self.hooks.emit(&ChainEvent::LinkComplete {
            unit_id: job.unit_id,
            link_id: link.id.clone(),
            job_status: route.job_status,
        });

        match route.link_id {
            Some(next) => Ok(Some(next)),
            None if route.job_status == JobStatus::Failed => Err(FailureReason::ExitRoute {
                link: link.id.clone(),
                code,
            }),
            None => Ok(None),
        }
    }

    /// Moves the unit into the registry.
    async fn park(
        &self,
        job: Job,
        link: &Link,
        unit: Unit,
        manager: ChoiceManager,
    ) -> Result<PendingKey, ChainError> {
        self.set_status(&job, JobStatus::AwaitingDecision).await;

        let key = PendingKey::new(link.id.clone(), unit.id());
        let choice_count = manager.choices().len();
        let parked_job = job.clone();
        let entry = PendingChoice::new(job, link.description.clone(), unit, manager);

        if let Err(err) = self.pending.register(key.clone(), entry) {
            tracing::error!(%key, error = %err, "unit parked twice at the same link");
            self.set_status(&parked_job, JobStatus::Failed).await;
            return Err(ChainError::DuplicateRegistration(key));
        }

        tracing::info!(%key, choice_count, "awaiting decision");
        self.hooks.emit(&ChainEvent::ChoiceParked {
            key: key.clone(),
            choice_count,
        });
        Ok(key)
    }

    async fn finish_job(&self, job: &Job, unit: &Unit, status: JobStatus) {
        self.set_status(job, status).await;
        self.hooks.emit(&ChainEvent::LinkComplete {
            unit_id: unit.id(),
            link_id: job.link_id.clone(),
            job_status: status,
        });
    }

    async fn record(&self, job: &Job) {
        if let Err(err) = self.job_store.record(job).await {
            tracing::warn!(job = %job.id, error = %err, "could not record job");
        }
    }

    pub(crate) async fn set_status(&self, job: &Job, status: JobStatus) {
        if let Err(err) = self.job_store.set_status(job, status).await {
            tracing::warn!(
                job = %job.id,
                status = status.label(),
                error = %err,
                "could not update job status"
            );
        }
    }

    fn complete(&self, unit: Unit, links_executed: usize, started: Instant) -> ChainResult {
        let duration = started.elapsed();
        tracing::info!(links_executed, ?duration, "chain completed");
        self.hooks.emit(&ChainEvent::ChainComplete {
            unit_id: unit.id(),
            links_executed,
            duration,
        });
        ChainResult {
            outcome: ChainOutcome::Completed(unit),
            links_executed,
            duration,
        }
    }

    fn fail(
        &self,
        unit: Unit,
        link_id: LinkId,
        reason: FailureReason,
        links_executed: usize,
        started: Instant,
    ) -> ChainResult {
        tracing::warn!(link = %link_id, error = %reason, "chain failed");
        self.hooks.emit(&ChainEvent::ChainFailed {
            unit_id: unit.id(),
            link_id: link_id.clone(),
            reason: reason.to_string(),
        });
        ChainResult {
            outcome: ChainOutcome::Failed {
                unit,
                link_id,
                reason,
            },
            links_executed,
            duration: started.elapsed(),
        }
    }
}
