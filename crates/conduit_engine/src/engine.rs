//! The engine facade.
//!
//! [`Engine`] owns the workflow, the collaborators and the pending-choice
//! registry. It is cheap to clone; clones share everything, so an operator
//! front end and the unit schedulers can each hold one.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use conduit_engine::backend::{ExecutionBackend, TaskRequest};
//! use conduit_engine::error::BackendError;
//! use conduit_engine::unit::{Unit, UnitKind};
//! use conduit_engine::chain::ChainState;
//! use conduit_engine::Engine;
//! use conduit_workflow::{Chain, ExitCode, ExitRoute, JobStatus, Link, Workflow};
//!
//! struct Succeed;
//!
//! #[async_trait]
//! impl ExecutionBackend for Succeed {
//!     async fn execute(&self, _request: TaskRequest) -> Result<ExitCode, BackendError> {
//!         Ok(0)
//!     }
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let workflow = Workflow::builder()
//!     .chain(Chain::new("ingest", "Ingest", "approve"))
//!     .chain(Chain::new("store", "Store", "store_aip"))
//!     .link(Link::chain_choice("approve", ["store"]))
//!     .link(
//!         Link::task("store_aip", "store")
//!             .with_exit_code(0, ExitRoute::end(JobStatus::CompletedSuccessfully)),
//!     )
//!     .build();
//!
//! let engine = Engine::builder(workflow, Arc::new(Succeed)).build();
//! let unit = Unit::new(UnitKind::Sip, "book", "/var/sips/book/");
//!
//! let parked = engine.start_chain(unit, &"ingest".into()).await?;
//! let key = parked.pending_key().cloned().expect("no override document");
//!
//! let finished = engine.submit_decision(&key, "store", None).await?;
//! assert_eq!(finished.state(), ChainState::Completed);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use conduit_core::EngineConfig;
use conduit_workflow::{ChainId, Workflow};

use crate::agents::{AgentDirectory, InMemoryAgents, UserId};
use crate::availability::{AllAvailable, ChoiceAvailability};
use crate::backend::ExecutionBackend;
use crate::chain::{ChainDriver, ChainResult};
use crate::error::{ChainError, DecisionError, RegistryError, RenderError};
use crate::hooks::{ChainEvent, ChainHooks};
use crate::jobs::{JobStore, NullJobStore};
use crate::manager::Selection;
use crate::pending::{PendingChoices, PendingKey};
use crate::preconfigured::ChoiceResolver;
use crate::render::{PendingChoiceView, render_listing};
use crate::settings::{InMemorySettings, SettingsStore};
use crate::unit::Unit;

// ─────────────────────────────────────────────────────────────────────────────
// EngineBuilder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for [`Engine`].
///
/// Only the workflow and execution backend are required. The defaults are
/// an empty settings store, an agent directory with no users, availability
/// of every chain, a job store that discards records and a fresh hook
/// registry.
pub struct EngineBuilder {
    workflow: Arc<Workflow>,
    backend: Arc<dyn ExecutionBackend>,
    config: EngineConfig,
    settings: Arc<dyn SettingsStore>,
    agents: Arc<dyn AgentDirectory>,
    availability: Arc<dyn ChoiceAvailability>,
    job_store: Arc<dyn JobStore>,
    hooks: Arc<ChainHooks>,
}

impl EngineBuilder {
    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the settings store.
    #[must_use]
    pub fn with_settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the agent directory.
    #[must_use]
    pub fn with_agents(mut self, agents: Arc<dyn AgentDirectory>) -> Self {
        self.agents = agents;
        self
    }

    /// Sets the chain availability filter.
    #[must_use]
    pub fn with_availability(mut self, availability: Arc<dyn ChoiceAvailability>) -> Self {
        self.availability = availability;
        self
    }

    /// Sets the job store.
    #[must_use]
    pub fn with_job_store(mut self, job_store: Arc<dyn JobStore>) -> Self {
        self.job_store = job_store;
        self
    }

    /// Shares an existing hook registry.
    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<ChainHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Builds the engine with an empty pending-choice registry.
    #[must_use]
    pub fn build(self) -> Engine {
        let config = Arc::new(self.config);
        let pending = Arc::new(PendingChoices::new());
        let resolver = ChoiceResolver::new(
            Arc::clone(&self.workflow),
            Arc::clone(&config),
            self.settings,
        );
        let driver = ChainDriver::new(
            Arc::clone(&self.workflow),
            Arc::clone(&config),
            self.backend,
            self.availability,
            self.job_store,
            Arc::clone(&self.hooks),
            Arc::clone(&pending),
            resolver,
        );

        Engine {
            inner: Arc::new(EngineInner {
                workflow: self.workflow,
                config,
                agents: self.agents,
                hooks: self.hooks,
                pending,
                driver,
            }),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

struct EngineInner {
    workflow: Arc<Workflow>,
    config: Arc<EngineConfig>,
    agents: Arc<dyn AgentDirectory>,
    hooks: Arc<ChainHooks>,
    pending: Arc<PendingChoices>,
    driver: ChainDriver,
}

/// Runs units through a workflow and coordinates operator decisions.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Starts building an engine.
    #[must_use]
    pub fn builder(workflow: Workflow, backend: Arc<dyn ExecutionBackend>) -> EngineBuilder {
        EngineBuilder {
            workflow: Arc::new(workflow),
            backend,
            config: EngineConfig::default(),
            settings: Arc::new(InMemorySettings::new()),
            agents: Arc::new(InMemoryAgents::new()),
            availability: Arc::new(AllAvailable),
            job_store: Arc::new(NullJobStore),
            hooks: Arc::new(ChainHooks::new()),
        }
    }

    /// The workflow.
    #[must_use]
    pub fn workflow(&self) -> &Workflow {
        &self.inner.workflow
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// The hook registry. Observers may be added at any time.
    #[must_use]
    pub fn hooks(&self) -> &ChainHooks {
        &self.inner.hooks
    }

    /// The pending-choice registry.
    #[must_use]
    pub fn pending(&self) -> &PendingChoices {
        &self.inner.pending
    }

    /// Runs `unit` from the first link of `chain_id` until it completes,
    /// fails or parks.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] if the chain does not exist or the unit parks
    /// at a key that is already taken.
    pub async fn start_chain(
        &self,
        unit: Unit,
        chain_id: &ChainId,
    ) -> Result<ChainResult, ChainError> {
        self.inner.driver.start(unit, chain_id).await
    }

    /// Answers a parked decision and continues the unit's chain on the
    /// caller's task.
    ///
    /// `selector` is a chain id for chain choices and an item index for
    /// replacement-dictionary choices. When `acting_user` is given, their
    /// agent is recorded on the unit as `activeAgent`.
    ///
    /// Rejected submissions leave the entry parked. Of concurrent
    /// submissions for the same key, exactly one proceeds and the others get
    /// [`DecisionError::NotFound`].
    ///
    /// # Errors
    ///
    /// - [`DecisionError::NotFound`] if nothing is parked under `key`
    /// - [`DecisionError::InvalidChoice`] if `selector` was not offered
    /// - [`DecisionError::UnknownUser`] if `acting_user` has no agent
    /// - [`DecisionError::Agents`] if the agent lookup failed
    /// - [`DecisionError::Chain`] if the chain could not continue
    pub async fn submit_decision(
        &self,
        key: &PendingKey,
        selector: &str,
        acting_user: Option<UserId>,
    ) -> Result<ChainResult, DecisionError> {
        let (selection, job_id) = self
            .inner
            .pending
            .with_entry(key, |entry| (entry.validate(selector), entry.job().id))
            .map_err(not_found)?;
        let Some(selection) = selection else {
            return Err(DecisionError::InvalidChoice {
                key: key.clone(),
                selector: selector.to_owned(),
            });
        };

        let agent = match acting_user {
            Some(user) => Some(
                self.inner
                    .agents
                    .agent_for_user(user)
                    .await?
                    .ok_or(DecisionError::UnknownUser(user))?,
            ),
            None => None,
        };

        // The entry may have been consumed, or replaced by a later parking
        // of the same unit, while the agent lookup was in flight.
        let entry = self
            .inner
            .pending
            .take_if(key, |entry| entry.job().id == job_id)
            .map_err(not_found)?
            .ok_or_else(|| DecisionError::NotFound(key.clone()))?;

        tracing::info!(%key, selector, agent = ?agent, "decision accepted");
        self.inner.hooks.emit(&ChainEvent::ChoiceResolved {
            key: key.clone(),
            selector: selector.to_owned(),
            agent: agent.clone(),
        });

        let (job, unit, resume) = entry.proceed(&selection, agent);
        if let Selection::Chain(chain) = &selection {
            tracing::info!(%key, chain = %chain, "using user selected chain");
        }
        Ok(self.inner.driver.resume(unit, job, resume).await?)
    }

    /// Returns a view of one parked decision.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if nothing is parked under `key`.
    pub fn lookup(&self, key: &PendingKey) -> Result<PendingChoiceView, RegistryError> {
        self.inner.pending.lookup(key)
    }

    /// Returns views of every parked decision in registration order.
    #[must_use]
    pub fn list_pending(&self) -> Vec<PendingChoiceView> {
        self.inner.pending.views()
    }

    /// Renders every parked decision as a `choicesAvailableForUnits` XML
    /// document.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if writing fails.
    pub fn render_pending_xml(&self) -> Result<String, RenderError> {
        render_listing(&self.list_pending())
    }

    /// Empties the registry and returns the parked units in registration
    /// order. Later submissions get [`DecisionError::NotFound`].
    pub fn shutdown(&self) -> Vec<Unit> {
        let drained = self.inner.pending.drain();
        tracing::info!(parked = drained.len(), "engine shutting down");
        drained
            .into_iter()
            .map(|(_, entry)| entry.into_unit())
            .collect()
    }
}

fn not_found(err: RegistryError) -> DecisionError {
    match err {
        RegistryError::NotFound(key) | RegistryError::DuplicateRegistration(key) => {
            DecisionError::NotFound(key)
        }
    }
}
