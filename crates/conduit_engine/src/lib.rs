//! Execution engine for Conduit workflows.
//!
//! `conduit_engine` drives units through a [`Workflow`](conduit_workflow::Workflow)
//! and coordinates the decisions that need an operator:
//!
//! - [`engine`] - The [`Engine`] facade: start chains, answer decisions, list what is waiting
//! - [`chain`] - The driver that advances one unit link by link
//! - [`manager`] - One manager per link behavior
//! - [`pending`] - Registry of units parked at choice points
//! - [`preconfigured`] - Override documents and stored settings that answer choices automatically
//! - [`replacement`] - `%name%` substitution dictionaries
//! - [`unit`] - Units of work and their variables
//!
//! Collaborators sit behind traits so deployments can plug in their own:
//! [`ExecutionBackend`](backend::ExecutionBackend) runs tasks,
//! [`SettingsStore`](settings::SettingsStore) holds dashboard settings,
//! [`AgentDirectory`](agents::AgentDirectory) maps users to agents,
//! [`ChoiceAvailability`](availability::ChoiceAvailability) filters chains and
//! [`JobStore`](jobs::JobStore) records job history.
//!
//! # Parking
//!
//! A choice point with no automatic answer does not block a thread. The unit
//! moves into the registry and [`Engine::start_chain`] returns
//! [`ChainState::AwaitingDecision`](chain::ChainState::AwaitingDecision) with
//! the key to answer. [`Engine::submit_decision`] continues the chain on the
//! caller's task.

/// Operator-to-agent mapping.
pub mod agents;

/// Chain availability filters.
pub mod availability;

/// Task execution backends.
pub mod backend;

/// The chain driver.
pub mod chain;

/// The engine facade.
pub mod engine;

/// Error types.
pub mod error;

/// Lifecycle observers.
pub mod hooks;

/// Job records.
pub mod jobs;

/// Link task managers.
pub mod manager;

/// Pending-choice registry.
pub mod pending;

/// Automatic answers for choice points.
pub mod preconfigured;

/// Operator-facing views.
pub mod render;

/// Replacement dictionaries.
pub mod replacement;

/// Stored settings.
pub mod settings;

/// Units of work.
pub mod unit;

pub use engine::{Engine, EngineBuilder};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::agents::{AgentDirectory, InMemoryAgents, UserId};
    pub use crate::availability::{AllAvailable, CapabilityTable, ChoiceAvailability};
    pub use crate::backend::{ExecutionBackend, TaskRequest};
    pub use crate::chain::{ChainOutcome, ChainResult, ChainState};
    pub use crate::engine::{Engine, EngineBuilder};
    pub use crate::error::{BackendError, ChainError, DecisionError, FailureReason};
    pub use crate::hooks::{ChainEvent, ChainHooks};
    pub use crate::jobs::{Job, JobStore, MemoryJobStore, NullJobStore};
    pub use crate::manager::{Choice, PendingChoice, Selection};
    pub use crate::pending::{PendingChoices, PendingKey};
    pub use crate::preconfigured::{ProcessingConfig, PreconfiguredChoice};
    pub use crate::render::{ChoiceView, PendingChoiceView};
    pub use crate::replacement::ReplacementDict;
    pub use crate::settings::{InMemorySettings, SettingsStore};
    pub use crate::unit::{Unit, UnitId, UnitKind, UnitSnapshot};
}
