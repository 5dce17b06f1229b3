//! Link task managers.
//!
//! Every link behavior has a manager. Plain behaviors ([`task`],
//! [`variables`]) run to completion and report a [`Step`]. Choice points
//! ([`chain_choice`], [`replacement_choice`]) either resolve automatically or
//! become a [`PendingChoice`] that owns the unit until an operator answers.

/// Chain-choice links.
pub mod chain_choice;

/// Replacement-dictionary choice links.
pub mod replacement_choice;

/// Task links.
pub mod task;

/// Unit-variable links.
pub mod variables;

use conduit_workflow::{ChainId, ExitCode, LinkId};
use serde::Serialize;

use crate::agents::ACTIVE_AGENT_VARIABLE;
use crate::error::FailureReason;
use crate::jobs::Job;
use crate::pending::PendingKey;
use crate::render::{ChoiceView, PendingChoiceView};
use crate::replacement::ReplacementDict;
use crate::unit::Unit;

pub use chain_choice::ChainChoiceManager;
pub use replacement_choice::ReplacementChoiceManager;

// ─────────────────────────────────────────────────────────────────────────────
// Step
// ─────────────────────────────────────────────────────────────────────────────

/// What the driver does after a manager runs.
#[derive(Debug)]
pub(crate) enum Step {
    /// Route the exit code through the link's exit table.
    Exit(ExitCode),
    /// Start a chain at its first link.
    StartChain(ChainId),
    /// Continue at a link.
    GoTo(LinkId),
    /// The chain ends successfully here.
    Complete,
    /// Park the unit until an operator answers.
    Park(ChoiceManager),
    /// The chain fails here.
    Fail(FailureReason),
}

// ─────────────────────────────────────────────────────────────────────────────
// Choices
// ─────────────────────────────────────────────────────────────────────────────

/// One option offered at a choice point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    /// Identifier the operator submits: a chain id or an item index.
    pub id: String,
    /// Description shown to the operator.
    pub description: String,
    /// Variables applied when the option is chosen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacements: Option<ReplacementDict>,
}

/// A validated operator selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Start this chain.
    Chain(ChainId),
    /// Apply the replacement item at this index.
    Replacement(usize),
}

/// Where the driver picks up after a decision is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Resume {
    /// Start a chain.
    StartChain(ChainId),
    /// Route an exit code from the choice link.
    Exit(ExitCode),
}

/// A choice-point manager for one unit.
#[derive(Debug, Clone)]
pub enum ChoiceManager {
    /// Pick the next chain.
    Chain(ChainChoiceManager),
    /// Pick a set of variables.
    Replacement(ReplacementChoiceManager),
}

impl ChoiceManager {
    /// The options offered.
    #[must_use]
    pub fn choices(&self) -> &[Choice] {
        match self {
            ChoiceManager::Chain(manager) => manager.choices(),
            ChoiceManager::Replacement(manager) => manager.choices(),
        }
    }

    /// Checks an operator selector against the options offered.
    #[must_use]
    pub fn validate(&self, selector: &str) -> Option<Selection> {
        match self {
            ChoiceManager::Chain(manager) => manager.validate(selector).map(Selection::Chain),
            ChoiceManager::Replacement(manager) => {
                manager.validate(selector).map(Selection::Replacement)
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PendingChoice
// ─────────────────────────────────────────────────────────────────────────────

/// A unit parked at a choice point, with the options it was offered.
#[derive(Debug)]
pub struct PendingChoice {
    job: Job,
    link_description: String,
    unit: Unit,
    manager: ChoiceManager,
}

impl PendingChoice {
    pub(crate) fn new(
        job: Job,
        link_description: String,
        unit: Unit,
        manager: ChoiceManager,
    ) -> Self {
        Self {
            job,
            link_description,
            unit,
            manager,
        }
    }

    /// The job that parked.
    #[must_use]
    pub fn job(&self) -> &Job {
        &self.job
    }

    /// The parked unit.
    #[must_use]
    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    /// The options offered.
    #[must_use]
    pub fn choices(&self) -> &[Choice] {
        self.manager.choices()
    }

    /// Checks an operator selector against the options offered.
    #[must_use]
    pub fn validate(&self, selector: &str) -> Option<Selection> {
        self.manager.validate(selector)
    }

    /// Gives the unit back without applying a decision.
    #[must_use]
    pub fn into_unit(self) -> Unit {
        self.unit
    }

    /// Builds the read-only rendering.
    #[must_use]
    pub fn view(&self, key: &PendingKey) -> PendingChoiceView {
        PendingChoiceView {
            key: key.clone(),
            job_id: self.job.id,
            link_id: self.job.link_id.clone(),
            link_description: self.link_description.clone(),
            chain_id: self.job.chain_id.clone(),
            unit: self.unit.snapshot(),
            choices: self
                .choices()
                .iter()
                .map(|choice| ChoiceView {
                    id: choice.id.clone(),
                    description: choice.description.clone(),
                })
                .collect(),
        }
    }

    /// Applies a validated selection and returns the unit with where to
    /// continue. `agent` is recorded as the unit's active agent.
    pub(crate) fn proceed(
        self,
        selection: &Selection,
        agent: Option<String>,
    ) -> (Job, Unit, Resume) {
        let Self {
            job,
            mut unit,
            manager,
            ..
        } = self;

        if let Some(agent) = agent {
            unit.set_variable(ACTIVE_AGENT_VARIABLE, Some(agent), None);
        }

        let resume = match selection {
            Selection::Chain(chain_id) => Resume::StartChain(chain_id.clone()),
            Selection::Replacement(index) => {
                if let ChoiceManager::Replacement(manager) = &manager
                    && let Some(dict) = manager.replacements(*index)
                {
                    unit.merge_pass_var(dict);
                }
                Resume::Exit(0)
            }
        };

        (job, unit, resume)
    }
}
