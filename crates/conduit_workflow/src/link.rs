//! Links: the nodes of a workflow graph.
//!
//! A [`Link`] couples a behavior ([`LinkConfig`]) with the routing table used
//! to pick the next link once the behavior reports an exit code.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::id::{ChainId, LinkId};

/// Process exit code reported for a link.
pub type ExitCode = i32;

/// Status recorded for one execution of a link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// No status recorded yet.
    #[default]
    Unknown,
    /// The link is running.
    Executing,
    /// The link is parked waiting for an operator decision.
    AwaitingDecision,
    /// The link finished and the unit moved on.
    CompletedSuccessfully,
    /// The link failed.
    Failed,
}

impl JobStatus {
    /// Returns a short human-readable label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Unknown => "unknown",
            JobStatus::Executing => "executing",
            JobStatus::AwaitingDecision => "awaiting decision",
            JobStatus::CompletedSuccessfully => "completed successfully",
            JobStatus::Failed => "failed",
        }
    }
}

/// Where a unit goes after a link exits with a given code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitRoute {
    /// Next link, or `None` when the chain ends here.
    #[serde(default)]
    pub link_id: Option<LinkId>,
    /// Status recorded for the job that produced the exit code.
    #[serde(default)]
    pub job_status: JobStatus,
}

impl ExitRoute {
    /// Route to `link_id` with a successful status.
    #[must_use]
    pub fn to(link_id: impl Into<LinkId>) -> Self {
        Self {
            link_id: Some(link_id.into()),
            job_status: JobStatus::CompletedSuccessfully,
        }
    }

    /// Terminal route with the given status.
    #[must_use]
    pub fn end(job_status: JobStatus) -> Self {
        Self {
            link_id: None,
            job_status,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Behavior configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration of a plain task link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Command key understood by the execution backend.
    ///
    /// When this link is used as the fallback of a replacement-dictionary
    /// choice, the key doubles as the settings-store scope.
    #[serde(default)]
    pub execute: String,
    /// Argument template; `%name%` variables are substituted before execution.
    #[serde(default)]
    pub arguments: Option<String>,
}

/// Configuration of a link that lets the operator pick the next chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainChoiceConfig {
    /// Candidate chains, in presentation order.
    #[serde(default)]
    pub chain_choices: Vec<ChainId>,
}

/// One selectable set of variables on a replacement-dictionary link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementItem {
    /// Stable identifier, referenced by override documents.
    pub id: String,
    /// Description shown to operators.
    #[serde(default)]
    pub description: String,
    /// Raw variable names (not yet wrapped in `%`) to values.
    #[serde(default)]
    pub items: IndexMap<String, String>,
}

/// Configuration of a link that lets the operator pick a set of variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementChoiceConfig {
    /// Selectable variable sets, in presentation order.
    #[serde(default)]
    pub replacements: Vec<ReplacementItem>,
}

/// Configuration of a link that stores a unit variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetUnitVariableConfig {
    /// Variable name.
    pub variable: String,
    /// Value to store.
    #[serde(default)]
    pub variable_value: Option<String>,
    /// Link to store alongside the value, read back by a link pull.
    #[serde(default)]
    pub link_id: Option<LinkId>,
}

/// Configuration of a link that jumps to the link stored in a unit variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitVariableLinkPullConfig {
    /// Variable name.
    pub variable: String,
    /// Link used when the variable is missing or names no link.
    #[serde(default)]
    pub default_link_id: Option<LinkId>,
}

/// Behavior of a link, selected by the `manager` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "manager", rename_all = "snake_case")]
pub enum LinkConfig {
    /// Run a task through the execution backend.
    Task(TaskConfig),
    /// Pick the next chain.
    ChainChoice(ChainChoiceConfig),
    /// Pick a set of substitution variables and continue.
    ReplacementChoice(ReplacementChoiceConfig),
    /// Store a unit variable and continue.
    SetUnitVariable(SetUnitVariableConfig),
    /// Jump to the link named by a unit variable.
    UnitVariableLinkPull(UnitVariableLinkPullConfig),
}

impl LinkConfig {
    /// Returns the name of the manager that handles this behavior.
    #[must_use]
    pub fn manager_name(&self) -> &'static str {
        match self {
            LinkConfig::Task(_) => "task",
            LinkConfig::ChainChoice(_) => "chain_choice",
            LinkConfig::ReplacementChoice(_) => "replacement_choice",
            LinkConfig::SetUnitVariable(_) => "set_unit_variable",
            LinkConfig::UnitVariableLinkPull(_) => "unit_variable_link_pull",
        }
    }

    /// Returns true if the behavior can park a unit for an operator decision.
    #[must_use]
    pub fn is_choice_point(&self) -> bool {
        matches!(
            self,
            LinkConfig::ChainChoice(_) | LinkConfig::ReplacementChoice(_)
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Link
// ─────────────────────────────────────────────────────────────────────────────

/// A node of the workflow graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Unique identifier.
    pub id: LinkId,
    /// Description shown to operators and in logs.
    pub description: String,
    /// Microservice group the link belongs to, for display.
    pub group: Option<String>,
    /// Behavior of the link.
    pub config: LinkConfig,
    /// Routes for known exit codes.
    pub exit_codes: BTreeMap<ExitCode, ExitRoute>,
    /// Next link for exit codes missing from `exit_codes`.
    pub fallback_link_id: Option<LinkId>,
    /// Status recorded for exit codes missing from `exit_codes`.
    pub fallback_job_status: JobStatus,
}

impl Link {
    /// Creates a link with no routes. Unmapped exit codes fail the job.
    #[must_use]
    pub fn new(id: impl Into<LinkId>, config: LinkConfig) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            group: None,
            config,
            exit_codes: BTreeMap::new(),
            fallback_link_id: None,
            fallback_job_status: JobStatus::Failed,
        }
    }

    /// Creates a task link running `execute`.
    #[must_use]
    pub fn task(id: impl Into<LinkId>, execute: impl Into<String>) -> Self {
        Self::new(
            id,
            LinkConfig::Task(TaskConfig {
                execute: execute.into(),
                arguments: None,
            }),
        )
    }

    /// Creates a chain-choice link offering `choices`.
    #[must_use]
    pub fn chain_choice<I, C>(id: impl Into<LinkId>, choices: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ChainId>,
    {
        Self::new(
            id,
            LinkConfig::ChainChoice(ChainChoiceConfig {
                chain_choices: choices.into_iter().map(Into::into).collect(),
            }),
        )
    }

    /// Creates a replacement-dictionary choice link offering `replacements`.
    #[must_use]
    pub fn replacement_choice(
        id: impl Into<LinkId>,
        replacements: Vec<ReplacementItem>,
    ) -> Self {
        Self::new(
            id,
            LinkConfig::ReplacementChoice(ReplacementChoiceConfig { replacements }),
        )
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the microservice group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Sets the argument template of a task link. No-op for other behaviors.
    #[must_use]
    pub fn with_arguments(mut self, arguments: impl Into<String>) -> Self {
        if let LinkConfig::Task(task) = &mut self.config {
            task.arguments = Some(arguments.into());
        }
        self
    }

    /// Adds a route for `code`.
    #[must_use]
    pub fn with_exit_code(mut self, code: ExitCode, route: ExitRoute) -> Self {
        self.exit_codes.insert(code, route);
        self
    }

    /// Shorthand for a successful route from `code` to `next`.
    #[must_use]
    pub fn on_exit(self, code: ExitCode, next: impl Into<LinkId>) -> Self {
        self.with_exit_code(code, ExitRoute::to(next))
    }

    /// Sets the route used for unmapped exit codes.
    #[must_use]
    pub fn with_fallback(mut self, link_id: Option<LinkId>, job_status: JobStatus) -> Self {
        self.fallback_link_id = link_id;
        self.fallback_job_status = job_status;
        self
    }

    /// Resolves the route for an exit code, falling back when it is unmapped.
    #[must_use]
    pub fn route(&self, code: ExitCode) -> ExitRoute {
        self.exit_codes.get(&code).cloned().unwrap_or_else(|| ExitRoute {
            link_id: self.fallback_link_id.clone(),
            job_status: self.fallback_job_status,
        })
    }

    /// Returns every link id this link can route to.
    pub fn successors(&self) -> impl Iterator<Item = &LinkId> {
        self.exit_codes
            .values()
            .filter_map(|route| route.link_id.as_ref())
            .chain(self.fallback_link_id.iter())
    }
}
