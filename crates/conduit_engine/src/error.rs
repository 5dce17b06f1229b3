//! Error types for the engine.

use conduit_workflow::{ChainId, ExitCode, LinkId, WorkflowError};

use crate::agents::UserId;
use crate::pending::PendingKey;

/// Malformed replacement-dictionary input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplacementError {
    /// A variable name was empty.
    #[error("replacement variable name is empty")]
    EmptyKey,

    /// A variable name contained the `%` delimiter.
    #[error("replacement variable name `{0}` contains the `%` delimiter")]
    InvalidKey(String),
}

/// Errors from the pending-choice registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// An entry already exists for the key.
    #[error("a choice is already pending for {0}")]
    DuplicateRegistration(PendingKey),

    /// No entry exists for the key.
    #[error("no choice pending for {0}")]
    NotFound(PendingKey),
}

/// Errors returned to a decision submitter.
#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    /// No choice is pending for the key, or another submitter won the race.
    #[error("no choice pending for {0}")]
    NotFound(PendingKey),

    /// The selector does not name one of the offered choices.
    #[error("`{selector}` is not a valid choice for {key}")]
    InvalidChoice {
        /// The pending key.
        key: PendingKey,
        /// The rejected selector.
        selector: String,
    },

    /// The acting user has no agent record.
    #[error("no agent recorded for user {0}")]
    UnknownUser(UserId),

    /// The agent directory failed.
    #[error(transparent)]
    Agents(#[from] AgentLookupError),

    /// The chain could not continue after the choice was consumed.
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Errors that stop the driver without a unit to report.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// The starting chain does not exist.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// A unit was parked at a key that was already taken.
    #[error("a choice is already pending for {0}")]
    DuplicateRegistration(PendingKey),
}

/// Why a chain ended in failure. The unit is kept alongside the reason.
#[derive(Debug, thiserror::Error)]
pub enum FailureReason {
    /// The execution backend failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A link or chain referenced mid-run does not exist.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// A replacement item could not be turned into a dictionary.
    #[error(transparent)]
    Replacement(#[from] ReplacementError),

    /// The exit code routed nowhere with a failed status.
    #[error("link {link} exited with {code}")]
    ExitRoute {
        /// The link.
        link: LinkId,
        /// Its exit code.
        code: ExitCode,
    },

    /// The run executed more links than the configured budget.
    #[error("link budget of {limit} exhausted in chain {chain}")]
    LinkLimitExceeded {
        /// The chain running when the budget ran out.
        chain: ChainId,
        /// The budget.
        limit: usize,
    },
}

/// Execution backend failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("execution backend failed: {message}")]
pub struct BackendError {
    /// Description from the backend.
    pub message: String,
}

impl BackendError {
    /// Creates an error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Settings store failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("settings store failed for scope `{scope}`: {message}")]
pub struct SettingsError {
    /// Scope being read.
    pub scope: String,
    /// Description from the store.
    pub message: String,
}

/// Agent directory failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("agent lookup failed: {0}")]
pub struct AgentLookupError(pub String);

/// Job store failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("job store failed: {0}")]
pub struct JobStoreError(pub String);

/// Override document could not be read or parsed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigParseError {
    /// The file exists but could not be read.
    #[error("could not read override document: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not well-formed XML.
    #[error("malformed override document: {0}")]
    Xml(String),

    /// A `preconfiguredChoice` element lacks a required child.
    #[error("preconfiguredChoice without `{0}`")]
    MissingField(&'static str),
}

/// Pending-choice rendering failed.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// XML writer failure.
    #[error("xml rendering failed: {0}")]
    Xml(String),

    /// The writer produced invalid UTF-8.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Observer registration failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookRegistrationError {
    /// An observer with this name is already registered.
    #[error("observer '{0}' already registered")]
    DuplicateName(String),
}
