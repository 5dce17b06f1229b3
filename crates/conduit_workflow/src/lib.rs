//! Workflow graph model for Conduit.
//!
//! `conduit_workflow` describes the processing graph a unit travels through:
//! chains name entry points, links carry behavior and exit-code routing.
//!
//! # Core Concepts
//!
//! - [`Workflow`] - Immutable graph with lookup, validation and JSON loading
//! - [`Chain`] - Named entry point into the graph
//! - [`Link`] - Node with a [`LinkConfig`] behavior and an exit-code table
//! - [`ExitRoute`] - Next link and job status for one exit code
//!
//! The graph holds no runtime state. Execution lives in `conduit_engine`.

/// Chains and their starting links.
pub mod chain;

/// Lookup and validation errors.
pub mod error;

/// Chain and link identifiers.
pub mod id;

/// Links, behaviors and routing.
pub mod link;

/// The graph and its builder.
pub mod workflow;

pub use chain::Chain;
pub use error::{ValidationError, WorkflowError};
pub use id::{ChainId, LinkId};
pub use link::{
    ChainChoiceConfig, ExitCode, ExitRoute, JobStatus, Link, LinkConfig, ReplacementChoiceConfig,
    ReplacementItem, SetUnitVariableConfig, TaskConfig, UnitVariableLinkPullConfig,
};
pub use workflow::{Workflow, WorkflowBuilder};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::chain::Chain;
    pub use crate::error::{ValidationError, WorkflowError};
    pub use crate::id::{ChainId, LinkId};
    pub use crate::link::{ExitCode, ExitRoute, JobStatus, Link, LinkConfig, ReplacementItem};
    pub use crate::workflow::{Workflow, WorkflowBuilder};
}
