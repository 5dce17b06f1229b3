//! The execution backend seam.
//!
//! Task links hand a [`TaskRequest`] to an [`ExecutionBackend`] and route on
//! the exit code it reports. Non-zero codes are ordinary data; only an
//! `Err` fails the chain.

use async_trait::async_trait;
use conduit_workflow::{ExitCode, LinkId};
use serde::Serialize;
use uuid::Uuid;

use crate::error::BackendError;
use crate::replacement::ReplacementDict;
use crate::unit::UnitSnapshot;

/// Everything a backend needs to run one task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRequest {
    /// Job being executed.
    pub job_id: Uuid,
    /// Link being executed.
    pub link_id: LinkId,
    /// The unit at execution time.
    pub unit: UnitSnapshot,
    /// Command key from the link configuration.
    pub execute: String,
    /// Arguments with every variable substituted.
    pub arguments: Option<String>,
    /// The dictionary used for substitution.
    pub replacements: ReplacementDict,
}

/// Runs tasks.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Executes a task and returns its exit code.
    async fn execute(&self, request: TaskRequest) -> Result<ExitCode, BackendError>;
}
