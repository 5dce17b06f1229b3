//! Task links: substitute variables into the arguments and hand the task to
//! the execution backend.

use conduit_core::EngineConfig;
use conduit_workflow::{Link, TaskConfig};

use super::Step;
use crate::backend::{ExecutionBackend, TaskRequest};
use crate::jobs::Job;
use crate::unit::Unit;

/// Builds the request for a task link.
#[must_use]
pub fn build_request(
    job: &Job,
    unit: &Unit,
    link: &Link,
    task: &TaskConfig,
    config: &EngineConfig,
) -> TaskRequest {
    let replacements = unit.replacement_dict(config);
    let arguments = task
        .arguments
        .as_deref()
        .map(|template| replacements.replace(template));

    TaskRequest {
        job_id: job.id,
        link_id: link.id.clone(),
        unit: unit.snapshot(),
        execute: task.execute.clone(),
        arguments,
        replacements,
    }
}

/// Runs a task link.
pub(crate) async fn run(backend: &dyn ExecutionBackend, request: TaskRequest) -> Step {
    let link_id = request.link_id.clone();
    match backend.execute(request).await {
        Ok(code) => {
            tracing::debug!(link = %link_id, code, "task exited");
            Step::Exit(code)
        }
        Err(err) => {
            tracing::error!(link = %link_id, error = %err, "task failed to execute");
            Step::Fail(err.into())
        }
    }
}
