//! Job records.
//!
//! Each execution of a link for a unit is a [`Job`]. The driver reports jobs
//! and their status changes to a [`JobStore`]; store failures are logged and
//! never stop a chain.

use async_trait::async_trait;
use conduit_workflow::{ChainId, JobStatus, LinkId};
use hashbrown::HashMap;
use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use crate::error::JobStoreError;
use crate::unit::UnitId;

/// One execution of one link for one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    /// Identifier.
    pub id: Uuid,
    /// The unit.
    pub unit_id: UnitId,
    /// The link executed.
    pub link_id: LinkId,
    /// The chain the link was reached through.
    pub chain_id: ChainId,
}

impl Job {
    /// Creates a job with a fresh identifier.
    #[must_use]
    pub fn new(unit_id: UnitId, link_id: LinkId, chain_id: ChainId) -> Self {
        Self {
            id: Uuid::new_v4(),
            unit_id,
            link_id,
            chain_id,
        }
    }
}

/// Persistence for job history.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Records a new job.
    async fn record(&self, job: &Job) -> Result<(), JobStoreError>;

    /// Updates the status of a recorded job.
    async fn set_status(&self, job: &Job, status: JobStatus) -> Result<(), JobStoreError>;
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullJobStore;

#[async_trait]
impl JobStore for NullJobStore {
    async fn record(&self, _job: &Job) -> Result<(), JobStoreError> {
        Ok(())
    }

    async fn set_status(&self, _job: &Job, _status: JobStatus) -> Result<(), JobStoreError> {
        Ok(())
    }
}

/// Keeps jobs and their status history in memory.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: Mutex<Vec<Job>>,
    history: Mutex<HashMap<Uuid, Vec<JobStatus>>>,
}

impl MemoryJobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded job in order.
    #[must_use]
    pub fn jobs(&self) -> Vec<Job> {
        self.jobs.lock().clone()
    }

    /// Returns the status history of a job.
    #[must_use]
    pub fn history(&self, job_id: &Uuid) -> Vec<JobStatus> {
        self.history.lock().get(job_id).cloned().unwrap_or_default()
    }

    /// Returns the latest status of a job.
    #[must_use]
    pub fn status(&self, job_id: &Uuid) -> JobStatus {
        self.history
            .lock()
            .get(job_id)
            .and_then(|statuses| statuses.last().copied())
            .unwrap_or_default()
    }

    /// Returns the jobs recorded for a link, in order.
    #[must_use]
    pub fn jobs_for_link(&self, link_id: &str) -> Vec<Job> {
        self.jobs
            .lock()
            .iter()
            .filter(|job| job.link_id.as_str() == link_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn record(&self, job: &Job) -> Result<(), JobStoreError> {
        self.jobs.lock().push(job.clone());
        Ok(())
    }

    async fn set_status(&self, job: &Job, status: JobStatus) -> Result<(), JobStoreError> {
        self.history.lock().entry(job.id).or_default().push(status);
        Ok(())
    }
}
