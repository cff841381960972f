//! Tracks the status of long-running background jobs for HTTP polling.
//!
//! Generation runs outside the request/response cycle: the start endpoint
//! returns a `job_id` immediately and the client polls
//! `/api/generation/status/{job_id}`. The pieces here are:
//! - `JobsState`: clonable, thread-safe map of job id → `JobStatus`,
//!   injected into the Actix application state in `main.rs`.
//! - `JobUpdate`: message a background job sends to report a status change.
//! - `start_job_updater`: long-running task that drains the MPSC channel
//!   into the shared map.
//!
//! This map is for polling only. The durable record of a job's progress is
//! the sqlite store; after a restart the map starts empty and interrupted
//! jobs are recovered through `/api/generation/resume/{job_id}`.

use common::jobs::JobStatus;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, RwLock};

/// Shared, in-memory status of all background jobs.
#[derive(Clone)]
pub struct JobsState {
    /// Job id → current status. Concurrent reads from the status endpoint,
    /// exclusive writes from the updater task.
    pub jobs: Arc<RwLock<HashMap<String, JobStatus>>>,

    /// Sender used by background tasks to report progress without needing
    /// write access to the map.
    pub tx: mpsc::Sender<JobUpdate>,
}

/// A status change for one background job.
#[derive(Debug)]
pub struct JobUpdate {
    pub(crate) job_id: String,
    pub(crate) status: JobStatus,
}

impl JobUpdate {
    pub fn new(job_id: impl Into<String>, status: JobStatus) -> Self {
        JobUpdate {
            job_id: job_id.into(),
            status,
        }
    }
}

/// Drains `rx` into the shared map. Spawned once from `main.rs`.
pub async fn start_job_updater(state: JobsState, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        let mut jobs = state.jobs.write().await;
        jobs.insert(update.job_id.clone(), update.status);
    }
}
