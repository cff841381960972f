use serde::{Deserialize, Serialize};

/// Polling status of a background generation job, as exposed by the
/// `/api/generation/status/{job_id}` endpoint.
///
/// `InProgress` carries the completion percentage. `Completed` carries the
/// serialized `GenerationSummary` so a single poll response tells the client
/// how many slides were generated and which rows failed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    InProgress(u32),
    Completed(String),
    Failed(String),
}
