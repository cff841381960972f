//! # Generation Job Service
//!
//! HTTP surface of the generation engine. A job turns one template slide
//! plus a spreadsheet into a multi-slide presentation, one slide per data
//! row, and runs in the background while the client polls its status.
//!
//! Routes:
//! - `POST /api/generation/start`: reads and snapshots the spreadsheet,
//!   creates the job with one item per retained data row, schedules the
//!   background run and returns the `job_id`.
//! - `POST /api/generation/resume/{job_id}`: re-runs the pending items of a
//!   job that was interrupted by a crash or redeploy. Completed and errored
//!   rows are left untouched.
//! - `GET /api/generation/status/{job_id}`: polls the in-memory job state;
//!   the `Completed` payload carries the serialized `GenerationSummary`.
//! - `GET /api/generation/{job_id}`: reads the persisted job record
//!   (durable counters, per-row errors, timestamps) from the store.

mod get;
mod get_status;
mod resume;
mod start;

use actix_web::web::{get, post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/generation";

/// Configures and returns the Actix `Scope` for all generation routes.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/start", post().to(start::process))
        .route("/resume/{job_id}", post().to(resume::process))
        .route("/status/{job_id}", get().to(get_status::process))
        .route("/{job_id}", get().to(get::process))
}
