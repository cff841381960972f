//! # Resync Service
//!
//! Re-scans an already-generated presentation against fresh dataset rows
//! and applies the minimal set of text replacements needed to bring it back
//! in sync. Runs synchronously: a resync touches the API a handful of
//! times, not once per row, so there is no job machinery here.

mod run;

use actix_web::web::{post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/resync";

/// Configures and returns the Actix `Scope` for the resync routes.
pub fn configure_routes() -> Scope {
    scope(API_PATH).route("/run", post().to(run::process))
}
