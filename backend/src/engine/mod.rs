//! The generation job engine and its collaborator seams.
//!
//! Everything under this module is synchronous by design: the external
//! presentation API enforces a global per-presentation mutation rate limit,
//! so items are processed strictly one at a time with explicit sleep points
//! (see `generation`). HTTP handlers run the engine through
//! `tokio::task::spawn_blocking`.

pub mod error;
pub mod generation;
pub mod layout;
pub mod resync;
pub mod rows;
pub mod slide_builder;
pub mod store;
