//! Concrete Google Workspace clients behind the engine's trait seams.
//!
//! Token refresh is somebody else's problem: the clients only ask an
//! `AccessTokenProvider` for a bearer token per request.

pub mod auth;
pub mod sheets;
pub mod slides;
