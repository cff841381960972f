pub mod config;
pub mod engine;
pub mod google;
pub mod job_controller;
pub mod services;
