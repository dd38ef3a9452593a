//! HTTP API, SLA scan scheduler and process wiring for slawatch.

pub mod api;
pub mod app;
pub mod config;
pub mod logging;
pub mod openapi;
pub mod scheduler;
pub mod service;
pub mod state;
