//! Logship daemon library.
//!
//! This library exposes internal modules for integration testing.
//! In production, `logship-daemon` is used as a binary (main.rs).

pub mod action;
pub mod cli;
pub mod logging;
pub mod metrics_server;
pub mod orchestrator;
pub mod pipeline;
