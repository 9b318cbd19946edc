//! Daily log review pipeline.
//!
//! Retrieves one window of log events, classifies them by severity keyword,
//! summarizes ingestion metrics, assembles a fixed-schema report, stores it
//! under a date-keyed path and sends a digest notification.

pub mod assembler;
pub mod backend;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod publisher;
pub mod reader;
pub mod schema;
pub mod util;
